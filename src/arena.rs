//! Arena/buffer layout (C1).
//!
//! The original design places a fixed-size "control" struct at offset
//! zero of a caller-supplied byte region, followed by a growing text
//! region. In idiomatic Rust the control struct is simply an owned
//! value the library hands back to the caller (`Request`, `Response`,
//! `Connection`); the "arena" is exclusively the text region, borrowed
//! for the lifetime of that value as a plain `&mut [u8]`. This keeps
//! the zero-allocation guarantee — no heap growth, no reallocation,
//! overflow is a typed error — without resorting to placement-new
//! style pointer casts, which would not be idiomatic here.

use config::DEFAULT_USER_AGENT;
use error::Error;

/// A caller-supplied byte region with a write cursor.
///
/// Invariant: `0 <= cur <= buf.len()` always holds; `start` is
/// implicitly zero since the slice itself delimits the region.
pub struct Arena<'a> {
    buf: &'a mut [u8],
    cur: usize,
}

impl<'a> Arena<'a> {
    pub fn new(buf: &'a mut [u8]) -> Arena<'a> {
        Arena { buf, cur: 0 }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn cur(&self) -> usize {
        self.cur
    }

    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.cur]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cur
    }

    pub fn is_full(&self) -> bool {
        self.cur == self.buf.len()
    }

    /// The writable tail, `[cur, end)`.
    pub fn tail_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.cur..]
    }

    /// Advance the cursor by `n` bytes after having written into
    /// `tail_mut()`. Panics if `n` would overrun; callers are expected
    /// to have checked capacity first via `remaining()`.
    pub fn advance(&mut self, n: usize) {
        assert!(self.cur + n <= self.buf.len());
        self.cur += n;
    }

    /// Append `bytes`, failing with `InsufficientMemory` rather than
    /// panicking, leaving the cursor unchanged on failure.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() > self.remaining() {
            return Err(Error::InsufficientMemory);
        }
        let start = self.cur;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.cur += bytes.len();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.cur = 0;
    }

    /// Remove `[start, end)` from the filled region, shifting
    /// whatever followed it left and shrinking the cursor by
    /// `end - start`. Used by the chunked-transfer decoder to strip
    /// chunk-size lines out of the body arena in place, the same way
    /// the teacher's `chunked::State` removes them from a growable
    /// buffer -- here done in-place since the arena cannot grow.
    pub fn remove_range(&mut self, start: usize, end: usize) {
        assert!(start <= end && end <= self.cur);
        self.buf.copy_within(end..self.cur, start);
        self.cur -= end - start;
    }
}

/// Minimum request-arena length for a given method, path and
/// user-agent string, per §3: the request line (sized for the longest
/// of the two supported methods, `CONNECT` being the historical
/// sizing reference in the source though this crate only emits GET
/// and HEAD) plus the `User-Agent` and `Host` lines this library
/// appends automatically.
pub fn request_min(user_agent: &str, host: &str) -> usize {
    "CONNECT / HTTP/1.1\r\n".len()
        + "User-Agent: ".len() + user_agent.len() + "\r\n".len()
        + "Host: ".len() + host.len() + "\r\n".len()
}

/// `request_min` computed against the default user agent and an empty
/// host, matching §3's literal `length("Host: \r\n")` term — the
/// absolute floor below which no request arena can ever be valid,
/// regardless of the eventual host name.
pub fn request_min_floor() -> usize {
    request_min(DEFAULT_USER_AGENT, "")
}

/// Response arena minimum: no fixed text is required up front, only
/// enough room for the control bookkeeping. Exposed as a named
/// constant for parity with the source's `IOT_HTTPS_RESPONSE_MIN` --
/// any positive length is technically usable, but zero-length arenas
/// are rejected to keep `headers_received`'s first write meaningful.
pub const RESPONSE_MIN: usize = 1;

/// Connection-arena minimum. Unlike the original, a `Connection` in
/// this crate is an ordinary owned Rust value (see `connection.rs`)
/// rather than a struct placed inside a caller-supplied buffer, so
/// there is no analogous byte-region size to enforce; the constant is
/// kept only so callers porting arena-sizing code from the original
/// API have a stable name to reference.
pub const CONNECTION_MIN: usize = 0;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cursor_invariant_holds() {
        let mut buf = [0u8; 8];
        let mut a = Arena::new(&mut buf);
        assert_eq!(a.cur(), 0);
        a.append(b"abcd").unwrap();
        assert_eq!(a.cur(), 4);
        assert!(a.cur() <= a.len());
    }

    #[test]
    fn append_overflow_is_insufficient_memory() {
        let mut buf = [0u8; 4];
        let mut a = Arena::new(&mut buf);
        let err = a.append(b"abcde").unwrap_err();
        assert!(matches!(err, Error::InsufficientMemory));
        assert_eq!(a.cur(), 0, "cursor must be unchanged on failed append");
    }

    #[test]
    fn request_min_matches_formula() {
        let min = request_min("rust-embedded-https-client/1.0", "example.com");
        let expected = "CONNECT / HTTP/1.1\r\n".len()
            + "User-Agent: rust-embedded-https-client/1.0\r\n".len()
            + "Host: example.com\r\n".len();
        assert_eq!(min, expected);
    }
}
