//! Chunked transfer-encoding decode, adapted to run in place over a
//! fixed-size `Arena` rather than a growable buffer: chunk-size lines
//! (and the CRLF trailing each chunk's data) are stripped out of the
//! arena as they are recognized, so `buffered` bytes at the front of
//! the arena are always fully-decoded payload.

use httparse::{InvalidChunkSize, parse_chunk_size};

use arena::Arena;

#[derive(Debug, Clone)]
pub struct State {
    buffered: usize,
    pending: usize,
    /// Bytes still to discard before the next chunk-size line: the
    /// CRLF that terminates every chunk's data (RFC 7230 §4.1 `chunk`
    /// production). `parse_chunk_size` only recognizes a chunk-size
    /// line, so this separator has to be skipped explicitly between
    /// chunks.
    skip: usize,
    done: bool,
}

impl State {
    pub fn new() -> State {
        State { buffered: 0, pending: 0, skip: 0, done: false }
    }

    /// Scan newly-arrived bytes at the tail of `arena` (everything
    /// past `buffered`), stripping chunk framing in place. After this
    /// returns, `arena.filled()[..self.buffered()]` is decoded
    /// payload ready to be reported to the caller.
    pub fn parse(&mut self, arena: &mut Arena) -> Result<(), InvalidChunkSize> {
        loop {
            if self.skip > 0 {
                let avail = arena.cur() - self.buffered;
                if avail == 0 {
                    return Ok(());
                }
                let n = self.skip.min(avail);
                arena.remove_range(self.buffered, self.buffered + n);
                self.skip -= n;
                if self.skip > 0 {
                    return Ok(());
                }
                continue;
            }
            if self.buffered >= arena.cur() {
                return Ok(());
            }
            if self.pending == 0 {
                use httparse::Status::*;
                match parse_chunk_size(&arena.filled()[self.buffered..])? {
                    Complete((bytes, 0)) => {
                        arena.remove_range(self.buffered, self.buffered + bytes);
                        self.done = true;
                        return Ok(());
                    }
                    Complete((bytes, chunk_size)) => {
                        arena.remove_range(self.buffered, self.buffered + bytes);
                        self.pending = chunk_size as usize;
                    }
                    Partial => return Ok(()),
                }
            } else {
                let avail = arena.cur() - self.buffered;
                if self.pending <= avail {
                    self.buffered += self.pending;
                    self.pending = 0;
                    self.skip = 2;
                } else {
                    self.pending -= avail;
                    self.buffered = arena.cur();
                }
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffered
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn three_single_byte_chunks() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        arena.append(b"1\r\na\r\n1\r\nb\r\n1\r\nc\r\n0\r\n\r\n").unwrap();
        let mut state = State::new();
        state.parse(&mut arena).unwrap();
        assert!(state.is_done());
        assert_eq!(state.buffered(), 3);
        assert_eq!(&arena.filled()[..3], b"abc");
    }

    #[test]
    fn partial_chunk_body_waits_for_more() {
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        arena.append(b"5\r\nhe").unwrap();
        let mut state = State::new();
        state.parse(&mut arena).unwrap();
        assert!(!state.is_done());
        assert_eq!(state.buffered(), 2, "partial chunk body is buffered as-is");
        arena.append(b"llo\r\n0\r\n\r\n").unwrap();
        state.parse(&mut arena).unwrap();
        assert!(state.is_done());
        assert_eq!(&arena.filled()[..state.buffered()], b"hello");
    }

    #[test]
    fn fed_one_byte_at_a_time() {
        let encoded = b"2\r\nhi\r\n3\r\nyou\r\n0\r\n\r\n";
        let mut buf = [0u8; 64];
        let mut arena = Arena::new(&mut buf);
        let mut state = State::new();
        for &b in encoded {
            arena.append(&[b]).unwrap();
            state.parse(&mut arena).unwrap();
        }
        assert!(state.is_done());
        assert_eq!(&arena.filled()[..state.buffered()], b"hiyou");
    }
}
