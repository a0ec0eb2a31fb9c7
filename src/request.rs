//! Request control (§3) plus the request builder (C4).
//!
//! Writes the request line and header block into a caller-supplied
//! arena, the same "format into a borrowed slice, fail typed on
//! overflow" discipline `arena::Arena` applies everywhere else in
//! this crate.

use std::io::{Cursor, Write};

use arena::Arena;
use config::Config;
use connection::ConnectionInfo;
use error::Error;

/// The wire only ever needs these two (§6 `Method ∈ {"GET", "HEAD"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Head => "HEAD",
        }
    }
}

/// Header names this library emits itself; rejected from `add_header`.
const RESERVED: &[&str] = &["Connection", "User-Agent", "Host", "Content-Length"];

/// `read-header`/`add-header` matching uses the exact length of both
/// names (§9 Open Question, resolved in SPEC_FULL.md): a candidate is
/// rejected only when it is byte-for-byte equal, case-sensitively, to
/// a reserved name. A longer name, or one differing only in case, is
/// accepted.
fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|r| r.len() == name.len() && r.as_bytes() == name.as_bytes())
}

/// What the caller hands `initialize_request` describing one exchange.
pub struct RequestInfo<'a> {
    pub method: Method,
    pub path: &'a str,
    pub host: &'a str,
    /// Present only when this request should (re)connect implicitly;
    /// `send_sync` requires this to be `Some` whenever the connection
    /// handle it's given is empty or disconnected (§4.6 step 2).
    pub connection_info: Option<ConnectionInfo>,
    pub body: Option<&'a [u8]>,
}

impl<'a> RequestInfo<'a> {
    pub fn new(method: Method, path: &'a str, host: &'a str) -> RequestInfo<'a> {
        RequestInfo { method, path, host, connection_info: None, body: None }
    }

    pub fn connection_info(mut self, info: ConnectionInfo) -> Self {
        self.connection_info = Some(info);
        self
    }

    pub fn body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }
}

/// The request control (§3): header arena, method, body, and whatever
/// is needed for an implicit connect.
pub struct Request<'a> {
    headers: Arena<'a>,
    method: Method,
    body: Option<&'a [u8]>,
    connection_info: Option<ConnectionInfo>,
}

impl<'a> Request<'a> {
    /// `initialize-request` (§4.4): lays the request line and the
    /// fixed `User-Agent`/`Host` headers into `buf`, failing
    /// `InsufficientMemory` if the arena is too small to hold them.
    pub fn new(info: &RequestInfo, buf: &'a mut [u8], config: &Config)
        -> Result<Request<'a>, Error>
    {
        let mut headers = Arena::new(buf);
        write_request_line(&mut headers, info.method, info.path)?;
        append_fixed_header(&mut headers, "User-Agent", config.get_user_agent())?;
        append_fixed_header(&mut headers, "Host", info.host)?;

        Ok(Request {
            headers,
            method: info.method,
            body: info.body,
            connection_info: info.connection_info.clone(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body
    }

    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.connection_info.as_ref()
    }

    /// `add-header` (§4.4, §6): appends `"<name>: <value>\r\n"`,
    /// rejecting the four reserved names with `InvalidParameter` and
    /// leaving the cursor unchanged on any failure.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if is_reserved(name) {
            return Err(Error::InvalidParameter("reserved header name"));
        }
        append_header(&mut self.headers, name, value)
    }

    /// Bytes accumulated so far: `[headers-start, headers-cur)`. Sent
    /// verbatim as the first of the two header transmissions (§4.6
    /// step 5).
    pub fn header_bytes(&self) -> &[u8] {
        self.headers.filled()
    }
}

/// `"<METHOD> <PATH> HTTP/1.1\r\n"`, formatted straight into the
/// arena's own tail so there is no intermediate allocation and no
/// arbitrary local-buffer size cap; overflow surfaces as a typed
/// error rather than a panic (§4.4).
fn write_request_line(arena: &mut Arena, method: Method, path: &str)
    -> Result<(), Error>
{
    let written = {
        let mut cursor = Cursor::new(arena.tail_mut());
        write!(cursor, "{} {} HTTP/1.1\r\n", method.as_str(), path)
            .map_err(|_| Error::InsufficientMemory)?;
        cursor.position() as usize
    };
    arena.advance(written);
    Ok(())
}

/// The header-append primitive (§4.4), used by `add_header`: `needed
/// = len(name) + 2 + len(value) + 2`, plus the terminating empty line
/// reserved for send time, must fit before a single byte is written.
///
/// `Request::new`'s own `User-Agent`/`Host` writes go through
/// `append_fixed_header` instead, without the trailing reservation:
/// §3's `request-min` formula sums exactly the request line plus
/// those two header lines with no slack for a further blank line, so
/// reserving it here would make the documented "fills the arena
/// exactly" boundary case (§8) fail on every valid minimum-size
/// arena. The reservation matters once a caller may append more
/// headers after the fixed ones, which is exactly what `add_header`
/// governs.
fn append_header(arena: &mut Arena, name: &str, value: &str) -> Result<(), Error> {
    let needed = name.len() + 2 + value.len() + 2;
    if arena.cur() + needed + "\r\n".len() > arena.len() {
        return Err(Error::InsufficientMemory);
    }
    append_fixed_header(arena, name, value)
}

fn append_fixed_header(arena: &mut Arena, name: &str, value: &str) -> Result<(), Error> {
    let written = {
        let mut cursor = Cursor::new(arena.tail_mut());
        write!(cursor, "{}: {}\r\n", name, value)
            .map_err(|_| Error::InsufficientMemory)?;
        cursor.position() as usize
    };
    arena.advance(written);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> Config {
        Config::new()
    }

    #[test]
    fn initialize_writes_request_line_and_fixed_headers() {
        let mut buf = [0u8; 256];
        let info = RequestInfo::new(Method::Get, "/", "example.com");
        let req = Request::new(&info, &mut buf, &cfg()).unwrap();
        let text = ::std::str::from_utf8(req.header_bytes()).unwrap();
        assert!(text.starts_with("GET / HTTP/1.1\r\n"));
        assert!(text.contains("User-Agent: rust-embedded-https-client/1.0\r\n"));
        assert!(text.ends_with("Host: example.com\r\n"));
    }

    #[test]
    fn add_header_appends_after_fixed_headers() {
        let mut buf = [0u8; 256];
        let info = RequestInfo::new(Method::Get, "/", "example.com");
        let mut req = Request::new(&info, &mut buf, &cfg()).unwrap();
        req.add_header("X-Token", "abc").unwrap();
        let text = ::std::str::from_utf8(req.header_bytes()).unwrap();
        assert!(text.ends_with("X-Token: abc\r\n"));
    }

    #[test]
    fn add_header_rejects_reserved_names_exact_case_only() {
        let mut buf = [0u8; 256];
        let info = RequestInfo::new(Method::Get, "/", "example.com");
        let mut req = Request::new(&info, &mut buf, &cfg()).unwrap();
        let before = req.header_bytes().len();
        for name in &["Connection", "User-Agent", "Host", "Content-Length"] {
            let err = req.add_header(name, "x").unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)));
        }
        assert_eq!(req.header_bytes().len(), before,
                   "cursor must be unchanged after a rejected add_header");
    }

    #[test]
    fn add_header_accepts_reserved_names_in_differing_case() {
        let mut buf = [0u8; 256];
        let info = RequestInfo::new(Method::Get, "/", "example.com");
        let mut req = Request::new(&info, &mut buf, &cfg()).unwrap();
        for name in &["connection", "user-agent", "HOST", "content-LENGTH"] {
            req.add_header(name, "x").unwrap();
        }
    }

    #[test]
    fn longer_name_merely_prefixed_by_reserved_is_accepted() {
        let mut buf = [0u8; 256];
        let info = RequestInfo::new(Method::Get, "/", "example.com");
        let mut req = Request::new(&info, &mut buf, &cfg()).unwrap();
        req.add_header("Hostname", "x").unwrap();
    }

    #[test]
    fn add_header_overflow_is_insufficient_memory_and_cursor_unchanged() {
        let mut buf = [0u8; 64];
        let info = RequestInfo::new(Method::Get, "/", "x");
        let mut req = Request::new(&info, &mut buf, &cfg()).unwrap();
        let before = req.header_bytes().len();
        let huge_value = "v".repeat(512);
        let err = req.add_header("X-Big", &huge_value).unwrap_err();
        assert!(matches!(err, Error::InsufficientMemory));
        assert_eq!(req.header_bytes().len(), before);
    }

    #[test]
    fn exact_size_arena_fills_exactly() {
        let host = "a.example.com";
        let agent = ::config::DEFAULT_USER_AGENT;
        let exact_len = "GET / HTTP/1.1\r\n".len()
            + "User-Agent: ".len() + agent.len() + "\r\n".len()
            + "Host: ".len() + host.len() + "\r\n".len();
        let mut buf = vec![0u8; exact_len];
        let info = RequestInfo::new(Method::Get, "/", host);
        let req = Request::new(&info, &mut buf, &cfg()).unwrap();
        assert_eq!(req.header_bytes().len(), exact_len);
    }

    #[test]
    fn arena_one_byte_short_is_insufficient_memory() {
        let host = "a.example.com";
        let agent = ::config::DEFAULT_USER_AGENT;
        let exact_len = "GET / HTTP/1.1\r\n".len()
            + "User-Agent: ".len() + agent.len() + "\r\n".len()
            + "Host: ".len() + host.len() + "\r\n".len();
        let mut buf = vec![0u8; exact_len - 1];
        let info = RequestInfo::new(Method::Get, "/", host);
        let err = Request::new(&info, &mut buf, &cfg()).unwrap_err();
        assert!(matches!(err, Error::InsufficientMemory));
    }
}
