extern crate rust_embedded_https_client as https_client;

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use https_client::{
    Config, Connect, ConnectionInfo, Credentials, Method, RecvOutcome, RequestInfo, Request,
    Response, ServerInfo, Transport, send_sync,
};

struct ScriptedTransport {
    to_client: VecDeque<Vec<u8>>,
}

impl Transport for ScriptedTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        Ok(bytes.len())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<RecvOutcome> {
        match self.to_client.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(RecvOutcome::Data(n))
            }
            None => Ok(RecvOutcome::Timeout),
        }
    }

    fn set_receive_callback(&mut self, mut callback: Box<dyn FnMut() + Send>) {
        ::std::thread::spawn(move || callback());
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ScriptedConnect {
    chunks: Vec<Vec<u8>>,
}

impl Connect for ScriptedConnect {
    type Transport = ScriptedTransport;

    fn create(&self, _server: &ServerInfo, _credentials: Option<&Credentials>)
        -> io::Result<ScriptedTransport>
    {
        Ok(ScriptedTransport { to_client: self.chunks.clone().into() })
    }
}

#[test]
fn head_request_suppresses_body_end_to_end() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 12345\r\n\r\n";
    let connector = ScriptedConnect { chunks: vec![raw.to_vec()] };
    let mut conn = None;

    let config = Config::new();
    let info = RequestInfo::new(Method::Head, "/", "example.com")
        .connection_info(ConnectionInfo::new("example.com", 443));
    let mut req_buf = [0u8; 256];
    let request = Request::new(&info, &mut req_buf, &config).unwrap();

    let mut hbuf = [0u8; 256];
    let mut bbuf = [0u8; 16];
    let mut response = Response::new(&mut hbuf, Some(&mut bbuf), Method::Head);

    send_sync(&mut conn, &connector, &request, &mut response, &config).unwrap();

    assert_eq!(response.read_response_status().unwrap(), 200);
    assert_eq!(response.read_content_length().unwrap(), 12345);
    assert_eq!(response.body(), b"");
    assert!(conn.unwrap().is_connected());
}

#[test]
fn add_header_reserved_name_rejected_before_send() {
    let config = Config::new();
    let info = RequestInfo::new(Method::Get, "/", "example.com");
    let mut req_buf = [0u8; 256];
    let mut request = Request::new(&info, &mut req_buf, &config).unwrap();

    let err = request.add_header("Content-Length", "42").unwrap_err();
    assert!(matches!(err, https_client::Error::InvalidParameter(_)));
}

#[test]
fn fragmented_header_delivery_still_completes() {
    let raw: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabc";
    let mut connector_chunks = Vec::new();
    for byte in raw {
        connector_chunks.push(vec![*byte]);
    }
    let connector = ScriptedConnect { chunks: connector_chunks };
    let mut conn = None;

    let config = Config::new();
    let info = RequestInfo::new(Method::Get, "/", "example.com")
        .connection_info(ConnectionInfo::new("example.com", 443));
    let mut req_buf = [0u8; 256];
    let request = Request::new(&info, &mut req_buf, &config).unwrap();

    let mut hbuf = [0u8; 256];
    let mut bbuf = [0u8; 16];
    let mut response = Response::new(&mut hbuf, Some(&mut bbuf), Method::Get);

    send_sync(&mut conn, &connector, &request, &mut response, &config).unwrap();

    assert_eq!(response.read_response_status().unwrap(), 200);
    assert_eq!(response.body(), b"abc");
}

#[test]
fn read_header_after_send_finds_a_custom_field() {
    let raw = b"HTTP/1.1 200 OK\r\nX-Request-Id: abc123\r\nContent-Length: 0\r\n\r\n";
    let connector = ScriptedConnect { chunks: vec![raw.to_vec()] };
    let mut conn = None;

    let config = Config::new();
    let info = RequestInfo::new(Method::Get, "/", "example.com")
        .connection_info(ConnectionInfo::new("example.com", 443));
    let mut req_buf = [0u8; 256];
    let request = Request::new(&info, &mut req_buf, &config).unwrap();

    let mut hbuf = [0u8; 256];
    let mut bbuf = [0u8; 16];
    let mut response = Response::new(&mut hbuf, Some(&mut bbuf), Method::Get);

    send_sync(&mut conn, &connector, &request, &mut response, &config).unwrap();

    let mut out = [0u8; 16];
    let n = response.read_header("X-Request-Id", &mut out).unwrap();
    assert_eq!(&out[..n], b"abc123");
}
