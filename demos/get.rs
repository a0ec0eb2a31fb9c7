//! Performs a single HTTPS GET and prints the response body.
//!
//! A minimal `Transport`/`Connect` pair over `native_tls` + `TcpStream`
//! stands in for whatever real transport an embedded target would
//! plug in. Unlike a real interrupt-driven device, a desktop TCP
//! socket has no out-of-band "bytes are ready" signal, so the receive
//! callback here just fires once right after connect and lets the
//! blocking `receive` calls do the actual waiting.

extern crate argparse;
extern crate env_logger;
extern crate native_tls;
extern crate rust_embedded_https_client as https_client;

use std::env;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use argparse::{ArgumentParser, Store};
use native_tls::{TlsConnector, TlsStream};

use https_client::{
    Config, Connect, ConnectionInfo, Method, RecvOutcome, RequestInfo, Request, Response,
    ServerInfo, Credentials, Transport, send_sync,
};

struct TlsTransport {
    stream: TlsStream<TcpStream>,
}

impl Transport for TlsTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.stream.write(bytes)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<RecvOutcome> {
        self.stream.get_ref().set_read_timeout(Some(timeout))?;
        match self.stream.read(buf) {
            Ok(0) => Ok(RecvOutcome::Timeout),
            Ok(n) => Ok(RecvOutcome::Data(n)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock
                || e.kind() == io::ErrorKind::TimedOut => Ok(RecvOutcome::Timeout),
            Err(e) => Err(e),
        }
    }

    fn set_receive_callback(&mut self, mut callback: Box<dyn FnMut() + Send>) {
        callback();
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown()
    }
}

struct TlsConnect {
    connector: TlsConnector,
}

impl Connect for TlsConnect {
    type Transport = TlsTransport;

    fn create(&self, server: &ServerInfo, _credentials: Option<&Credentials>)
        -> io::Result<TlsTransport>
    {
        let tcp = TcpStream::connect((server.address.as_str(), server.port))?;
        let tls = self.connector.connect(&server.address, tcp)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(TlsTransport { stream: tls })
    }
}

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init().unwrap();

    let mut host = "example.com".to_string();
    let mut path = "/".to_string();
    {
        let mut parser = ArgumentParser::new();
        parser.set_description("Fetch a path over HTTPS using the embedded client driver");
        parser.refer(&mut host).add_option(&["--host"], Store, "Host to connect to");
        parser.refer(&mut path).add_option(&["--path"], Store, "Path to request");
        parser.parse_args_or_exit();
    }

    let config = Config::new();
    let connector = TlsConnect {
        connector: TlsConnector::builder().unwrap().build().unwrap(),
    };

    let mut req_buf = [0u8; 512];
    let info = RequestInfo::new(Method::Get, &path, &host)
        .connection_info(ConnectionInfo::new(&host, 443).non_persistent());
    let request = Request::new(&info, &mut req_buf, &config)
        .expect("request fits in buffer");

    let mut header_buf = [0u8; 4096];
    let mut body_buf = [0u8; 65536];
    let mut response = Response::new(&mut header_buf, Some(&mut body_buf), Method::Get);

    let mut conn = None;
    send_sync(&mut conn, &connector, &request, &mut response, &config)
        .expect("request failed");

    println!("status: {}", response.read_response_status().unwrap_or(0));
    io::stdout().write_all(response.body()).unwrap();
}
