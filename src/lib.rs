//! An embedded HTTP/1.1 client for resource-constrained devices.
//!
//! Every working buffer this crate touches -- the request header
//! block, the response header block, the response body -- is carved
//! out of a caller-supplied `&mut [u8]`. There is no dynamic
//! allocation on the request/response hot path; overflow is a typed
//! `Error::InsufficientMemory` rather than a panic or a silent
//! reallocation.
//!
//! ```no_run
//! use rust_embedded_https_client::{
//!     Config, Connection, ConnectionInfo, Method, RequestInfo, Request, Response, send_sync,
//! };
//!
//! # fn run<T: rust_embedded_https_client::Transport, C>(connector: C) -> Result<(), rust_embedded_https_client::Error>
//! # where C: rust_embedded_https_client::Connect<Transport = T> {
//! let config = Config::new();
//! let mut conn: Option<Connection<T>> = None;
//!
//! let mut req_buf = [0u8; 512];
//! let info = RequestInfo::new(Method::Get, "/", "example.com")
//!     .connection_info(ConnectionInfo::new("example.com", 443));
//! let request = Request::new(&info, &mut req_buf, &config)?;
//!
//! let mut header_buf = [0u8; 1024];
//! let mut body_buf = [0u8; 4096];
//! let mut response = Response::new(&mut header_buf, Some(&mut body_buf), info.method);
//!
//! send_sync(&mut conn, &connector, &request, &mut response, &config)?;
//! println!("status = {}", response.read_response_status()?);
//! # Ok(())
//! # }
//! ```

#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate log;
extern crate httparse;

mod arena;
mod chunked;
mod config;
mod connection;
mod error;
mod headers;
mod request;
mod response;
mod sync;
mod transport;

pub use arena::{request_min, request_min_floor, CONNECTION_MIN, RESPONSE_MIN};
pub use config::Config;
pub use connection::{Connection, ConnectionInfo};
pub use error::Error;
pub use request::{Method, Request, RequestInfo};
pub use response::{ParserState, ProcessingMode, Response};
pub use sync::send_sync;
pub use transport::{Connect, Credentials, RecvOutcome, ServerInfo, Transport};
