//! Transport adapter (C2).
//!
//! A thin contract over a pluggable byte-stream transport, typically
//! TLS over TCP but deliberately opaque to this crate. The adapter's
//! only job is to turn short writes into a loop and short reads into
//! a single-shot "read up to N, return what came" — both handled by
//! the driver in `client.rs`, not by the trait itself.

use std::io;
use std::time::Duration;

/// Server address, kept separate from credentials so a transport that
/// needs no TLS state can still be told where to connect.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub address: String,
    pub port: u16,
}

/// TLS credentials, named the way `IotHttpsConnectionInfo_t` names
/// them in the source this design is distilled from. Every field is
/// optional because a plain (non-TLS) transport needs none of them.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub root_ca: Option<Vec<u8>>,
    pub client_cert: Option<Vec<u8>>,
    pub private_key: Option<Vec<u8>>,
    pub alpn_protocols: Vec<String>,
    pub disable_sni: bool,
}

/// What came back from a single `receive` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// `n` bytes were read into the caller's buffer (`n` may be 0
    /// only if the caller's buffer was itself zero-length).
    Data(usize),
    /// No bytes arrived before the transport's own internal deadline;
    /// distinct from a network error.
    Timeout,
}

/// The capability set required from a transport instance.
///
/// One instance is created per `Connection` and used for the
/// lifetime of that connection; `Connection` (C5) holds it behind
/// its `usage` semaphore so at most one request ever touches it at a
/// time.
pub trait Transport: Send {
    /// Send as many bytes as the transport will currently accept.
    /// Short writes are expected and handled by the caller's loop.
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes, blocking at most `timeout`.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration)
        -> io::Result<RecvOutcome>;

    /// Arrange for `callback` to be invoked from the transport's own
    /// thread whenever bytes become available to read. The transport
    /// must not call back concurrently with an in-progress `receive`.
    fn set_receive_callback(&mut self, callback: Box<dyn FnMut() + Send>);

    /// Tear the transport down. Errors are logged by the caller but
    /// never block the rest of disconnect's cleanup.
    fn close(&mut self) -> io::Result<()>;
}

/// Constructs `Transport` instances. Kept as a separate trait from
/// `Transport` itself (mirroring the source's `create()` free function
/// plus an opaque instance) so a single factory value can be reused
/// across many `Connection::connect` calls.
pub trait Connect {
    type Transport: Transport;

    fn create(&self, server: &ServerInfo, credentials: Option<&Credentials>)
        -> io::Result<Self::Transport>;
}
