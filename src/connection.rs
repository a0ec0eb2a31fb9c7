//! Connection control (§3) plus the connection component (C5).
//!
//! Owns the transport instance, the `usage` mutex-semaphore that
//! enforces at most one in-flight request per connection, and the
//! two rendezvous semaphores coordinating the transport's
//! receive-ready callback with the request-owning task. Since this
//! crate's driver is synchronous rather than `futures`/`tokio-core`
//! based like the teacher's async client, the semaphores are built
//! from `std::sync::{Mutex, Condvar}` pairs emulating a binary
//! counting semaphore, instead of reactor primitives (see DESIGN.md).

use std::sync::{Arc, Mutex, Condvar};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use config::{Config, MAX_ALPN_PROTOCOLS_LENGTH, MAX_HOST_NAME_LENGTH};
use error::Error;
use transport::{Connect, Credentials, RecvOutcome, ServerInfo, Transport};

/// A binary semaphore: `post` sets it signaled and wakes one waiter;
/// `wait`/`wait_timeout` block until signaled, then clear it again.
/// Matches the post/wait pairing the teacher's source describes for
/// `usage`, `rx-start`, and `rx-finish` (§3, §4.5, §4.6).
struct Semaphore {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Semaphore {
    fn new(initial: bool) -> Semaphore {
        Semaphore { signaled: Mutex::new(initial), cond: Condvar::new() }
    }

    fn post(&self) {
        let mut signaled = self.signaled.lock().unwrap();
        *signaled = true;
        self.cond.notify_one();
    }

    /// Blocks until signaled, clearing it on success, waiting at most
    /// `timeout`. Returns `false` on timeout.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock().unwrap();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = self.cond.wait_timeout(signaled, deadline - now).unwrap();
            signaled = guard;
            if result.timed_out() && !*signaled {
                return false;
            }
        }
        *signaled = false;
        true
    }

    /// Blocks until signaled with no deadline (§4.5: the transport's
    /// callback thread waits here, unbounded, until the request task
    /// posts `rx-finish`).
    fn wait(&self) {
        let mut signaled = self.signaled.lock().unwrap();
        while !*signaled {
            signaled = self.cond.wait(signaled).unwrap();
        }
        *signaled = false;
    }
}

/// Explicit TLS credentials, or the scalar fields assembled from a
/// plain connection-info value (§4.5: "fabricates ... credentials
/// ... assembled from the scalar address/port/ALPN/cert fields when
/// the explicit structs are absent").
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub address: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
    /// When false, the connection is closed automatically after a
    /// single request completes (§4.6 step 13b).
    pub persistent: bool,
    /// Overrides `DEFAULT_RESPONSE_WAIT_MS` when non-zero.
    pub response_wait_ms: u64,
}

impl ConnectionInfo {
    pub fn new(address: &str, port: u16) -> ConnectionInfo {
        ConnectionInfo {
            address: address.to_string(),
            port,
            credentials: None,
            persistent: true,
            response_wait_ms: 0,
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn non_persistent(mut self) -> Self {
        self.persistent = false;
        self
    }

    pub fn response_wait_ms(mut self, ms: u64) -> Self {
        self.response_wait_ms = ms;
        self
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo { address: self.address.clone(), port: self.port }
    }

    fn response_wait(&self, config: &Config) -> Duration {
        if self.response_wait_ms == 0 {
            config.get_response_wait()
        } else {
            Duration::from_millis(self.response_wait_ms)
        }
    }
}

struct Shared<T: Transport> {
    transport: Mutex<T>,
    usage: Semaphore,
    rendezvous: Arc<Rendezvous>,
    connected: AtomicBool,
    non_persistent: bool,
    response_wait: Duration,
    conn_usage_wait: Duration,
}

/// The connection control (§3): transport instance, usage mutex, and
/// the receive rendezvous. Cheaply `Clone`, like an `Arc` handle,
/// since the transport's own thread needs to reach the rendezvous
/// semaphores from inside the receive-ready callback (§4.5).
pub struct Connection<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Connection { shared: self.shared.clone() }
    }
}

/// Paired with the receive-ready callback: lets the callback reach
/// `rx_start`/`rx_finish` without needing the whole `Shared<T>` (the
/// callback never touches the transport itself, only the rendezvous).
struct Rendezvous {
    rx_start: Semaphore,
    rx_finish: Semaphore,
}

impl<T: Transport> Connection<T> {
    /// `connect` (§4.5): validates nothing arena-sized (a `Connection`
    /// here is an ordinary owned value, not a struct placed in a
    /// caller buffer — see `arena::CONNECTION_MIN`), fabricates server
    /// info, creates the transport, installs the receive-ready
    /// callback, and wires up the three semaphores.
    pub fn connect<C>(connector: &C, info: &ConnectionInfo, config: &Config)
        -> Result<Connection<T>, Error>
        where C: Connect<Transport = T>
    {
        if info.address.len() > MAX_HOST_NAME_LENGTH {
            return Err(Error::InvalidParameter("host name exceeds MAX_HOST_NAME_LENGTH"));
        }
        if let Some(ref creds) = info.credentials {
            let alpn_len: usize = creds.alpn_protocols.iter().map(|p| p.len()).sum();
            if alpn_len > MAX_ALPN_PROTOCOLS_LENGTH {
                return Err(Error::InvalidParameter(
                    "ALPN protocol list exceeds MAX_ALPN_PROTOCOLS_LENGTH"));
            }
        }

        let server = info.server_info();
        let mut transport = connector.create(&server, info.credentials.as_ref())
            .map_err(Error::ConnectionError)?;

        let rendezvous = Arc::new(Rendezvous {
            rx_start: Semaphore::new(false),
            rx_finish: Semaphore::new(false),
        });
        let callback_rendezvous = rendezvous.clone();
        transport.set_receive_callback(Box::new(move || {
            callback_rendezvous.rx_start.post();
            callback_rendezvous.rx_finish.wait();
        }));

        let shared = Arc::new(Shared {
            transport: Mutex::new(transport),
            usage: Semaphore::new(true),
            rendezvous,
            connected: AtomicBool::new(true),
            non_persistent: !info.persistent,
            response_wait: info.response_wait(config),
            conn_usage_wait: config.get_conn_usage_wait(),
        });

        Ok(Connection { shared })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn conn_usage_wait(&self) -> Duration {
        self.shared.conn_usage_wait
    }

    pub fn response_wait(&self) -> Duration {
        self.shared.response_wait
    }

    pub fn non_persistent(&self) -> bool {
        self.shared.non_persistent
    }

    /// Acquire the `usage` mutex-semaphore, §4.6 step 4.
    pub fn acquire_usage(&self) -> Result<(), Error> {
        if self.shared.usage.wait_timeout(self.shared.conn_usage_wait) {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    pub fn release_usage(&self) {
        self.shared.usage.post();
    }

    /// `wait(rx-start, connection.timeout)`, §4.6 step 8.
    pub fn wait_rx_start(&self) -> bool {
        self.shared.rendezvous.rx_start.wait_timeout(self.shared.response_wait)
    }

    /// `post(rx-finish)`, §4.6 step 13d.
    pub fn post_rx_finish(&self) {
        self.shared.rendezvous.rx_finish.post();
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        let mut transport = self.shared.transport.lock().unwrap();
        let mut sent = 0;
        while sent < bytes.len() {
            let n = transport.send(&bytes[sent..])?;
            if n == 0 {
                return Err(Error::NetworkError(::std::io::Error::new(
                    ::std::io::ErrorKind::WriteZero, "transport accepted zero bytes")));
            }
            sent += n;
        }
        Ok(())
    }

    pub fn receive(&self, buf: &mut [u8], timeout: Duration)
        -> Result<RecvOutcome, Error>
    {
        let mut transport = self.shared.transport.lock().unwrap();
        Ok(transport.receive(buf, timeout)?)
    }

    /// `disconnect` (§4.5, §6): idempotent, closes the transport
    /// (logging but not propagating network errors), and marks the
    /// control disconnected.
    pub fn disconnect(&self) {
        if !self.shared.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut transport = self.shared.transport.lock().unwrap();
        if let Err(err) = transport.close() {
            warn!("error closing transport on disconnect: {}", err);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io;
    use std::sync::mpsc;
    use std::time::Duration;
    use transport::{RecvOutcome};

    struct MockTransport {
        closed: bool,
    }

    impl Transport for MockTransport {
        fn send(&mut self, bytes: &[u8]) -> io::Result<usize> { Ok(bytes.len()) }
        fn receive(&mut self, _buf: &mut [u8], _timeout: Duration) -> io::Result<RecvOutcome> {
            Ok(RecvOutcome::Timeout)
        }
        fn set_receive_callback(&mut self, _callback: Box<dyn FnMut() + Send>) {}
        fn close(&mut self) -> io::Result<()> { self.closed = true; Ok(()) }
    }

    struct MockConnect;
    impl Connect for MockConnect {
        type Transport = MockTransport;
        fn create(&self, _server: &ServerInfo, _credentials: Option<&Credentials>)
            -> io::Result<MockTransport>
        {
            Ok(MockTransport { closed: false })
        }
    }

    #[test]
    fn connect_rejects_oversized_host_name() {
        let long_host = "a".repeat(super::MAX_HOST_NAME_LENGTH + 1);
        let info = ConnectionInfo::new(&long_host, 443);
        let err = Connection::connect(&MockConnect, &info, &Config::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn connect_then_disconnect_is_idempotent() {
        let info = ConnectionInfo::new("example.com", 443);
        let conn = Connection::connect(&MockConnect, &info, &Config::new()).unwrap();
        assert!(conn.is_connected());
        conn.disconnect();
        assert!(!conn.is_connected());
        conn.disconnect();
        assert!(!conn.is_connected());
    }

    #[test]
    fn usage_semaphore_serializes_without_sticking_busy() {
        let info = ConnectionInfo::new("example.com", 443);
        let conn = Connection::connect(&MockConnect, &info, &Config::new()).unwrap();
        conn.acquire_usage().unwrap();
        conn.release_usage();
        // A subsequent acquire must not be rejected with Busy solely
        // because of the previous (now-released) acquisition.
        conn.acquire_usage().unwrap();
        conn.release_usage();
    }

    #[test]
    fn rx_rendezvous_is_symmetric() {
        let info = ConnectionInfo::new("example.com", 443)
            .response_wait_ms(200);
        let conn = Connection::connect(&MockConnect, &info, &Config::new()).unwrap();
        let (tx, rx) = mpsc::channel();
        let post_side = conn.clone();
        ::std::thread::spawn(move || {
            post_side.shared.rendezvous.rx_start.post();
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(conn.wait_rx_start());
        conn.post_rx_finish();
    }
}
