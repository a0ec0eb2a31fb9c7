//! Compile-time-ish configuration knobs for the client.
//!
//! Mirrors the shape of `client::Config` from the async edition of this
//! crate, but the fields here govern the synchronous request driver
//! instead of pipelining depth.

use std::time::Duration;

/// Maximum length of an ALPN protocol list, in bytes.
pub const MAX_ALPN_PROTOCOLS_LENGTH: usize = 64;

/// Maximum length of a host name accepted in connection info.
pub const MAX_HOST_NAME_LENGTH: usize = 253;

/// Size of the scratch buffer used to flush residual response bytes
/// after a request completes (§4.6 step 13a).
pub const MAX_FLUSH_BUFFER_SIZE: usize = 256;

/// Default `User-Agent` value emitted by `initialize_request`.
pub const DEFAULT_USER_AGENT: &str = "rust-embedded-https-client/1.0";

/// Default wait for `connection.usage`, in milliseconds.
pub const DEFAULT_CONN_USAGE_WAIT_MS: u64 = 60_000;

/// Default wait for the `rx-start` rendezvous, in milliseconds, used
/// when `ConnectionInfo::response_timeout` is left at zero.
pub const DEFAULT_RESPONSE_WAIT_MS: u64 = 10_000;

/// Runtime-overridable knobs for a single connection.
///
/// Unlike the arena-size constants above (fixed, because they bound
/// the no-allocation guarantees this library makes), these are plain
/// fields a caller can override per connection.
#[derive(Debug, Clone)]
pub struct Config {
    user_agent: String,
    conn_usage_wait: Duration,
    response_wait: Duration,
}

impl Config {
    /// Config with the documented defaults.
    pub fn new() -> Config {
        Config {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            conn_usage_wait: Duration::from_millis(DEFAULT_CONN_USAGE_WAIT_MS),
            response_wait: Duration::from_millis(DEFAULT_RESPONSE_WAIT_MS),
        }
    }
    /// Override the `User-Agent` header value.
    pub fn user_agent<S: Into<String>>(&mut self, value: S) -> &mut Self {
        self.user_agent = value.into();
        self
    }
    /// Override the wait for the connection's usage semaphore.
    pub fn conn_usage_wait(&mut self, value: Duration) -> &mut Self {
        self.conn_usage_wait = value;
        self
    }
    /// Override the default wait for a response to start arriving.
    pub fn response_wait(&mut self, value: Duration) -> &mut Self {
        self.response_wait = value;
        self
    }
    pub fn get_user_agent(&self) -> &str {
        &self.user_agent
    }
    pub fn get_conn_usage_wait(&self) -> Duration {
        self.conn_usage_wait
    }
    pub fn get_response_wait(&self) -> Duration {
        self.response_wait
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}
