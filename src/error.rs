//! The exhaustive error type returned from every public entry point.

use std::io;

use httparse;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// Null handle, null buffer, or attempt to add a reserved header.
        InvalidParameter(msg: &'static str) {
            description("invalid parameter")
            display("invalid parameter: {}", msg)
        }
        /// Arena too small at init, or a header/line would overflow its arena.
        InsufficientMemory {
            description("insufficient memory")
        }
        /// Transport `create` failed.
        ConnectionError(err: io::Error) {
            description("connection error")
            display("connection error: {}", err)
        }
        /// Transport `send` or `receive` reported a negative return.
        NetworkError(err: io::Error) {
            description("network error")
            display("network error: {}", err)
            from()
        }
        /// Parser reported a non-benign error number.
        ParsingError(err: httparse::Error) {
            description("parsing error")
            display("parsing error: {}", err)
            from()
        }
        /// Transport receive returned zero, or the `rx-start` wait timed out.
        TimeoutError {
            description("timeout")
        }
        /// Body arena filled before BODY-COMPLETE.
        MessageTooLarge {
            description("message too large for supplied body arena")
        }
        /// `read-*` could not locate the requested datum.
        NotFound {
            description("not found")
        }
        /// `usage` wait timed out.
        Busy {
            description("connection busy")
        }
        /// Formatter primitives returned negative lengths; should be unreachable.
        InternalError(msg: &'static str) {
            description("internal error")
            display("internal error: {}", msg)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_network_error() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(format!("{}", err).starts_with("network error"));
    }
}
