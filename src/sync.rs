//! Synchronous request driver (C6): `send_sync`.
//!
//! Orchestrates one full request/response exchange: acquire the
//! connection, send headers then the library-appended finalization
//! block then any body, wait for the receive-ready rendezvous, pull
//! headers then body through the parser adapter, flush whatever is
//! left on the wire, and release the connection for reuse (§4.6).

use std::io::{Cursor, Write};

use config::Config;
use connection::{Connection, ConnectionInfo};
use config::MAX_FLUSH_BUFFER_SIZE;
use error::Error;
use request::Request;
use response::{ParserState, ProcessingMode, Response};
use transport::{Connect, RecvOutcome, Transport};

/// `send-sync(conn*, req, resp*)` (§4.6, §6).
///
/// `conn_cell` is the caller's connection handle cell: `None` or a
/// disconnected `Connection` triggers an implicit connect using
/// `request`'s `connection_info` (§4.6 step 2), writing the resulting
/// handle back so the caller can reuse it on the next call.
pub fn send_sync<T, C>(
    conn_cell: &mut Option<Connection<T>>,
    connector: &C,
    request: &Request,
    response: &mut Response,
    config: &Config,
) -> Result<(), Error>
    where T: Transport, C: Connect<Transport = T>
{
    ensure_connected(conn_cell, connector, request, config)?;
    let connection = conn_cell.as_ref().expect("just ensured connected").clone();

    connection.acquire_usage()?;

    let result = run_exchange(&connection, request, response);

    let flush_result = flush_residual(&connection, response);
    if connection.non_persistent() {
        connection.disconnect();
    }
    response.set_processing_mode(ProcessingMode::Finished);
    connection.post_rx_finish();
    connection.release_usage();

    match result {
        Ok(()) => flush_result,
        Err(primary) => {
            if let Err(flush_err) = flush_result {
                warn!("flush after primary error {} also failed: {}", primary, flush_err);
            }
            Err(primary)
        }
    }
}

fn ensure_connected<T, C>(
    conn_cell: &mut Option<Connection<T>>,
    connector: &C,
    request: &Request,
    config: &Config,
) -> Result<(), Error>
    where T: Transport, C: Connect<Transport = T>
{
    let needs_connect = match conn_cell {
        None => true,
        Some(conn) => !conn.is_connected(),
    };
    if !needs_connect {
        return Ok(());
    }
    let info: &ConnectionInfo = request.connection_info()
        .ok_or(Error::InvalidParameter(
            "no connection handle and request carries no connection_info for implicit connect"))?;
    let connection = Connection::connect(connector, info, config)?;
    *conn_cell = Some(connection);
    Ok(())
}

/// Steps 5-12 of §4.6: everything between acquiring `usage` and
/// cleanup. Any error here is the "primary" error `send_sync`
/// preserves through cleanup.
fn run_exchange<T: Transport>(
    connection: &Connection<T>,
    request: &Request,
    response: &mut Response,
) -> Result<(), Error> {
    response.reset();

    connection.send(request.header_bytes())?;

    let body = request.body().filter(|b| !b.is_empty());
    let mut finalization = [0u8; 64];
    let finalization_len = format_finalization(
        &mut finalization, connection.non_persistent(), body.map(|b| b.len()).unwrap_or(0))?;
    connection.send(&finalization[..finalization_len])?;

    if let Some(body) = body {
        connection.send(body)?;
    }

    if !connection.wait_rx_start() {
        return Err(Error::TimeoutError);
    }

    let response_wait = connection.response_wait();

    response.set_processing_mode(ProcessingMode::FillingHeaderArena);
    loop {
        if response.header_arena_full() {
            break;
        }
        let complete = {
            let buf = response.header_tail_mut();
            match connection.receive(buf, response_wait)? {
                RecvOutcome::Timeout => return Err(Error::TimeoutError),
                RecvOutcome::Data(n) => response.on_header_bytes(n)?,
            }
        };
        if complete {
            break;
        }
    }

    let headers_done = !matches!(response.parser_state(), ParserState::None | ParserState::InHeaders);
    if !headers_done {
        // §4.6 step 10: headers didn't complete; the residual flush
        // in cleanup takes care of draining whatever is left.
        return Ok(());
    }

    if response.has_body_arena() && !response.body_wants_no_more() {
        response.set_processing_mode(ProcessingMode::FillingBodyArena);
        loop {
            if response.body_wants_no_more() {
                break;
            }
            let buf = match response.body_tail_mut() {
                Some(buf) if !buf.is_empty() => buf,
                _ => break,
            };
            match connection.receive(buf, response_wait)? {
                RecvOutcome::Timeout => return Err(Error::TimeoutError),
                RecvOutcome::Data(n) => response.on_body_bytes(n)?,
            }
        }
        if response.parser_state() != ParserState::BodyComplete {
            return Err(Error::MessageTooLarge);
        }
    }

    Ok(())
}

/// §4.6 step 13a: drain whatever the server still has queued so the
/// connection is safe to reuse, reading into a fixed-size scratch
/// buffer and feeding it to the parser so the loop notices the message
/// actually completing (a chunked terminator, or a filled
/// `Content-Length`) instead of always waiting out the timeout.
/// Network timeouts are swallowed (the server has nothing more to
/// say); other errors are logged and returned as the flush status, but
/// never mask an earlier primary error (see `send_sync`).
fn flush_residual<T: Transport>(connection: &Connection<T>, response: &mut Response)
    -> Result<(), Error>
{
    if response.parser_state() == ParserState::BodyComplete {
        return Ok(());
    }
    let mut scratch = [0u8; MAX_FLUSH_BUFFER_SIZE];
    loop {
        if response.parser_state() == ParserState::BodyComplete {
            return Ok(());
        }
        match connection.receive(&mut scratch, connection.response_wait()) {
            Ok(RecvOutcome::Timeout) => {
                response.mark_drained();
                return Ok(());
            }
            Ok(RecvOutcome::Data(0)) => {
                response.mark_drained();
                return Ok(());
            }
            Ok(RecvOutcome::Data(n)) => {
                response.feed_flush_bytes(&scratch[..n])?;
            }
            Err(err) => {
                warn!("error flushing residual response bytes: {}", err);
                response.mark_drained();
                return Err(err);
            }
        }
    }
}

/// The finalization block (§4.6 step 6): `Connection: keep-alive` or
/// `Connection: close` (§9 Open Question: the source's non-conforming
/// `closed` token is not reproduced), plus `Content-Length` when the
/// request carries a body, else the bare terminating blank line.
/// Formatted straight into `buf` via a `Cursor`, sized for the worst
/// case so no allocation is needed.
fn format_finalization(buf: &mut [u8], non_persistent: bool, body_len: usize)
    -> Result<usize, Error>
{
    let mut cursor = Cursor::new(buf);
    let connection_line = if non_persistent { "Connection: close\r\n" } else { "Connection: keep-alive\r\n" };
    write!(cursor, "{}", connection_line)
        .map_err(|_| Error::InternalError("formatting finalization block"))?;
    if body_len > 0 {
        write!(cursor, "Content-Length: {}\r\n\r\n", body_len)
    } else {
        write!(cursor, "\r\n")
    }.map_err(|_| Error::InternalError("formatting finalization block"))?;
    Ok(cursor.position() as usize)
}
