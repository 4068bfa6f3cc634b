use std::net::TcpStream;
use std::str::FromStr;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{ClientRequestBuilder, Error, Message, Utf8Bytes, WebSocket};
use tungstenite::handshake::client::Response;
use tungstenite::http::Uri;
use tungstenite::protocol::CloseFrame;
use crate::error::{SupervisorResult, SupervisorError};
use super::options::TransportOptions;
use super::transport::DialRequest;

// ============================================================================
// Shared Internal Helpers
// ============================================================================

pub(crate) type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Outcome of a failed socket read
pub(crate) enum ReadOutcome {
    /// Nothing to read yet, keep polling
    Idle,
    /// The peer closed the connection
    Closed(String),
    /// The connection broke
    Failed(String),
}

/// Builds the handshake request for a dial target, with optional custom headers.
/// Runs on the caller's thread so an unusable target fails synchronously.
pub(crate) fn build_request(request: &DialRequest) -> SupervisorResult<ClientRequestBuilder> {
    let uri = Uri::from_str(request.target.as_str()).map_err(|e| {
        tracing::error!("Error connecting to invalid URI: {}", request.target.path());
        SupervisorError::InvalidUri(e.to_string())
    })?;

    match uri.scheme_str() {
        Some("ws") | Some("wss") => {},
        other => {
            return Err(SupervisorError::InvalidUri(format!("Unsupported scheme: {}", other.unwrap_or(""))));
        }
    }

    let mut builder = ClientRequestBuilder::new(uri);
    for (key, value) in &request.headers {
        builder = builder.with_header(key.as_str(), value.as_str());
    }
    Ok(builder)
}

/// Performs the blocking WebSocket handshake
pub(crate) fn connect_socket(builder: ClientRequestBuilder) -> SupervisorResult<Socket> {
    let (socket, response) = tungstenite::connect(builder)?;
    trace_on_connected(&response);
    Ok(socket)
}

/// Configures socket for non-blocking operation with TCP_NODELAY
pub(crate) fn configure_non_blocking(socket: &mut Socket, options: &TransportOptions) -> SupervisorResult<()> {
    let stream = match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream,
        MaybeTlsStream::NativeTls(stream) => stream.get_mut(),
        // TODO: Add support for rustls
        _ => return Ok(()),
    };

    stream.set_nonblocking(true)?;

    if let Some(nodelay) = options.nodelay {
        stream.set_nodelay(nodelay)?;
    }
    if let Some(ttl) = options.ttl {
        stream.set_ttl(ttl)?;
    }

    Ok(())
}

/// Classifies socket read errors
pub(crate) fn handle_read_error(error: Error) -> ReadOutcome {
    match error {
        Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::WouldBlock => {
            // No data available, continue loop (expected in non-blocking mode)
            ReadOutcome::Idle
        },
        Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::TimedOut => {
            // No data available (e.g. Windows)
            ReadOutcome::Idle
        },
        Error::ConnectionClosed | Error::AlreadyClosed => {
            let reason = "Connection closed normally".to_string();
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!(reason);
            }
            ReadOutcome::Closed(reason)
        },
        e => {
            let error = format!("Failed to read from socket: {}", e);
            tracing::error!(error);
            ReadOutcome::Failed(error)
        }
    }
}

/// Sends text message to WebSocket.
/// A write that would block stays queued in tungstenite and is flushed by later reads.
#[inline]
pub(crate) fn send_text_message_to_websocket(socket: &mut Socket, text: &str) -> SupervisorResult<()> {
    match socket.send(Message::text(text)) {
        Ok(()) => {
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!("Sent text message: {}", text);
            }
            Ok(())
        },
        Err(Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::WouldBlock => {
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!("Queued text message: {}", text);
            }
            Ok(())
        },
        Err(e) => {
            tracing::error!("Error sending text message: {}", e);
            Err(SupervisorError::from(e))
        }
    }
}

/// Closes WebSocket connection with context logging
pub(crate) fn close_websocket_with_logging(socket: &mut Socket, context: &str) {
    if socket.can_write() {
        socket.close(None)
            .map(|_| {
                tracing::trace!("Connection close successfully requested for context: {}", context);
            })
            .unwrap_or_else(|e| {
                tracing::error!("Error on connection close request for context {}: {}", context, e);
            });
    }
}

/// Traces connection establishment
pub(crate) fn trace_on_connected(response: &Response) {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("Connected to the server");
        tracing::trace!("Response HTTP code: {}", response.status());
        tracing::trace!("Response contains the following headers:");
        for (header, _value) in response.headers() {
            tracing::trace!("* {header}");
        }
    }
}

/// Traces text message receipt
#[inline]
pub(crate) fn trace_on_text_message(message: &Utf8Bytes) {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("Received text message: {}", message);
    }
}

/// Traces connection close frame receipt
pub(crate) fn trace_on_close_frame(close_frame: &Option<CloseFrame>) {
    if tracing::enabled!(tracing::Level::TRACE) {
        match close_frame {
            Some(reason) => {
                tracing::trace!("Connection closed with reason: {}", reason)
            },
            None => {
                tracing::trace!("Connection closed without reason")
            },
        }
    }
}

/// Traces receipt of a frame the supervisor does not forward
#[inline]
pub(crate) fn trace_on_ignored_frame(kind: &str) {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("Ignoring {} frame from server", kind);
    }
}
