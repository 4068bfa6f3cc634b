use std::thread::{self, JoinHandle};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tungstenite::{ClientRequestBuilder, Message};
use crate::error::{SupervisorResult, SupervisorError};
use super::options::TransportOptions;
use super::transport::{Connector, DialRequest, Transport};
use super::types::TransportEvent;
use super::types::{send_or_break, send_or_log};
use super::shared;

// ============================================================================
// TungsteniteConnector - opens socket threads
// ============================================================================

/// Commands from the supervisor to the socket thread
enum TransportCommand {
    SendText(String),
    Close(),
}

/// Production [`Connector`]: every dial gets its own socket thread that performs the
/// handshake and then runs a non-blocking read loop.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector {
    options: TransportOptions,
}

impl TungsteniteConnector {
    pub fn new(options: TransportOptions) -> Self {
        TungsteniteConnector { options }
    }
}

impl Connector for TungsteniteConnector {
    type Transport = TungsteniteTransport;

    fn open(&mut self, request: &DialRequest) -> SupervisorResult<TungsteniteTransport> {
        let builder = shared::build_request(request)?;

        let (command_tx, command_rx) = unbounded::<TransportCommand>();
        let (event_tx, event_rx) = unbounded::<TransportEvent>();
        let options = self.options.clone();

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Starting socket thread for {}", request.target.host_str().unwrap_or(""));
        }

        let join_handle = thread::Builder::new()
            .name("s9-ws-transport".to_string())
            .spawn(move || run_socket_loop(builder, options, command_rx, event_tx))?;

        Ok(TungsteniteTransport {
            command_tx,
            event_rx,
            join_handle: Some(join_handle),
        })
    }
}

// ============================================================================
// TungsteniteTransport - supervisor side of a socket thread
// ============================================================================

/// Handle to one socket thread. Dropping it makes the thread close the socket and exit.
pub struct TungsteniteTransport {
    command_tx: Sender<TransportCommand>,
    event_rx: Receiver<TransportEvent>,
    join_handle: Option<JoinHandle<()>>,
}

impl Transport for TungsteniteTransport {
    #[inline]
    fn send_text(&mut self, text: &str) -> SupervisorResult<()> {
        self.command_tx
            .send(TransportCommand::SendText(text.to_string()))
            .map_err(|_| SupervisorError::ChannelClosed)
    }

    fn close(&mut self) -> SupervisorResult<()> {
        self.command_tx
            .send(TransportCommand::Close())
            .map_err(|_| SupervisorError::ChannelClosed)
    }

    #[inline]
    fn try_recv_event(&mut self) -> Option<TransportEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        // A thread still in its handshake is left to notice the dropped channels on its own
        if let Some(handle) = self.join_handle.take() {
            if handle.is_finished() && handle.join().is_err() {
                tracing::error!("Socket thread panicked");
            }
        }
    }
}

// ============================================================================
// Socket thread
// ============================================================================

fn run_socket_loop(
    builder: ClientRequestBuilder,
    options: TransportOptions,
    command_rx: Receiver<TransportCommand>,
    event_tx: Sender<TransportEvent>,
) {
    let mut socket = match shared::connect_socket(builder) {
        Ok(socket) => socket,
        Err(error) => {
            let reason = format!("Failed to connect: {}", error);
            tracing::error!(reason);
            send_or_log!(event_tx, "TransportEvent::Error on connect", TransportEvent::Error(reason.clone()));
            send_or_log!(event_tx, "TransportEvent::Closed on connect", TransportEvent::Closed(Some(reason)));
            return;
        }
    };

    if let Err(error) = shared::configure_non_blocking(&mut socket, &options) {
        let reason = format!("Failed to configure socket: {}", error);
        tracing::error!(reason);
        shared::close_websocket_with_logging(&mut socket, "on configure failure");
        send_or_log!(event_tx, "TransportEvent::Error on configure", TransportEvent::Error(reason.clone()));
        send_or_log!(event_tx, "TransportEvent::Closed on configure", TransportEvent::Closed(Some(reason)));
        return;
    }

    if event_tx.send(TransportEvent::Opened).is_err() {
        // Supervisor moved on while the handshake was running
        shared::close_websocket_with_logging(&mut socket, "on abandoned dial");
        return;
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Starting socket loop");
    }

    loop {
        // 1. Check for commands (non-blocking)
        match command_rx.try_recv() {
            Ok(TransportCommand::SendText(text)) => {
                if let Err(e) = shared::send_text_message_to_websocket(&mut socket, &text) {
                    send_or_break!(event_tx, "TransportEvent::Error on SendText", TransportEvent::Error(format!("Error sending text: {}", e)));
                }
            },
            Ok(TransportCommand::Close()) => {
                shared::close_websocket_with_logging(&mut socket, "TransportCommand::Close");
            },
            Err(TryRecvError::Empty) => {},
            Err(TryRecvError::Disconnected) => {
                shared::close_websocket_with_logging(&mut socket, "on transport drop");
                break;
            }
        }

        // 2. Try to read from socket (non-blocking)
        match socket.read() {
            Ok(Message::Text(message)) => {
                shared::trace_on_text_message(&message);
                send_or_break!(event_tx, "TransportEvent::Message on Message::Text", TransportEvent::Message(message.as_str().to_owned()));
            },
            Ok(Message::Close(close_frame)) => {
                shared::trace_on_close_frame(&close_frame);
                let reason = close_frame.map(|cf| cf.to_string());
                // Push out the queued close reply before the socket is dropped
                if let Err(e) = socket.flush() {
                    tracing::trace!("Flushing close reply failed: {}", e);
                }
                send_or_log!(event_tx, "TransportEvent::Closed on Message::Close", TransportEvent::Closed(reason));
                break;
            },
            Ok(Message::Binary(_)) => shared::trace_on_ignored_frame("binary"),
            Ok(Message::Ping(_)) => shared::trace_on_ignored_frame("ping"),
            Ok(Message::Pong(_)) => shared::trace_on_ignored_frame("pong"),
            Ok(Message::Frame(_)) => shared::trace_on_ignored_frame("raw"),
            Err(error) => {
                match shared::handle_read_error(error) {
                    shared::ReadOutcome::Idle => {},
                    shared::ReadOutcome::Closed(reason) => {
                        send_or_log!(event_tx, "TransportEvent::Closed on Error::ConnectionClosed", TransportEvent::Closed(Some(reason)));
                        break;
                    },
                    shared::ReadOutcome::Failed(reason) => {
                        send_or_log!(event_tx, "TransportEvent::Error on read", TransportEvent::Error(reason.clone()));
                        send_or_log!(event_tx, "TransportEvent::Closed on read", TransportEvent::Closed(Some(reason)));
                        break;
                    }
                }
            }
        }

        // Optionally sleep to reduce CPU usage
        if let Some(duration) = options.spin_wait_duration {
            thread::sleep(duration);
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Socket loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};
    use url::Url;

    fn recv_event(transport: &mut TungsteniteTransport) -> Option<TransportEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(event) = transport.try_recv_event() {
                return Some(event);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_open_rejects_unsupported_scheme() {
        let request = DialRequest {
            target: Url::parse("http://localhost/ws").unwrap(),
            headers: vec![],
        };
        let result = TungsteniteConnector::default().open(&request);
        assert!(matches!(result, Err(SupervisorError::InvalidUri(_))));
    }

    #[test]
    fn test_refused_dial_reports_error_then_close() {
        // Bind and drop a listener to get a local port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let request = DialRequest {
            target: Url::parse(&format!("ws://127.0.0.1:{}/ws", port)).unwrap(),
            headers: vec![],
        };

        let mut transport = TungsteniteConnector::default().open(&request).unwrap();

        assert!(matches!(recv_event(&mut transport), Some(TransportEvent::Error(_))));
        assert!(matches!(recv_event(&mut transport), Some(TransportEvent::Closed(Some(_)))));
    }

    #[test]
    fn test_echo_round_trip_with_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut websocket = tungstenite::accept(stream).unwrap();
            loop {
                match websocket.read() {
                    Ok(Message::Text(text)) => {
                        websocket.send(Message::text(format!("echo:{}", text))).unwrap();
                    },
                    // The close reply goes out on the next read, which then reports the end
                    Ok(_) => {},
                    Err(_) => break,
                }
            }
        });

        let request = DialRequest {
            target: Url::parse(&format!("ws://127.0.0.1:{}/ws?token=t&deviceType=d", port)).unwrap(),
            headers: vec![("token".to_string(), "t".to_string())],
        };
        let mut transport = TungsteniteConnector::new(TransportOptions::new().nodelay(true))
            .open(&request)
            .unwrap();

        assert_eq!(recv_event(&mut transport), Some(TransportEvent::Opened));
        transport.send_text("hello").unwrap();
        assert_eq!(recv_event(&mut transport), Some(TransportEvent::Message("echo:hello".to_string())));

        transport.close().unwrap();
        assert!(matches!(recv_event(&mut transport), Some(TransportEvent::Closed(_))));

        server.join().unwrap();
    }
}
