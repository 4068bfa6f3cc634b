use std::thread;
use crossbeam_channel::{unbounded, Receiver, Sender};
use super::endpoint::Endpoint;
use super::options::SupervisorOptions;
use super::timer::{self, Clock, SystemClock, TimerHandle};
use super::transport::{Connector, DialRequest, Transport};
use super::tungstenite_transport::TungsteniteConnector;
use super::types::{ConnectionState, ControlMessage, EventHandlers, TransportEvent};

/// Payload sent by the heartbeat while connected.
pub const HEARTBEAT_PAYLOAD: &str = "ping";

// Debug lines are opt-in per supervisor on top of the subscriber's own filtering
macro_rules! debug_log {
    ($supervisor:expr, $($arg:tt)+) => {
        if $supervisor.options.debug_logging && tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!($($arg)+);
        }
    };
}

// ============================================================================
// ConnectionSupervisor - persistent connection with heartbeat and reconnect
// ============================================================================

/// Keeps one WebSocket connection alive on behalf of a caller.
///
/// The supervisor owns at most one [`Transport`] at a time, the heartbeat and reconnect
/// timers and the caller's [`EventHandlers`]. All of it is driven from the thread that calls
/// [`poll`](Self::poll) or [`run`](Self::run): transport events, timers and handler calls
/// never overlap.
///
/// None of the operations block. [`connect`](Self::connect) only launches a dial attempt;
/// its outcome arrives later as a state change to [`ConnectionState::Connected`] or as an
/// error followed by a close.
///
/// ```no_run
/// use s9_ws_supervisor::{ConnectionSupervisor, EventHandlers, SupervisorOptions};
///
/// let mut supervisor = ConnectionSupervisor::new(SupervisorOptions::new().auto_reconnect(true));
/// supervisor.set_event_handlers(
///     EventHandlers::new()
///         .on_message(|text| println!("received {}", text))
///         .on_state_change(|state| println!("state {}", state)),
/// );
/// supervisor.connect("ws://127.0.0.1:9688/ws", "token", None);
/// supervisor.run();
/// ```
pub struct ConnectionSupervisor<C: Connector = TungsteniteConnector, K: Clock = SystemClock> {
    connector: C,
    clock: K,
    options: SupervisorOptions,
    state: ConnectionState,
    transport: Option<C::Transport>,
    endpoint: Option<Endpoint>,
    handlers: EventHandlers,
    heartbeat_timer: Option<TimerHandle>,
    reconnect_timer: Option<TimerHandle>,
    connect_timer: Option<TimerHandle>,
    close_timer: Option<TimerHandle>,
    auto_reconnect: bool,
    running: bool,
    control_tx: Sender<ControlMessage>,
    control_rx: Receiver<ControlMessage>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor backed by the tungstenite transport and the system clock.
    pub fn new(options: SupervisorOptions) -> Self {
        Self::with_parts(TungsteniteConnector::default(), SystemClock, options)
    }
}

impl<C: Connector, K: Clock> ConnectionSupervisor<C, K> {
    pub fn with_parts(connector: C, clock: K, options: SupervisorOptions) -> Self {
        let (control_tx, control_rx) = unbounded::<ControlMessage>();
        ConnectionSupervisor {
            connector,
            clock,
            auto_reconnect: options.auto_reconnect,
            options,
            state: ConnectionState::Disconnected,
            transport: None,
            endpoint: None,
            handlers: EventHandlers::default(),
            heartbeat_timer: None,
            reconnect_timer: None,
            connect_timer: None,
            close_timer: None,
            running: true,
            control_tx,
            control_rx,
        }
    }

    // ------------------------------------------------------------------------
    // Caller API
    // ------------------------------------------------------------------------

    /// Launches a connection attempt to `url` with `token` and `device_type` set as query
    /// parameters. An absent or empty device type means
    /// [`DEFAULT_DEVICE_TYPE`](crate::DEFAULT_DEVICE_TYPE).
    ///
    /// Returns `true` when the attempt was launched, or right away when already connected.
    /// Returns `false` only for a synchronous failure such as a malformed URL, in which case
    /// the state goes back to `Disconnected`.
    ///
    /// An attempt that is still not open after
    /// [`connect_timeout`](SupervisorOptions::connect_timeout) is abandoned and handled like a
    /// failed connection: an error, then a close.
    pub fn connect(&mut self, url: &str, token: &str, device_type: Option<&str>) -> bool {
        if self.state == ConnectionState::Connected {
            debug_log!(self, "Already connected");
            return true;
        }

        timer::cancel(&mut self.reconnect_timer);
        timer::cancel(&mut self.close_timer);
        self.set_state(ConnectionState::Connecting);

        let endpoint = Endpoint::new(url, token, device_type);
        let target = match endpoint.dial_target() {
            Ok(target) => target,
            Err(e) => {
                debug_log!(self, "Connection failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
        };

        let headers = if self.options.auth_headers {
            endpoint.auth_headers()
        } else {
            Vec::new()
        };
        let request = DialRequest { target, headers };

        self.release_transport();

        match self.connector.open(&request) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.endpoint = Some(endpoint);
                let deadline = TimerHandle::one_shot(self.clock.now(), self.options.connect_timeout);
                timer::arm(&mut self.connect_timer, deadline);
                true
            },
            Err(e) => {
                debug_log!(self, "Connection failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                false
            }
        }
    }

    /// Sends a text message. Returns `false` without touching the transport unless connected,
    /// and `false` if the transport rejects the write.
    pub fn send(&mut self, message: &str) -> bool {
        if self.state != ConnectionState::Connected {
            debug_log!(self, "Not connected");
            return false;
        }

        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        match transport.send_text(message) {
            Ok(()) => true,
            Err(e) => {
                debug_log!(self, "Send failed: {}", e);
                false
            }
        }
    }

    /// Closes the connection for good: auto-reconnect is switched off for this supervisor and
    /// no heartbeat or reconnect fires afterwards. Returns `false` and changes nothing unless
    /// connected.
    ///
    /// The transport is kept until the peer answers the close, or until
    /// [`close_timeout`](SupervisorOptions::close_timeout) passes without an answer.
    pub fn close(&mut self) -> bool {
        if !self.is_connected() {
            return false;
        }

        self.auto_reconnect = false;
        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.close() {
                debug_log!(self, "Close failed: {}", e);
            }
            let deadline = TimerHandle::one_shot(self.clock.now(), self.options.close_timeout);
            timer::arm(&mut self.close_timer, deadline);
        }
        self.set_state(ConnectionState::Disconnected);
        self.stop_heartbeat();
        timer::cancel(&mut self.reconnect_timer);
        timer::cancel(&mut self.connect_timer);
        true
    }

    /// Merges `handlers` into the registered set.
    pub fn set_event_handlers(&mut self, handlers: EventHandlers) {
        self.handlers.merge(handlers);
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The endpoint of the last launched connection attempt.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// `false` once a manual [`close`](Self::close) happened, or when configured off.
    pub fn auto_reconnect_enabled(&self) -> bool {
        self.auto_reconnect
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Sender for queueing work from handlers or other threads. Queued messages are applied
    /// by the next [`poll`](Self::poll).
    pub fn control_sender(&self) -> Sender<ControlMessage> {
        self.control_tx.clone()
    }

    pub fn heartbeat_timer(&self) -> Option<&TimerHandle> {
        self.heartbeat_timer.as_ref()
    }

    pub fn reconnect_timer(&self) -> Option<&TimerHandle> {
        self.reconnect_timer.as_ref()
    }

    /// Deadline of the dial attempt in flight.
    pub fn connect_timer(&self) -> Option<&TimerHandle> {
        self.connect_timer.as_ref()
    }

    /// Deadline for the peer's reply to a manual close.
    pub fn close_timer(&self) -> Option<&TimerHandle> {
        self.close_timer.as_ref()
    }

    // ------------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------------

    /// Processes queued control messages, pending transport events and due timers once.
    pub fn poll(&mut self) {
        while let Ok(control_message) = self.control_rx.try_recv() {
            self.handle_control_message(control_message);
        }

        loop {
            let event = match self.transport.as_mut() {
                Some(transport) => transport.try_recv_event(),
                None => None,
            };
            match event {
                Some(event) => self.handle_transport_event(event),
                None => break,
            }
        }

        self.fire_due_timers();
    }

    /// Polls until [`ControlMessage::ForceQuit`] arrives or the supervisor has nothing left to
    /// do: disconnected, no transport winding down and no reconnect pending. After a manual
    /// close this takes at most [`close_timeout`](SupervisorOptions::close_timeout).
    pub fn run(&mut self) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Starting supervisor loop");
        }

        self.running = true;
        while self.running {
            self.poll();

            if self.is_idle() {
                break;
            }

            // Optionally sleep to reduce CPU usage
            if let Some(duration) = self.options.spin_wait_duration {
                thread::sleep(duration);
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Supervisor loop finished");
        }
    }

    /// Disconnected with no transport and no reconnect pending.
    pub fn is_idle(&self) -> bool {
        self.state == ConnectionState::Disconnected
            && self.transport.is_none()
            && self.reconnect_timer.is_none()
    }

    fn handle_control_message(&mut self, control_message: ControlMessage) {
        match control_message {
            ControlMessage::SendText(text) => {
                self.send(&text);
            },
            ControlMessage::Connect { url, token, device_type } => {
                self.connect(&url, &token, device_type.as_deref());
            },
            ControlMessage::Close() => {
                self.close();
            },
            ControlMessage::ForceQuit() => {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Forcibly quitting supervisor loop");
                }
                self.running = false;
            }
        }
    }

    // ------------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------------

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_transport_opened(),
            TransportEvent::Message(text) => {
                debug_log!(self, "Received message: {}", text);
                self.handlers.dispatch_message(&text);
            },
            TransportEvent::Error(error) => {
                debug_log!(self, "WebSocket error: {}", error);
                self.handlers.dispatch_error(&error);
            },
            TransportEvent::Closed(reason) => self.on_transport_closed(reason),
        }
    }

    fn on_transport_opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!("Ignoring open event in state {}", self.state);
            }
            return;
        }
        timer::cancel(&mut self.connect_timer);
        self.set_state(ConnectionState::Connected);
        debug_log!(self, "WebSocket connected");
        self.start_heartbeat();
    }

    fn on_transport_closed(&mut self, reason: Option<String>) {
        self.transport = None;
        self.stop_heartbeat();
        timer::cancel(&mut self.connect_timer);
        timer::cancel(&mut self.close_timer);

        let reconnect = self.auto_reconnect && self.state != ConnectionState::Disconnected;
        if reconnect {
            self.set_state(ConnectionState::Reconnecting);
        } else {
            self.set_state(ConnectionState::Disconnected);
        }
        debug_log!(self, "WebSocket closed: {}", reason.as_deref().unwrap_or("no reason"));

        self.handlers.dispatch_close();

        if reconnect {
            self.schedule_reconnect();
        }
    }

    /// Fires `on_state_change` only when the state actually changes.
    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug_log!(self, "State {} -> {}", self.state, state);
        self.state = state;
        self.handlers.dispatch_state_change(state);
    }

    fn on_connect_timeout(&mut self) {
        let reason = format!("Connection timed out after {:?}", self.options.connect_timeout);
        debug_log!(self, "{}", reason);
        self.handlers.dispatch_error(&reason);
        self.release_transport();
        self.on_transport_closed(Some(reason));
    }

    fn on_close_timeout(&mut self) {
        debug_log!(self, "No close reply after {:?}, dropping transport", self.options.close_timeout);
        // Dropping the handle tears the socket down without waiting for the peer
        self.transport = None;
        self.on_transport_closed(Some("Close reply timed out".to_string()));
    }

    fn release_transport(&mut self) {
        if let Some(mut previous) = self.transport.take() {
            if let Err(e) = previous.close() {
                debug_log!(self, "Closing previous transport failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------------

    fn start_heartbeat(&mut self) {
        let heartbeat = TimerHandle::periodic(self.clock.now(), self.options.heartbeat_interval);
        timer::arm(&mut self.heartbeat_timer, heartbeat);
    }

    fn stop_heartbeat(&mut self) {
        timer::cancel(&mut self.heartbeat_timer);
    }

    fn schedule_reconnect(&mut self) {
        let reconnect = TimerHandle::one_shot(self.clock.now(), self.options.reconnect_interval);
        timer::arm(&mut self.reconnect_timer, reconnect);
    }

    fn fire_due_timers(&mut self) {
        let now = self.clock.now();

        if self.connect_timer.is_some_and(|t| t.is_due(now)) {
            timer::cancel(&mut self.connect_timer);
            self.on_connect_timeout();
        }

        if self.close_timer.is_some_and(|t| t.is_due(now)) {
            timer::cancel(&mut self.close_timer);
            self.on_close_timeout();
        }

        if self.reconnect_timer.is_some_and(|t| t.is_due(now)) {
            timer::cancel(&mut self.reconnect_timer);
            self.reconnect();
        }

        // One ping per elapsed period, so a late poll catches up
        while let Some(heartbeat) = self.heartbeat_timer.as_mut() {
            if !heartbeat.is_due(now) {
                break;
            }
            heartbeat.advance();
            self.send(HEARTBEAT_PAYLOAD);
        }
    }

    fn reconnect(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        debug_log!(self, "Attempting to reconnect...");
        self.connect(endpoint.url(), endpoint.token(), Some(endpoint.device_type()));
    }
}

impl<C: Connector, K: Clock> Drop for ConnectionSupervisor<C, K> {
    fn drop(&mut self) {
        timer::cancel(&mut self.heartbeat_timer);
        timer::cancel(&mut self.reconnect_timer);
        timer::cancel(&mut self.connect_timer);
        timer::cancel(&mut self.close_timer);
        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.close() {
                tracing::trace!("Transport close on Drop failed: {}", e);
            }
        }
    }
}
