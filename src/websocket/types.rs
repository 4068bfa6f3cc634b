use std::fmt;

// ============================================================================
// Macros
// ============================================================================

macro_rules! send_or_break {
    ($sender:expr, $context:expr, $event:expr) => {
        if let Err(e) = $sender.send($event) {
            tracing::error!("Failed to send context {} through channel: {}", $context, e);
            break;
        }
    };
}

macro_rules! send_or_log {
    ($sender:expr, $context:expr, $event:expr) => {
        if let Err(e) = $sender.send($event) {
            tracing::error!("Failed to send context {} through channel: {}", $context, e);
        }
    };
}

pub(crate) use send_or_break;
pub(crate) use send_or_log;

// ============================================================================
// Public API Types
// ============================================================================

/// Lifecycle state of a [`ConnectionSupervisor`](crate::ConnectionSupervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Stable numeric code of the state, `0` for `Disconnected` up to `3` for `Reconnecting`.
    pub fn code(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

/// Lifecycle notification produced by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Error(String),
    Closed(Option<String>),
}

/// Work queued for the supervisor from another thread or from inside a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SendText(String),
    Connect {
        url: String,
        token: String,
        device_type: Option<String>,
    },
    Close(),
    ForceQuit(),
}

pub type MessageHandler = Box<dyn FnMut(&str)>;
pub type StateChangeHandler = Box<dyn FnMut(ConnectionState)>;
pub type ErrorHandler = Box<dyn FnMut(&str)>;
pub type CloseHandler = Box<dyn FnMut()>;

/// Caller supplied callbacks, one optional slot per event.
///
/// Registering a set with
/// [`set_event_handlers`](crate::ConnectionSupervisor::set_event_handlers) merges it into the
/// set already held: slots filled in the new set replace the old handler, empty slots leave
/// the old handler in place.
///
/// ```
/// use s9_ws_supervisor::EventHandlers;
///
/// let handlers = EventHandlers::new()
///     .on_message(|text| println!("received {}", text))
///     .on_close(|| println!("closed"));
/// assert!(handlers.has_message_handler());
/// assert!(!handlers.has_error_handler());
/// ```
#[derive(Default)]
pub struct EventHandlers {
    on_message: Option<MessageHandler>,
    on_state_change: Option<StateChangeHandler>,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        self.on_message = Some(Box::new(handler));
        self
    }

    pub fn on_state_change<F>(mut self, handler: F) -> Self
    where
        F: FnMut(ConnectionState) + 'static,
    {
        self.on_state_change = Some(Box::new(handler));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_close = Some(Box::new(handler));
        self
    }

    pub fn has_message_handler(&self) -> bool {
        self.on_message.is_some()
    }

    pub fn has_state_change_handler(&self) -> bool {
        self.on_state_change.is_some()
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }

    pub fn has_close_handler(&self) -> bool {
        self.on_close.is_some()
    }

    pub(crate) fn merge(&mut self, other: EventHandlers) {
        if let Some(handler) = other.on_message {
            self.on_message = Some(handler);
        }
        if let Some(handler) = other.on_state_change {
            self.on_state_change = Some(handler);
        }
        if let Some(handler) = other.on_error {
            self.on_error = Some(handler);
        }
        if let Some(handler) = other.on_close {
            self.on_close = Some(handler);
        }
    }

    #[inline]
    pub(crate) fn dispatch_message(&mut self, text: &str) {
        if let Some(handler) = self.on_message.as_mut() {
            handler(text);
        }
    }

    #[inline]
    pub(crate) fn dispatch_state_change(&mut self, state: ConnectionState) {
        if let Some(handler) = self.on_state_change.as_mut() {
            handler(state);
        }
    }

    #[inline]
    pub(crate) fn dispatch_error(&mut self, error: &str) {
        if let Some(handler) = self.on_error.as_mut() {
            handler(error);
        }
    }

    #[inline]
    pub(crate) fn dispatch_close(&mut self) {
        if let Some(handler) = self.on_close.as_mut() {
            handler();
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_message", &self.has_message_handler())
            .field("on_state_change", &self.has_state_change_handler())
            .field("on_error", &self.has_error_handler())
            .field("on_close", &self.has_close_handler())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_state_codes_and_labels() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Disconnected.code(), 0);
        assert_eq!(ConnectionState::Reconnecting.code(), 3);
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    #[test]
    fn test_merge_keeps_disjoint_slots() {
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut handlers = EventHandlers::new().on_message({
            let seen = Rc::clone(&seen);
            move |text| seen.borrow_mut().push(format!("message:{}", text))
        });
        handlers.merge(EventHandlers::new().on_close({
            let seen = Rc::clone(&seen);
            move || seen.borrow_mut().push("close".to_string())
        }));

        handlers.dispatch_message("hi");
        handlers.dispatch_close();
        handlers.dispatch_error("ignored without a handler");

        assert_eq!(*seen.borrow(), vec!["message:hi".to_string(), "close".to_string()]);
    }

    #[test]
    fn test_merge_overrides_filled_slot() {
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut handlers = EventHandlers::new().on_error({
            let seen = Rc::clone(&seen);
            move |e| seen.borrow_mut().push(format!("first:{}", e))
        });
        handlers.merge(EventHandlers::new().on_error({
            let seen = Rc::clone(&seen);
            move |e| seen.borrow_mut().push(format!("second:{}", e))
        }));

        handlers.dispatch_error("x");
        assert_eq!(*seen.borrow(), vec!["second:x".to_string()]);
    }

    #[test]
    fn test_debug_lists_filled_slots() {
        let handlers = EventHandlers::new().on_state_change(|_| {});
        let debug = format!("{:?}", handlers);
        assert!(debug.contains("on_state_change: true"));
        assert!(debug.contains("on_message: false"));
    }
}
