use std::time::Duration;
use crate::error::{SupervisorResult, SupervisorError};

// ============================================================================
// Configuration options
// ============================================================================

pub(crate) const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
pub(crate) const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30000);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);
pub(crate) const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(3000);
pub(crate) const DEFAULT_SPIN_WAIT_DURATION: Duration = Duration::from_millis(1);

/// Configuration of a [`ConnectionSupervisor`](crate::ConnectionSupervisor).
///
/// Starts from the defaults and every setter overrides a single field, so callers only name
/// what they want to change. The options are fixed once handed to the supervisor.
///
/// ```
/// use s9_ws_supervisor::SupervisorOptions;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), s9_ws_supervisor::SupervisorError> {
/// let options = SupervisorOptions::new()
///     .auto_reconnect(true)
///     .reconnect_interval(Duration::from_secs(1))?;
/// assert_eq!(options.get_heartbeat_interval(), Duration::from_secs(30));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub(crate) auto_reconnect: bool,
    pub(crate) reconnect_interval: Duration,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) close_timeout: Duration,
    pub(crate) debug_logging: bool,
    pub(crate) auth_headers: bool,
    pub(crate) spin_wait_duration: Option<Duration>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: false,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            debug_logging: false,
            auth_headers: false,
            spin_wait_duration: Some(DEFAULT_SPIN_WAIT_DURATION),
        }
    }
}

impl SupervisorOptions {
    /// Creates a new `SupervisorOptions` builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-establishes the connection after an unexpected close.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the fixed delay between an unexpected close and the next dial attempt.
    /// Must be greater than zero.
    pub fn reconnect_interval(mut self, interval: Duration) -> SupervisorResult<Self> {
        if interval.is_zero() {
            return Err(SupervisorError::InvalidConfiguration("Reconnect interval cannot be zero".to_string()));
        }
        self.reconnect_interval = interval;
        Ok(self)
    }

    /// Sets the period of the `"ping"` heartbeat sent while connected.
    /// Must be greater than zero.
    pub fn heartbeat_interval(mut self, interval: Duration) -> SupervisorResult<Self> {
        if interval.is_zero() {
            return Err(SupervisorError::InvalidConfiguration("Heartbeat interval cannot be zero".to_string()));
        }
        self.heartbeat_interval = interval;
        Ok(self)
    }

    /// Sets how long a dial may stay in `Connecting` before it is abandoned and treated as a
    /// failed connection. Must be greater than zero.
    pub fn connect_timeout(mut self, timeout: Duration) -> SupervisorResult<Self> {
        if timeout.is_zero() {
            return Err(SupervisorError::InvalidConfiguration("Connect timeout cannot be zero".to_string()));
        }
        self.connect_timeout = timeout;
        Ok(self)
    }

    /// Sets how long a manual close waits for the peer's close reply before the transport is
    /// dropped. Must be greater than zero.
    pub fn close_timeout(mut self, timeout: Duration) -> SupervisorResult<Self> {
        if timeout.is_zero() {
            return Err(SupervisorError::InvalidConfiguration("Close timeout cannot be zero".to_string()));
        }
        self.close_timeout = timeout;
        Ok(self)
    }

    /// Emits one debug line per state transition, send failure and connect failure.
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Also sends `token` and `deviceType` as handshake request headers.
    /// The query parameters are set either way.
    pub fn auth_headers(mut self, enabled: bool) -> Self {
        self.auth_headers = enabled;
        self
    }

    /// Sets the duration to wait between iterations of [`run`](crate::ConnectionSupervisor::run).
    /// Must be None or greater than zero
    /// This prevents the event loop from consuming 100% CPU.
    pub fn spin_wait_duration(mut self, duration: Option<Duration>) -> SupervisorResult<Self> {
        if let Some(duration) = duration {
            if duration.is_zero() {
                return Err(SupervisorError::InvalidConfiguration("Spin wait duration cannot be zero".to_string()));
            }
        }
        self.spin_wait_duration = duration;
        Ok(self)
    }

    pub fn get_auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn get_reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    pub fn get_heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn get_connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn get_close_timeout(&self) -> Duration {
        self.close_timeout
    }

    pub fn get_debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub fn get_auth_headers(&self) -> bool {
        self.auth_headers
    }

    pub fn get_spin_wait_duration(&self) -> Option<Duration> {
        self.spin_wait_duration
    }
}

/// Socket options of the tungstenite transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub(crate) spin_wait_duration: Option<Duration>,
    pub(crate) nodelay: Option<bool>,
    pub(crate) ttl: Option<u32>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            spin_wait_duration: Some(DEFAULT_SPIN_WAIT_DURATION),
            nodelay: None,
            ttl: None,
        }
    }
}

impl TransportOptions {
    /// Creates a new `TransportOptions` builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duration to wait in the socket loop after command processing and socket reads.
    /// Must be None or greater than zero
    pub fn spin_wait_duration(mut self, duration: Option<Duration>) -> SupervisorResult<Self> {
        if let Some(duration) = duration {
            if duration.is_zero() {
                return Err(SupervisorError::InvalidConfiguration("Spin wait duration cannot be zero".to_string()));
            }
        }
        self.spin_wait_duration = duration;
        Ok(self)
    }

    /// Enables or disables the `TCP_NODELAY` option for messages to be sent.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = Some(nodelay);
        self
    }

    /// Sets the TTL (Time To Live, # of hops) for the socket.
    /// None for the system default
    pub fn ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = ttl;
        self
    }
}
