//! Error types for supervised WebSocket operations.
//!
//! The public surface of [`ConnectionSupervisor`](crate::ConnectionSupervisor) never returns
//! these errors: connect, send and close report failure as `false` and asynchronous transport
//! faults reach the caller through the `on_error` handler. [`SupervisorError`] is what the
//! building blocks underneath return: dial target construction, configuration validation
//! and the [`Transport`](crate::Transport) / [`Connector`](crate::Connector) seam.
//!
//! # Examples
//!
//! ```
//! use s9_ws_supervisor::{Endpoint, SupervisorError};
//!
//! match Endpoint::new("not a url", "token", None).dial_target() {
//!     Ok(target) => println!("dialing {}", target),
//!     Err(SupervisorError::InvalidUri(msg)) => eprintln!("Invalid URI: {}", msg),
//!     Err(e) => eprintln!("Unexpected: {}", e),
//! }
//! ```

use std::fmt;
use tungstenite::Error as TungsteniteError;

/// Error type for all supervisor building blocks.
///
/// # Error Categories
///
/// - **Dial errors**: [`InvalidUri`](Self::InvalidUri)
/// - **Connection errors**: [`ConnectionClosed`](Self::ConnectionClosed), [`ChannelClosed`](Self::ChannelClosed)
/// - **Configuration errors**: [`InvalidConfiguration`](Self::InvalidConfiguration)
/// - **Runtime errors**: [`Io`](Self::Io), [`Tungstenite`](Self::Tungstenite)
#[derive(Debug)]
pub enum SupervisorError {
    /// The URL could not be parsed or turned into a WebSocket request target.
    InvalidUri(String),

    /// The connection was closed by the server or due to an error.
    ///
    /// The optional `String` contains the close reason if one was provided.
    ConnectionClosed(Option<String>),

    /// The worker thread owning the socket is gone, so commands can no longer reach it.
    ChannelClosed,

    /// Invalid configuration was provided, such as a zero heartbeat interval.
    ///
    /// # Example
    /// ```
    /// use s9_ws_supervisor::SupervisorOptions;
    /// use std::time::Duration;
    ///
    /// let result = SupervisorOptions::new().heartbeat_interval(Duration::ZERO);
    /// assert!(result.is_err());
    /// ```
    InvalidConfiguration(String),

    /// An I/O operation failed while configuring or using the socket.
    Io(std::io::Error),

    /// An error from the underlying tungstenite WebSocket library.
    Tungstenite(TungsteniteError),
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorError::InvalidUri(uri) => write!(f, "Invalid URI: {}", uri),
            SupervisorError::ConnectionClosed(reason) => {
                match reason {
                    Some(r) => write!(f, "Connection closed: {}", r),
                    None => write!(f, "Connection closed without reason"),
                }
            }
            SupervisorError::ChannelClosed => write!(f, "Transport channel closed"),
            SupervisorError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            SupervisorError::Io(err) => write!(f, "IO error: {}", err),
            SupervisorError::Tungstenite(err) => write!(f, "WebSocket error: {}", err),
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SupervisorError::Io(err) => Some(err),
            SupervisorError::Tungstenite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TungsteniteError> for SupervisorError {
    fn from(err: TungsteniteError) -> Self {
        match err {
            TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed => {
                SupervisorError::ConnectionClosed(Some(err.to_string()))
            }
            TungsteniteError::Io(io_err) => SupervisorError::Io(io_err),
            TungsteniteError::Url(url_err) => SupervisorError::InvalidUri(url_err.to_string()),
            _ => SupervisorError::Tungstenite(err),
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    fn from(err: std::io::Error) -> Self {
        SupervisorError::Io(err)
    }
}

impl From<url::ParseError> for SupervisorError {
    fn from(err: url::ParseError) -> Self {
        SupervisorError::InvalidUri(err.to_string())
    }
}

/// Convenience type alias for `Result<T, SupervisorError>`.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
