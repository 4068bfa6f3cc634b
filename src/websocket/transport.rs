use url::Url;
use crate::error::SupervisorResult;
use super::types::TransportEvent;

/// Everything a [`Connector`] needs to open one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub target: Url,
    pub headers: Vec<(String, String)>,
}

/// An open bidirectional text channel owned by the supervisor.
///
/// Lifecycle notifications are pulled with [`try_recv_event`](Self::try_recv_event) on the
/// supervisor's own thread, in the order the transport produced them.
pub trait Transport {
    fn send_text(&mut self, text: &str) -> SupervisorResult<()>;

    /// Requests the channel to close. Completion is reported by a later
    /// [`TransportEvent::Closed`].
    fn close(&mut self) -> SupervisorResult<()>;

    /// Returns the next pending event without blocking.
    fn try_recv_event(&mut self) -> Option<TransportEvent>;
}

/// Opens transports. An `Err` is a synchronous construction failure; handshake failures are
/// reported asynchronously through the returned transport's events.
pub trait Connector {
    type Transport: Transport;

    fn open(&mut self, request: &DialRequest) -> SupervisorResult<Self::Transport>;
}
