// Public API modules
pub mod types;
pub mod options;
pub mod endpoint;
pub mod timer;
pub mod transport;

// Internal modules
mod shared;

// Supervisor and transport implementations
mod supervisor;
mod tungstenite_transport;

// Re-export public types
pub use types::{ConnectionState, ControlMessage, EventHandlers, TransportEvent};
pub use options::{SupervisorOptions, TransportOptions};
pub use endpoint::{Endpoint, DEFAULT_DEVICE_TYPE};
pub use timer::{Clock, ManualClock, SystemClock, TimerHandle};
pub use transport::{Connector, DialRequest, Transport};

// Re-export supervisor types
pub use supervisor::{ConnectionSupervisor, HEARTBEAT_PAYLOAD};
pub use tungstenite_transport::{TungsteniteConnector, TungsteniteTransport};
