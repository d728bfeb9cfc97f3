// adminlink-api: reconnecting Socket.IO client for the console's admin namespace

pub mod auth;
pub mod error;
pub mod socket;
pub mod transport;

pub use auth::AuthPayload;
pub use error::Error;
pub use socket::{Outbound, ReconnectConfig, SocketEvent, SocketHandle, SocketOptions};
pub use transport::{TransportConfig, TransportKind};
