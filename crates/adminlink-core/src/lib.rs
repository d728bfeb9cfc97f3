// adminlink-core: State mirror between adminlink-api and consumers (CLI/embedders).

pub mod command;
pub mod config;
pub mod controller;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod model;
pub mod notice;
pub mod query;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, RedirectRequest};
pub use config::ControllerConfig;
pub use controller::{ConnectionState, Controller};
pub use credential::{
    AuthState, CredentialBundle, CredentialStore, Identity, MemoryCredentialStore, Refusal,
};
pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use event::{EventName, InitSnapshot, ServerEvent};
pub use notice::Notice;
pub use store::{DataStore, Mirror, reduce};
pub use stream::MirrorStream;

pub use model::{Caller, Session, Settings};

// Transport selection is part of the runtime config surface.
pub use adminlink_api::TransportKind;
