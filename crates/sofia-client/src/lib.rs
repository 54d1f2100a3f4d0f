//! Sofia session runtime.
//!
//! This crate runs the sans-IO session controller against real collaborators:
//! - Tokio for the async runtime
//! - reqwest for the connection-details and recording endpoints
//! - System time and cryptographic RNG
//!
//! ## Architecture
//!
//! ```text
//! sofia-client
//!   ├─ SystemEnv            (production Environment impl)
//!   ├─ SessionRuntime       (executes controller actions)
//!   ├─ Transport            (media engine seam, event subscription)
//!   ├─ ExternalKeyProvider  (passphrase-derived frame key)
//!   ├─ HttpResolver         (connection details over HTTP)
//!   ├─ RecordingControl     (server-side recording toggle)
//!   └─ RoomEntry            (room links and generated rooms)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entry;
mod error;
pub mod key_provider;
pub mod recording;
pub mod resolver;
pub mod runtime;
mod system_env;
pub mod transport;

pub use config::ClientConfig;
pub use entry::{ROOM_ID_RANDOM_BYTES, RoomEntry, generate_room_id};
pub use error::{
    ConfigError, EntryError, KeyProviderError, RecordingError, ResolveError, RuntimeError,
    TransportError,
};
pub use key_provider::{ExternalKeyProvider, KeyProvider};
pub use recording::{RecordingAction, RecordingControl};
pub use resolver::{ConnectionDetailResolver, HttpResolver};
pub use runtime::{Collaborators, SessionHandle, SessionRuntime, SessionSignal};
pub use system_env::SystemEnv;
pub use transport::{EventSubscription, Transport};
