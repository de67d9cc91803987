pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::auth::{SharedToken, StaticToken, StoredToken};
pub use adapters::notify::TracingNotifier;
pub use adapters::session::DelayedReload;
pub use adapters::storage::{FileTokenStore, MemoryTokenStore};
pub use config::ClientConfig;
pub use crate::core::client::{ApiClient, ApiClientBuilder};
pub use domain::model::{DataPayload, Envelope, JsonMap, UploadFile};
pub use domain::ports::{AuthProvider, Notifier, SessionHandler, TokenStore, AUTHORIZATION_KEY};
pub use utils::error::{ClientError, Result};
