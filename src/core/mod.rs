pub mod client;

pub use crate::domain::model::{DataPayload, Envelope, JsonMap, Method, UploadFile};
pub use crate::domain::ports::{AuthProvider, Notifier, SessionHandler, TokenStore};
pub use crate::utils::error::Result;
