// Adapters layer: concrete implementations of the client ports (token, storage, notification, session).

pub mod auth;
pub mod notify;
pub mod session;
pub mod storage;
