use crate::utils::error::Result;

/// 持久化 token 使用的鍵
pub const AUTHORIZATION_KEY: &str = "authorization";

/// 每次請求時提供目前的授權 token
pub trait AuthProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// 持久化的鍵值存儲
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// 將錯誤訊息顯示給使用者，呼叫後即忘
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// 伺服器回報 403 時被同步呼叫；延遲與重新載入由實作者決定
pub trait SessionHandler: Send + Sync {
    fn on_session_expired(&self);
}
