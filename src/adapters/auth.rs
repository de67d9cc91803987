use crate::domain::ports::{AuthProvider, TokenStore, AUTHORIZATION_KEY};
use std::sync::{Arc, RwLock};

/// 固定的 token（或沒有 token）
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl AuthProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// 可由登入流程在執行期間更新的 token
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl AuthProvider for SharedToken {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// 每次請求時從存儲讀取 `authorization`，403 清除後下一個請求即不再帶 token
#[derive(Clone)]
pub struct StoredToken {
    store: Arc<dyn TokenStore>,
}

impl StoredToken {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

impl AuthProvider for StoredToken {
    fn token(&self) -> Option<String> {
        match self.store.get(AUTHORIZATION_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read stored authorization: {}", e);
                None
            }
        }
    }
}
