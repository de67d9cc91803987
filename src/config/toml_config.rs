use crate::adapters::auth::{StaticToken, StoredToken};
use crate::adapters::notify::TracingNotifier;
use crate::adapters::session::{DelayedReload, DEFAULT_RELOAD_DELAY};
use crate::adapters::storage::{FileTokenStore, MemoryTokenStore};
use crate::core::client::ApiClientBuilder;
use crate::domain::ports::TokenStore;
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientSection,
    pub auth: Option<AuthConfig>,
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSection {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 固定 token，優先於 token_file
    pub token: Option<String>,
    pub token_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub reload_delay_ms: Option<u64>,
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClientError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ClientError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ClientError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.client.base_url.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|a| a.token.as_deref())
    }

    pub fn token_file(&self) -> Option<PathBuf> {
        self.auth
            .as_ref()
            .and_then(|a| a.token_file.as_ref())
            .map(PathBuf::from)
    }

    pub fn reload_delay(&self) -> Duration {
        self.session
            .as_ref()
            .and_then(|s| s.reload_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RELOAD_DELAY)
    }

    /// 依配置建立 token 存儲：有 token_file 用檔案，否則放在記憶體
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match self.token_file() {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        }
    }

    /// login/logout 需要跨程序保存，只接受檔案存儲
    pub fn persistent_token_store(&self) -> Result<FileTokenStore> {
        self.token_file()
            .map(FileTokenStore::new)
            .ok_or_else(|| ClientError::ConfigValidationError {
                field: "auth.token_file".to_string(),
                message: "a token file is required to store or remove the authorization"
                    .to_string(),
            })
    }

    /// 會話失效後經過 `reload_delay()` 呼叫 `reload`
    pub fn session_handler<F>(&self, reload: F) -> DelayedReload
    where
        F: Fn() + Send + Sync + 'static,
    {
        DelayedReload::new(reload).with_delay(self.reload_delay())
    }

    /// 依配置組裝客戶端，403 時延遲呼叫 `reload`
    pub fn client_builder<F>(&self, reload: F) -> Result<ApiClientBuilder>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let store = self.token_store();

        let mut builder = crate::ApiClient::builder()
            .token_store(store.clone())
            .notifier(Arc::new(TracingNotifier))
            .session_handler(Arc::new(self.session_handler(reload)));

        builder = match self.token() {
            Some(token) => builder.auth_provider(Arc::new(StaticToken::new(token))),
            None => builder.auth_provider(Arc::new(StoredToken::new(store))),
        };

        if let Some(base_url) = self.base_url() {
            builder = builder.base_url(base_url);
        }

        if let Some(user_agent) = &self.client.user_agent {
            let http = reqwest::Client::builder().user_agent(user_agent).build()?;
            builder = builder.http_client(http);
        }

        Ok(builder)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        if let Some(base_url) = self.base_url() {
            crate::utils::validation::validate_url("client.base_url", base_url)?;
        }

        if let Some(auth) = &self.auth {
            if let Some(token) = &auth.token {
                crate::utils::validation::validate_non_empty_string("auth.token", token)?;
            }
            if let Some(path) = &auth.token_file {
                crate::utils::validation::validate_path("auth.token_file", path)?;
            }
        }

        if let Some(delay) = self.session.as_ref().and_then(|s| s.reload_delay_ms) {
            crate::utils::validation::validate_range("session.reload_delay_ms", delay, 0, 60_000)?;
        }

        Ok(())
    }
}
