use crate::adapters::auth::StaticToken;
use crate::adapters::notify::TracingNotifier;
use crate::adapters::storage::MemoryTokenStore;
use crate::domain::model::{is_success_code, Envelope, EnvelopeHead, Method, UploadFile};
use crate::domain::ports::{AuthProvider, Notifier, SessionHandler, TokenStore, AUTHORIZATION_KEY};
use crate::utils::error::{ClientError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// 伺服器以此 code 表示授權失效
pub const SESSION_EXPIRED_CODE: i64 = 403;

/// JSON 信封 API 的 HTTP 客戶端
///
/// 每個請求都會：
/// - 在 `AuthProvider` 提供 token 時加上 `Authorization` 標頭
/// - 將回應解析為 [`Envelope`]，`code` 在 [200, 300) 之外即視為失敗
/// - 失敗時通知 `Notifier`；`code == 403` 時另外清除存儲中的 token 並呼叫 `SessionHandler`
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<Url>,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionHandler>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<Envelope<T>> {
        self.fetch::<(), T>(url, Method::Get, None).await
    }

    pub async fn post<B, T>(&self, url: &str, body: &B) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(url, Method::Post, Some(body)).await
    }

    pub async fn put<B, T>(&self, url: &str, body: &B) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(url, Method::Put, Some(body)).await
    }

    pub async fn delete<B, T>(&self, url: &str, body: &B) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch(url, Method::Delete, Some(body)).await
    }

    /// 以 multipart 表單 POST：`file` 欄位（若有）加上每個文字欄位
    pub async fn upload<T, I, K, V>(
        &self,
        url: &str,
        file: Option<UploadFile>,
        fields: I,
    ) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let url = self.resolve(url)?;
        let form = build_form(file, fields)?;

        tracing::debug!("📡 Uploading multipart form to: {}", url);

        // Content-Type 與 boundary 交給 reqwest 產生
        let request = self.authorize(self.client.post(url));
        let response = request.multipart(form).send().await?;
        self.handle_response(response).await
    }

    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        url: &str,
        file: UploadFile,
    ) -> Result<Envelope<T>> {
        self.upload(url, Some(file), Vec::<(String, String)>::new())
            .await
    }

    async fn fetch<B, T>(&self, url: &str, method: Method, body: Option<&B>) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(url)?;
        tracing::debug!("📡 {} {}", method.as_str(), url);

        let mut request = self.authorize(self.client.request(method.into(), url));

        if let Some(body) = body {
            // null 不送出 body
            let value = serde_json::to_value(body)?;
            if !value.is_null() {
                request = request.json(&value);
            }
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url)?,
            None => Url::parse(url)?,
        };
        Ok(resolved)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.token().filter(|token| !token.is_empty()) {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<Envelope<T>> {
        tracing::debug!("📡 Response status: {}", response.status());

        // 只看信封的 code，不看 HTTP 狀態碼
        let bytes = response.bytes().await?;
        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        self.handle_envelope(raw)
    }

    fn handle_envelope<T: DeserializeOwned>(&self, raw: serde_json::Value) -> Result<Envelope<T>> {
        let head = EnvelopeHead::deserialize(&raw)?;

        if is_success_code(head.code) {
            return Ok(serde_json::from_value(raw)?);
        }

        tracing::warn!("⚠️ API returned code {}: {}", head.code, head.message);
        self.notifier.error(&head.message);

        if head.code == SESSION_EXPIRED_CODE {
            self.invalidate_session();
        }

        Err(ClientError::Api {
            code: head.code,
            message: head.message,
        })
    }

    fn invalidate_session(&self) {
        if let Err(e) = self.store.remove(AUTHORIZATION_KEY) {
            tracing::warn!("⚠️ Failed to clear stored authorization: {}", e);
        }
        tracing::info!("🔒 Session expired, stored authorization cleared");
        self.session.on_session_expired();
    }
}

fn build_form<I, K, V>(file: Option<UploadFile>, fields: I) -> Result<Form>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut form = Form::new();

    if let Some(file) = file {
        let mut part = Part::bytes(file.content).file_name(file.file_name);
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type)?;
        }
        form = form.part("file", part);
    }

    for (key, value) in fields {
        form = form.text(key.into(), value.into());
    }

    Ok(form)
}

pub struct ApiClientBuilder {
    client: Option<Client>,
    base_url: Option<String>,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionHandler>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: None,
            auth: Arc::new(StaticToken::none()),
            store: Arc::new(MemoryTokenStore::new()),
            notifier: Arc::new(TracingNotifier),
            session: Arc::new(|| {}),
        }
    }
}

impl ApiClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = store;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn session_handler(mut self, session: Arc<dyn SessionHandler>) -> Self {
        self.session = session;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        Ok(ApiClient {
            client: self.client.unwrap_or_default(),
            base_url,
            auth: self.auth,
            store: self.store,
            notifier: self.notifier,
            session: self.session,
        })
    }
}
