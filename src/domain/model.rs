use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// 預設的 payload：信封中除 `code`/`message` 以外的所有欄位
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// 伺服器回應的統一信封 `{ code, message, ...payload }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Envelope<T = JsonMap> {
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        is_success_code(self.code)
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// 只讀取 `code` 與 `message`，payload 型別不符時仍能判斷失敗原因
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnvelopeHead {
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

/// `message` 可能缺少或為 null，兩者都視為空字串
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{ code, message, data }` 形式的 payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct DataPayload<T> {
    #[serde(default)]
    pub data: Option<T>,
}

pub fn is_success_code(code: i64) -> bool {
    (200..300).contains(&code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// 上傳用的檔案內容
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub async fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file")
            .to_string();
        Ok(Self::new(file_name, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_keeps_extra_fields() {
        let envelope: Envelope =
            serde_json::from_value(json!({"code": 200, "message": "ok", "id": 42})).unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.payload.get("id"), Some(&json!(42)));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"code": 200, "message": "ok", "id": 42})
        );
    }

    #[test]
    fn test_missing_message_defaults_to_empty() {
        let head: EnvelopeHead = serde_json::from_value(json!({"code": 500})).unwrap();
        assert_eq!(head.code, 500);
        assert_eq!(head.message, "");
    }

    #[test]
    fn test_null_message_is_empty() {
        let head: EnvelopeHead =
            serde_json::from_value(json!({"code": 500, "message": null})).unwrap();
        assert_eq!(head.message, "");

        let envelope: Envelope =
            serde_json::from_value(json!({"code": 200, "message": null, "id": 1})).unwrap();
        assert_eq!(envelope.message, "");
        assert_eq!(envelope.payload.get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_data_payload() {
        let envelope: Envelope<DataPayload<String>> = serde_json::from_value(
            json!({"code": 200, "message": "Success", "data": "token-123"}),
        )
        .unwrap();
        assert_eq!(envelope.into_payload().data.as_deref(), Some("token-123"));

        let empty: Envelope<DataPayload<String>> =
            serde_json::from_value(json!({"code": 200, "message": "Success"})).unwrap();
        assert!(empty.payload.data.is_none());
    }

    #[test]
    fn test_success_code_range() {
        assert!(is_success_code(200));
        assert!(is_success_code(299));
        assert!(!is_success_code(300));
        assert!(!is_success_code(199));
        assert!(!is_success_code(403));
    }
}
