//! Remote API: wire types, the [`RemoteApi`] seam and its HTTP implementation

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fieldcap_forms::{FieldValues, FormTemplate, filter_active};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Result, RuntimeError};

pub const DEFAULT_BASE_URL: &str = "https://fairworks.vercel.app";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the backend lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.endpoint("/api/login")
    }

    pub fn forms_url(&self) -> String {
        self.endpoint("/api/forms")
    }

    pub fn upload_photo_url(&self) -> String {
        self.endpoint("/api/uploadPhoto")
    }

    /// Upload records: POST to record a batch, GET for history
    pub fn uploads_url(&self) -> String {
        self.endpoint("/api/uploads")
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub company_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One composite sent to the photo endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    pub filename: String,
    /// `data:image/jpeg;base64,...`
    pub base64_image: String,
    /// `data:image/jpeg;base64,...`
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    pub image_count: usize,
    pub field_data: FieldValues,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Single-image flow: the photo endpoint stores and records in one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleUploadRequest {
    pub form_id: String,
    pub form_name: String,
    pub total_image_count: usize,
    pub representative_data: FieldValues,
    pub images: Vec<PhotoUpload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedItem {
    pub filename: String,
    pub server_response: PhotoUploadResponse,
}

/// Aggregate record of a batch upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecordRequest {
    pub form_name: String,
    pub form_id: String,
    pub data: FieldValues,
    pub image_urls: Vec<String>,
    pub image_count: usize,
    pub thumbnails: Vec<String>,
    pub uploaded_items: Vec<UploadedItem>,
}

/// One past upload as listed by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub form_name: String,
    #[serde(default, alias = "fieldData")]
    pub data: FieldValues,
    #[serde(default)]
    pub thumbnails: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// `None` when the record has no readable timestamp
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|time| time.with_timezone(&Utc)))
}

#[derive(Debug, Deserialize)]
struct FormsResponse {
    #[serde(default)]
    forms: Vec<FormTemplate>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    uploads: Vec<HistoryEntry>,
}

// =============================================================================
// Remote API
// =============================================================================

/// Backend operations the client depends on.
///
/// Implementations return `Err` for transport failures and for responses
/// that do not report success.
pub trait RemoteApi: Send + Sync {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = Result<LoginResponse>> + Send;

    /// The full catalog, inactive templates included
    fn fetch_forms(&self, token: &str) -> impl Future<Output = Result<Vec<FormTemplate>>> + Send;

    fn upload_photo(
        &self,
        token: &str,
        photo: &PhotoUpload,
    ) -> impl Future<Output = Result<PhotoUploadResponse>> + Send;

    fn upload_single(
        &self,
        token: &str,
        request: &SingleUploadRequest,
    ) -> impl Future<Output = Result<PhotoUploadResponse>> + Send;

    fn record_upload(
        &self,
        token: &str,
        record: &UploadRecordRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    fn fetch_history(&self, token: &str) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send;
}

/// Catalog without inactive templates
pub async fn fetch_active_forms<A: RemoteApi>(api: &A, token: &str) -> Result<Vec<FormTemplate>> {
    Ok(filter_active(api.fetch_forms(token).await?))
}

/// [`RemoteApi`] over HTTPS with JSON bodies and bearer tokens
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let body: Value = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => return Err(RuntimeError::Rejected(format!("HTTP {status}"))),
        };

        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !success {
            let message = ["error", "message"]
                .iter()
                .find_map(|key| body.get(key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(RuntimeError::Rejected(message));
        }

        Ok(serde_json::from_value(body)?)
    }
}

impl RemoteApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        log::debug!("POST {}", self.config.login_url());
        self.send(self.client.post(self.config.login_url()).json(request))
            .await
    }

    async fn fetch_forms(&self, token: &str) -> Result<Vec<FormTemplate>> {
        log::debug!("GET {}", self.config.forms_url());
        let response: FormsResponse = self
            .send(self.client.get(self.config.forms_url()).bearer_auth(token))
            .await?;
        Ok(response.forms)
    }

    async fn upload_photo(&self, token: &str, photo: &PhotoUpload) -> Result<PhotoUploadResponse> {
        log::debug!("POST {} ({})", self.config.upload_photo_url(), photo.filename);
        self.send(
            self.client
                .post(self.config.upload_photo_url())
                .bearer_auth(token)
                .json(photo),
        )
        .await
    }

    async fn upload_single(
        &self,
        token: &str,
        request: &SingleUploadRequest,
    ) -> Result<PhotoUploadResponse> {
        log::debug!("POST {} (single)", self.config.upload_photo_url());
        self.send(
            self.client
                .post(self.config.upload_photo_url())
                .bearer_auth(token)
                .json(request),
        )
        .await
    }

    async fn record_upload(&self, token: &str, record: &UploadRecordRequest) -> Result<()> {
        log::debug!(
            "POST {} ({} images)",
            self.config.uploads_url(),
            record.image_urls.len()
        );
        let _: Value = self
            .send(
                self.client
                    .post(self.config.uploads_url())
                    .bearer_auth(token)
                    .json(record),
            )
            .await?;
        Ok(())
    }

    async fn fetch_history(&self, token: &str) -> Result<Vec<HistoryEntry>> {
        log::debug!("GET {}", self.config.uploads_url());
        let response: HistoryResponse = self
            .send(self.client.get(self.config.uploads_url()).bearer_auth(token))
            .await?;
        Ok(response.uploads)
    }
}
