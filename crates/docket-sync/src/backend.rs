//! REST backend reader.
//!
//! The backend API has gone through several schema generations and the
//! records it returns still carry the old field names depending on which
//! ingestion path wrote them. [`ApiNoticeRecord`] absorbs every known
//! spelling through explicit serde aliases, so the normalization into
//! [`CanonicalNotice`] happens in one declared place instead of ad-hoc
//! fallback chains scattered through callers.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use docket_core::{CanonicalNotice, NoticeStatus, Provenance};

use crate::config::SyncConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(u16),
}

/// Read access to the REST backend.
#[async_trait]
pub trait NoticeBackend: Send + Sync {
    /// All notices served by `server_address`, in the backend's raw shape.
    async fn list_notices(&self, server_address: &str)
        -> Result<Vec<ApiNoticeRecord>, BackendError>;
}

/// An id field that the backend serializes as either a JSON number or a
/// string, depending on schema generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
    Number(u64),
    Text(String),
}

impl ApiId {
    fn into_string(self) -> String {
        match self {
            ApiId::Number(n) => n.to_string(),
            ApiId::Text(s) => s,
        }
    }
}

/// One notice as the backend returns it, across all schema generations.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiNoticeRecord {
    #[serde(default, alias = "noticeId", alias = "id")]
    pub notice_id: Option<ApiId>,
    #[serde(default, alias = "alertId", alias = "alert_token_id")]
    pub alert_id: Option<ApiId>,
    #[serde(default, alias = "documentId", alias = "document_token_id")]
    pub document_id: Option<ApiId>,
    #[serde(default, alias = "recipientAddress")]
    pub recipient: String,
    #[serde(default, alias = "serverAddress", alias = "server")]
    pub server_address: String,
    #[serde(
        default,
        alias = "timestamp",
        alias = "servedAt",
        alias = "created_at"
    )]
    pub served_at: i64,
    #[serde(default, alias = "caseNumber")]
    pub case_number: String,
    #[serde(default, alias = "noticeType")]
    pub notice_type: String,
    #[serde(default, alias = "is_acknowledged", alias = "accepted")]
    pub acknowledged: bool,
}

impl ApiNoticeRecord {
    /// Normalize into the canonical shape.
    ///
    /// Returns `None` when the record carries no usable id at all; such
    /// records cannot participate in reconciliation and are dropped. An
    /// empty id string counts as absent, it would corrupt the
    /// reconciliation key.
    pub fn to_canonical(self) -> Option<CanonicalNotice> {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        let alert_id = self.alert_id.map(ApiId::into_string).and_then(non_empty);
        let document_id = self.document_id.map(ApiId::into_string).and_then(non_empty);
        let notice_id = self
            .notice_id
            .map(ApiId::into_string)
            .and_then(non_empty)
            .or_else(|| alert_id.clone())
            .or_else(|| document_id.clone())?;

        Some(CanonicalNotice {
            notice_id,
            alert_id,
            document_id,
            recipient: self.recipient,
            server_address: self.server_address,
            timestamp_ms: self.served_at,
            case_number: self.case_number,
            notice_type: self.notice_type,
            acknowledged: self.acknowledged,
            status: NoticeStatus::from_acknowledged(self.acknowledged),
            provenance: Provenance::Backend,
            last_verified_ms: None,
            verified: false,
        })
    }
}

/// The backend wraps its list in `{"notices": [...]}` on newer deployments
/// and returns a bare array on older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiNoticeResponse {
    Wrapped { notices: Vec<ApiNoticeRecord> },
    Bare(Vec<ApiNoticeRecord>),
}

impl ApiNoticeResponse {
    fn into_records(self) -> Vec<ApiNoticeRecord> {
        match self {
            ApiNoticeResponse::Wrapped { notices } => notices,
            ApiNoticeResponse::Bare(records) => records,
        }
    }
}

/// reqwest-backed [`NoticeBackend`].
pub struct HttpNoticeBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNoticeBackend {
    pub fn new(base_url: impl Into<String>, config: &SyncConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl NoticeBackend for HttpNoticeBackend {
    async fn list_notices(
        &self,
        server_address: &str,
    ) -> Result<Vec<ApiNoticeRecord>, BackendError> {
        let url = format!("{}/api/notices", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("server", server_address)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let body: ApiNoticeResponse = response.json().await?;
        Ok(body.into_records())
    }
}

/// Fetch and normalize one server's notices from the backend.
///
/// Any failure (transport, HTTP status, decode) is logged and collapsed to
/// `None`; the caller falls back to the blockchain path. Backend failures
/// are routine and never fatal.
pub async fn fetch_from_backend(
    backend: &dyn NoticeBackend,
    server_address: &str,
) -> Option<Vec<CanonicalNotice>> {
    match backend.list_notices(server_address).await {
        Ok(records) => Some(
            records
                .into_iter()
                .filter_map(ApiNoticeRecord::to_canonical)
                .collect(),
        ),
        Err(err) => {
            warn!(server = server_address, error = %err, "backend fetch failed, falling back");
            None
        }
    }
}
