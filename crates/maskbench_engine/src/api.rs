use std::io;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use maskbench_core::{
    Fault, FrameRef, JobId, LabelsMode, MaskRef, PropagationStats, RemoteStatus, StatusReport,
};
use serde::Deserialize;
use thiserror::Error;

/// Connection settings for the annotation service.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applied to the small control calls: job creation, status, listings.
    pub request_timeout: Duration,
    /// Applied to uploads and the export download, which move real payloads.
    pub transfer_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(600),
        }
    }
}

/// Errors from the annotation service client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed: connect, TLS, timeout, or a broken stream.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// A 2xx response whose body does not match the service contract.
    #[error("decode error: {0}")]
    Decode(String),
    /// The service answered non-2xx.
    #[error("service error (status {status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Service { status: u16, detail: Option<String> },
}

impl ApiError {
    /// Reads a failed response into a `Service` error, extracting the
    /// `{"detail": ...}` diagnostic body the service attaches.
    async fn from_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let detail = match response.text().await {
            Ok(body) => parse_detail(&body),
            Err(_) => None,
        };
        ApiError::Service { status, detail }
    }

    /// Collapses onto the client-side fault taxonomy.
    pub fn into_fault(self) -> Fault {
        match self {
            ApiError::Transport(err) => Fault::Transport(err.to_string()),
            ApiError::Decode(message) => Fault::Transport(message),
            ApiError::Service { detail, .. } => Fault::Service { detail },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}

fn parse_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|parsed| parsed.detail)
}

/// A local artifact read into memory, ready for a multipart upload.
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    pub name: String,
    pub bytes: Bytes,
}

impl ArtifactFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads `path` into memory, keeping the file name for the upload form.
    pub async fn read(path: &Path) -> io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("artifact")
            .to_string();
        Ok(Self {
            name,
            bytes: bytes.into(),
        })
    }
}

/// Remote operations offered by the annotation service.
#[async_trait::async_trait]
pub trait AnnotationApi: Send + Sync {
    async fn create_job(&self) -> Result<JobId, ApiError>;
    /// Returns the frame count the extraction produced, when reported.
    async fn upload_video(&self, job: &JobId, file: ArtifactFile)
        -> Result<Option<u32>, ApiError>;
    async fn upload_frame_archive(
        &self,
        job: &JobId,
        file: ArtifactFile,
    ) -> Result<Option<u32>, ApiError>;
    async fn upload_label_import(&self, job: &JobId, file: ArtifactFile) -> Result<(), ApiError>;
    async fn start_propagation(&self, job: &JobId, mode: LabelsMode) -> Result<(), ApiError>;
    async fn fetch_status(&self, job: &JobId) -> Result<StatusReport, ApiError>;
    async fn list_frames(&self, job: &JobId) -> Result<Vec<FrameRef>, ApiError>;
    async fn list_masks(&self, job: &JobId) -> Result<Vec<MaskRef>, ApiError>;
    async fn download_export(&self, job: &JobId) -> Result<Bytes, ApiError>;
}

#[derive(Debug, Deserialize)]
struct NewJobDoc {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadDoc {
    #[serde(default)]
    frame_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StatusDoc {
    status: String,
    #[serde(default)]
    progress: u32,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    meta: Option<MetaDoc>,
}

#[derive(Debug, Deserialize)]
struct MetaDoc {
    #[serde(default)]
    frame_count: Option<u32>,
    #[serde(default)]
    objects: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FramesDoc {
    #[serde(default)]
    frames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MasksDoc {
    #[serde(default)]
    masks: Vec<String>,
}

fn parse_status(doc: StatusDoc) -> Result<StatusReport, ApiError> {
    let status = RemoteStatus::parse(&doc.status)
        .ok_or_else(|| ApiError::Decode(format!("unrecognized status value '{}'", doc.status)))?;
    let stats = doc.meta.and_then(|meta| {
        Some(PropagationStats {
            frame_count: meta.frame_count?,
            objects: meta.objects?,
        })
    });
    Ok(StatusReport {
        status,
        progress: doc.progress,
        message: doc.message,
        stats,
    })
}

/// `reqwest`-backed client for the annotation service.
#[derive(Debug, Clone)]
pub struct HttpAnnotationApi {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl HttpAnnotationApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response).await)
        }
    }

    fn upload_form(job: &JobId, file: ArtifactFile) -> reqwest::multipart::Form {
        let part = reqwest::multipart::Part::stream(reqwest::Body::from(file.bytes))
            .file_name(file.name);
        reqwest::multipart::Form::new()
            .text("job_id", job.as_str().to_string())
            .part("file", part)
    }

    async fn upload(
        &self,
        path: &str,
        job: &JobId,
        file: ArtifactFile,
    ) -> Result<Option<u32>, ApiError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .multipart(Self::upload_form(job, file))
            .timeout(self.settings.transfer_timeout)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let doc: UploadDoc = response.json().await?;
        Ok(doc.frame_count)
    }
}

#[async_trait::async_trait]
impl AnnotationApi for HttpAnnotationApi {
    async fn create_job(&self) -> Result<JobId, ApiError> {
        let response = self
            .client
            .post(self.endpoint("/api/new_job"))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let doc: NewJobDoc = response.json().await?;
        Ok(JobId::new(doc.job_id))
    }

    async fn upload_video(
        &self,
        job: &JobId,
        file: ArtifactFile,
    ) -> Result<Option<u32>, ApiError> {
        self.upload("/api/upload_video", job, file).await
    }

    async fn upload_frame_archive(
        &self,
        job: &JobId,
        file: ArtifactFile,
    ) -> Result<Option<u32>, ApiError> {
        self.upload("/api/upload_frames_zip", job, file).await
    }

    async fn upload_label_import(&self, job: &JobId, file: ArtifactFile) -> Result<(), ApiError> {
        self.upload("/api/upload_labelstudio", job, file)
            .await
            .map(|_| ())
    }

    async fn start_propagation(&self, job: &JobId, mode: LabelsMode) -> Result<(), ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("job_id", job.as_str().to_string())
            .text("labels_mode", mode.as_str());
        let response = self
            .client
            .post(self.endpoint("/api/propagate"))
            .multipart(form)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_status(&self, job: &JobId) -> Result<StatusReport, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/api/status/{job}")))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let doc: StatusDoc = response.json().await?;
        parse_status(doc)
    }

    async fn list_frames(&self, job: &JobId) -> Result<Vec<FrameRef>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/api/frames/{job}/list")))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let doc: FramesDoc = response.json().await?;
        Ok(doc.frames.into_iter().map(FrameRef).collect())
    }

    async fn list_masks(&self, job: &JobId) -> Result<Vec<MaskRef>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/api/masks/{job}/list")))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let doc: MasksDoc = response.json().await?;
        Ok(doc.masks.into_iter().map(MaskRef).collect())
    }

    async fn download_export(&self, job: &JobId) -> Result<Bytes, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/api/export/{job}")))
            .timeout(self.settings.transfer_timeout)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(bytes))
    }
}
