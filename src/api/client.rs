//! HTTP client for the meeting backend.
//!
//! Every call goes through [`BackendClient::send`], which attaches the bearer
//! token, maps transport failures and HTTP statuses onto [`ApiError`], and
//! unwraps the `{ success, message, response }` envelope.

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use super::types::{
    ActivateAccountRequest, CalendarMeetings, Envelope, ErrorBody, JoinRequest, Paginated,
    RecordQuery, ResendOtpRequest, SignInRequest, SignUpRequest, SummaryCore,
};
use crate::auth::Credentials;
use crate::config::BackendConfig;
use crate::session::types::{MeetingRecord, MeetingSessionId, SessionSnapshot};

/// Per-action timeouts. Join and stop wait on the meeting bot, so they get
/// longer budgets than ordinary reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub join: Duration,
    pub stop: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            join: Duration::from_secs(45),
            stop: Duration::from_secs(60),
        }
    }
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    timeouts: Timeouts,
}

impl BackendClient {
    /// Create a client for `base_url` (including the `/api/<version>` prefix).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.api_base_url()).with_timeouts(Timeouts {
            request: config.request_timeout(),
            join: config.join_timeout(),
            stop: config.stop_timeout(),
        })
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the envelope's `response`, if any.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> ApiResult<Option<T>> {
        let mut request = request.timeout(timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected credentials (401)");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }

        Ok(envelope.response)
    }

    async fn send_required<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> ApiResult<T> {
        self.send(request, timeout)
            .await?
            .ok_or_else(|| ApiError::Decode("Response envelope had no payload".to_string()))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Credentials> {
        info!("Signing in as {}", email);
        let request = self
            .client
            .post(self.url("/auth/sign-in"))
            .json(&SignInRequest { email, password });
        self.send_required(request, self.timeouts.request).await
    }

    /// Create an account. The backend mails a one-time code that has to be
    /// passed to [`activate_account`](Self::activate_account) before sign-in
    /// succeeds.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> ApiResult<()> {
        info!("Registering account {}", email);
        let request = self
            .client
            .post(self.url("/auth/sign-up"))
            .json(&SignUpRequest {
                name,
                email,
                password,
            });
        self.send::<Value>(request, self.timeouts.request).await?;
        Ok(())
    }

    pub async fn activate_account(&self, email: &str, otp_code: &str) -> ApiResult<()> {
        info!("Activating account {}", email);
        let request = self
            .client
            .post(self.url("/auth/active-account"))
            .json(&ActivateAccountRequest { email, otp_code });
        self.send::<Value>(request, self.timeouts.request).await?;
        Ok(())
    }

    pub async fn resend_otp(&self, email: &str) -> ApiResult<()> {
        info!("Requesting a new activation code for {}", email);
        let request = self
            .client
            .post(self.url("/auth/resend-otp"))
            .json(&ResendOtpRequest { email });
        self.send::<Value>(request, self.timeouts.request).await?;
        Ok(())
    }

    /// Ask the backend to send its bot into a meeting. The returned record's
    /// id is the new session id.
    pub async fn join_meeting(&self, join: &JoinRequest) -> ApiResult<MeetingRecord> {
        info!(
            "Requesting bot join: {} {}",
            join.platform.as_str(),
            join.meeting_code
        );
        let request = self.client.post(self.url("/bot/join-meet")).json(join);
        self.send_required(request, self.timeouts.join).await
    }

    pub async fn stop_meeting(&self, id: &MeetingSessionId) -> ApiResult<()> {
        info!("Stopping meeting {}", id);
        let request = self.client.post(self.url(&format!("/bot/stop/{}", id)));
        self.send::<Value>(request, self.timeouts.stop).await?;
        Ok(())
    }

    pub async fn meeting_snapshot(&self, id: &MeetingSessionId) -> ApiResult<SessionSnapshot> {
        debug!("Fetching snapshot for {}", id);
        let request = self.client.get(self.url(&format!("/bot/info/{}", id)));
        self.send_required(request, self.timeouts.request).await
    }

    pub async fn live_meetings(&self) -> ApiResult<Vec<MeetingRecord>> {
        let request = self.client.get(self.url("/meeting/live"));
        Ok(self
            .send(request, self.timeouts.request)
            .await?
            .unwrap_or_default())
    }

    pub async fn records(&self, query: &RecordQuery) -> ApiResult<Paginated<MeetingRecord>> {
        let request = self.client.get(self.url("/meeting/records")).query(query);
        self.send_required(request, self.timeouts.request).await
    }

    pub async fn meeting_info(&self, id: &MeetingSessionId) -> ApiResult<MeetingRecord> {
        let request = self.client.get(self.url(&format!("/meeting/info/{}", id)));
        self.send_required(request, self.timeouts.request).await
    }

    /// Kick off summary generation. Progress arrives on the `_summary` and
    /// `_translation` channels.
    pub async fn request_summary(
        &self,
        id: &MeetingSessionId,
        language: &str,
    ) -> ApiResult<Option<MeetingRecord>> {
        info!("Requesting summary for {} ({})", id, language);
        let request = self.client.get(self.url(&format!(
            "/ai/summary/{}/{}/{}",
            id,
            SummaryCore::Gpt.as_str(),
            language
        )));
        self.send(request, self.timeouts.request).await
    }

    pub async fn calendar_meetings(&self, today: bool) -> ApiResult<CalendarMeetings> {
        let path = if today {
            "/google/meetings?today=true"
        } else {
            "/google/meetings"
        };
        let request = self.client.get(self.url(path));
        self.send_required(request, self.timeouts.request).await
    }

    /// Upload a recorded file as an imported meeting.
    pub async fn upload_recording(&self, file_path: &Path) -> ApiResult<MeetingRecord> {
        let file_data = fs::read(file_path).await?;

        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording")
            .to_string();

        let mime_type = file_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| mime_type_for_extension(&e.to_lowercase()))
            .unwrap_or("application/octet-stream");

        info!(
            "Uploading {} ({} bytes, {})",
            filename,
            file_data.len(),
            mime_type
        );

        let part = Part::bytes(file_data)
            .file_name(filename)
            .mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let request = self.client.post(self.url("/meeting/import")).multipart(form);
        // Uploads are bounded by file size, not by the usual request budget.
        self.send_required(request, self.timeouts.stop.max(self.timeouts.request))
            .await
    }
}

/// MIME type for a supported recording extension.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "flac" => Some("audio/flac"),
        "ogg" => Some("audio/ogg"),
        "opus" => Some("audio/opus"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}
