//! Request and response shapes of the backend REST API.

use serde::{Deserialize, Serialize};

use crate::link::{MeetingLink, Platform};

/// Envelope wrapped around every response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub response: Option<T>,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateAccountRequest<'a> {
    pub email: &'a str,
    pub otp_code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResendOtpRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub platform: Platform,
    pub meeting_code: String,
    pub params: Option<String>,
    pub language_code: String,
}

impl JoinRequest {
    pub fn from_link(link: MeetingLink, language_code: impl Into<String>) -> Self {
        Self {
            platform: link.platform,
            meeting_code: link.meeting_code,
            params: link.params,
            language_code: language_code.into(),
        }
    }
}

/// Query for the paginated record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub page: u32,
    pub limit: u32,
    pub order_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            order_by: "_id,desc".to_string(),
            keyword: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub page: u32,
    pub page_count: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Summary engines the backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryCore {
    Gpt,
    Alibaba,
    Gemini,
}

impl SummaryCore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt => "GPT",
            Self::Alibaba => "ALIBABA",
            Self::Gemini => "GEMINI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMeeting {
    pub summary: String,
    pub start_time: String,
    #[serde(default)]
    pub hangout_link: Option<String>,
    pub event_id: String,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMeetings {
    #[serde(default)]
    pub register_google_calendar: bool,
    #[serde(default)]
    pub list: Vec<CalendarMeeting>,
    #[serde(default)]
    pub total: u64,
}
