//! Meeting link classification.
//!
//! Recognises Google Meet, Zoom, Microsoft Teams and Teams Live links and
//! extracts the normalized meeting code plus any query parameters the bot
//! needs to get in (e.g. a Zoom `pwd`).

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conferencing platform a meeting runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Google,
    Zoom,
    /// Microsoft Teams, including Teams Live.
    Mst,
    /// Uploaded recording rather than a live meeting.
    Import,
    #[serde(other)]
    Undefined,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Zoom => "zoom",
            Self::Mst => "mst",
            Self::Import => "import",
            Self::Undefined => "undefined",
        }
    }
}

/// Tagged classification result, serialized as
/// `{ validate, platform, meetingCode, params }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkClassification {
    pub validate: bool,
    pub platform: Option<Platform>,
    pub meeting_code: Option<String>,
    pub params: Option<String>,
}

impl LinkClassification {
    pub fn invalid() -> Self {
        Self {
            validate: false,
            platform: None,
            meeting_code: None,
            params: None,
        }
    }
}

/// A link that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingLink {
    pub platform: Platform,
    pub meeting_code: String,
    pub params: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Not a supported meeting link: {0}")]
    Unsupported(String),
}

struct PlatformPattern {
    platform: Platform,
    regex: Regex,
    code_group: usize,
    params_group: usize,
}

pub struct LinkClassifier {
    patterns: Vec<PlatformPattern>,
}

impl LinkClassifier {
    pub fn new() -> Result<Self> {
        let patterns = vec![
            PlatformPattern {
                platform: Platform::Google,
                regex: Regex::new(
                    r"^https://meet\.google\.com/([a-z]{3}-[a-z]{4}-[a-z]{3})(\?.+)?$",
                )?,
                code_group: 1,
                params_group: 2,
            },
            PlatformPattern {
                platform: Platform::Zoom,
                regex: Regex::new(
                    r"^https://([a-z0-9]+\.)?zoom\.us/j/(\d{9,11})(\?pwd=[A-Za-z0-9.\-]+)?$",
                )?,
                code_group: 2,
                params_group: 3,
            },
            PlatformPattern {
                platform: Platform::Mst,
                regex: Regex::new(
                    r"^https://teams\.microsoft\.com/l/meetup-join/([^\s?]+)(\?.+)?$",
                )?,
                code_group: 1,
                params_group: 2,
            },
            PlatformPattern {
                platform: Platform::Mst,
                regex: Regex::new(r"^https://teams\.live\.com/meet/(\d+)(\?p=[A-Za-z0-9]+)?$")?,
                code_group: 1,
                params_group: 2,
            },
        ];

        Ok(Self { patterns })
    }

    /// Classify a raw link. Never fails; unsupported input yields
    /// `validate: false` with every other field empty.
    pub fn classify(&self, text: &str) -> LinkClassification {
        let text = text.trim();

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let Some(code) = caps.get(pattern.code_group) else {
                continue;
            };

            let params = caps
                .get(pattern.params_group)
                .map(|m| m.as_str().replacen('?', "", 1))
                .filter(|p| !p.is_empty());

            return LinkClassification {
                validate: true,
                platform: Some(pattern.platform),
                meeting_code: Some(code.as_str().to_string()),
                params,
            };
        }

        LinkClassification::invalid()
    }

    /// Like [`classify`](Self::classify) but as a validation step that
    /// must pass before any join request goes out.
    pub fn parse(&self, text: &str) -> Result<MeetingLink, LinkError> {
        let classification = self.classify(text);
        match (classification.platform, classification.meeting_code) {
            (Some(platform), Some(meeting_code)) if classification.validate => Ok(MeetingLink {
                platform,
                meeting_code,
                params: classification.params,
            }),
            _ => Err(LinkError::Unsupported(text.trim().to_string())),
        }
    }
}
