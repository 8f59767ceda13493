use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const NOT_CONFIGURED_MESSAGE: &str = "API 키가 설정되지 않았습니다. 관리자에게 문의하세요.";
pub const TASK_FAILURE_MESSAGE: &str = "정의를 가져오는 중 예기치 않은 오류가 발생했습니다.";

/// Monotonically increasing identifier handed out per accepted submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn successor(self) -> Self {
        RequestId(self.0 + 1)
    }
}

/// A trimmed, non-empty search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(input: &str) -> Option<Self> {
        let term = input.trim();
        if term.is_empty() {
            None
        } else {
            Some(SearchQuery(term.to_string()))
        }
    }

    pub fn term(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    NotConfigured,
    #[error("API 호출 중 오류가 발생했습니다: {0}")]
    Service(String),
    #[error("알 수 없는 오류가 발생하여 정의를 가져올 수 없습니다.")]
    Unknown,
}

impl DefinitionError {
    /// Classifies a raw backend failure message.
    pub fn from_failure(message: &str) -> Self {
        let message = message.trim();
        if message.is_empty() {
            DefinitionError::Unknown
        } else {
            DefinitionError::Service(message.to_string())
        }
    }
}

pub type DefinitionResult = Result<String, DefinitionError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Idle,
    Loading {
        term: String,
    },
    Success {
        term: String,
        markdown: String,
    },
    Error {
        message: String,
    },
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ViewSnapshot {
    pub request_id: RequestId,
    /// Bumped on every transition; clients apply a snapshot only if it is newer
    /// than the last one they rendered.
    pub revision: u64,
    pub state: ViewState,
    /// Rendered HTML fragment for the result panel.
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini-2.5-flash",
            Backend::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Backend::Gemini => "https://generativelanguage.googleapis.com",
            Backend::OpenAi => "https://api.openai.com/v1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Capability {
    pub configured: bool,
    pub provider: Backend,
    pub model: String,
}
