use async_trait::async_trait;

use crate::config::Settings;
use crate::domain::{Backend, Capability, DefinitionError, DefinitionResult};
use crate::utils::{gemini_generate, openai_chat, Completion};

pub const SYSTEM_INSTRUCTION: &str = "당신은 친절한 금융 전문가입니다. 사용자가 입력한 금융 용어를 \
한국어로 쉽고 명확하게 설명해주세요. 답변은 마크다운 형식(굵은 글씨, 목록 등)으로 작성하고, \
공백을 포함하여 500자 이내로 작성해주세요.";

pub const TEMPERATURE: f32 = 0.5;

/// Source of term definitions. Implementations never panic on remote failure;
/// every failure comes back as a [`DefinitionError`].
#[async_trait]
pub trait DefinitionProvider: Send + Sync {
    async fn fetch_definition(&self, term: &str) -> DefinitionResult;

    fn capability(&self) -> Capability;
}

/// Definition provider backed by a hosted text-generation API.
pub struct LlmDefinitionProvider {
    backend: Backend,
    api_key: Option<String>,
    model: String,
    api_base: String,
    http: reqwest::Client,
}

impl LlmDefinitionProvider {
    pub fn new(backend: Backend, api_key: Option<String>, model: String, api_base: String) -> Self {
        Self {
            backend,
            api_key,
            model,
            api_base,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.backend,
            settings.api_key.clone(),
            settings.model.clone(),
            settings.api_base.clone(),
        )
    }
}

#[async_trait]
impl DefinitionProvider for LlmDefinitionProvider {
    async fn fetch_definition(&self, term: &str) -> DefinitionResult {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(backend = self.backend.as_str(), "definition requested without an API key");
            return Err(DefinitionError::NotConfigured);
        };

        let completion = Completion {
            model: &self.model,
            system: SYSTEM_INSTRUCTION,
            user: term,
            temperature: TEMPERATURE,
        };

        tracing::debug!(backend = self.backend.as_str(), model = %self.model, term, "requesting definition");

        let outcome = match self.backend {
            Backend::Gemini => gemini_generate(&self.http, &self.api_base, api_key, completion).await,
            Backend::OpenAi => openai_chat(&self.api_base, api_key, completion).await,
        };

        outcome.map_err(|e| {
            tracing::error!(
                backend = self.backend.as_str(),
                model = %self.model,
                term,
                error = ?e,
                "definition request failed"
            );
            DefinitionError::from_failure(&e.to_string())
        })
    }

    fn capability(&self) -> Capability {
        Capability {
            configured: self.api_key.is_some(),
            provider: self.backend,
            model: self.model.clone(),
        }
    }
}
