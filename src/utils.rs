use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use backoff::ExponentialBackoffBuilder;
use serde_json::json;
use std::time::Duration;

/// One single-turn completion: a system instruction plus the user's text.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
}

pub async fn openai_chat(api_base: &str, api_key: &str, completion: Completion<'_>) -> Result<String> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base)
        .with_api_key(api_key);
    // Single attempt; the SDK would otherwise retry 429 and 5xx responses.
    let no_retry = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();
    let client = Client::with_config(config).with_backoff(no_retry);

    let system_msg: ChatCompletionRequestMessage = ChatCompletionRequestSystemMessageArgs::default()
        .content(completion.system)
        .build()?
        .into();
    let user_msg: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
        .content(completion.user)
        .build()?
        .into();

    let req = CreateChatCompletionRequestArgs::default()
        .model(completion.model)
        .messages(vec![system_msg, user_msg])
        .temperature(completion.temperature)
        .build()?;

    let resp = client.chat().create(req).await?;
    let content = resp
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    Ok(content)
}

pub async fn gemini_generate(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    completion: Completion<'_>,
) -> Result<String> {
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        api_base, completion.model
    );

    let body = json!({
        "systemInstruction": {
            "parts": [{ "text": completion.system }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": completion.user }]
        }],
        "generationConfig": {
            "temperature": completion.temperature
        }
    });

    let resp = http
        .post(url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let bytes = resp.bytes().await?;
    let json: Option<serde_json::Value> = serde_json::from_slice(&bytes).ok();

    if !status.is_success() {
        let message = json
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(anyhow!(message));
    }

    let json = json.ok_or_else(|| anyhow!("response body is not valid JSON"))?;

    // Blocked prompts come back as 200 with no candidates and a block reason.
    let Some(candidate) = json.pointer("/candidates/0") else {
        return Err(match json.pointer("/promptFeedback/blockReason").and_then(|v| v.as_str()) {
            Some(reason) => anyhow!("prompt blocked: {}", reason),
            None => anyhow!("response contained no candidates"),
        });
    };

    let Some(parts) = candidate.pointer("/content/parts").and_then(|v| v.as_array()) else {
        let finish = candidate
            .get("finishReason")
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN");
        return Err(anyhow!("candidate has no content (finishReason: {})", finish));
    };

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .concat())
}
