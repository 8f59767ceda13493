use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;

use crate::domain::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub http_addr: SocketAddr,
    pub cors_origins: Option<String>,
    pub require_key: bool,
    pub openapi_out: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match get("FINTERM_PROVIDER").as_deref() {
            None => Backend::Gemini,
            Some(v) if v.eq_ignore_ascii_case("gemini") => Backend::Gemini,
            Some(v) if v.eq_ignore_ascii_case("openai") => Backend::OpenAi,
            Some(other) => bail!("FINTERM_PROVIDER must be `gemini` or `openai`, got `{other}`"),
        };

        let api_key = match backend {
            Backend::Gemini => get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            Backend::OpenAi => get("OPENAI_API_KEY"),
        };

        let model = get("FINTERM_MODEL").unwrap_or_else(|| backend.default_model().to_string());
        let api_base = get("FINTERM_API_BASE")
            .unwrap_or_else(|| backend.default_api_base().to_string())
            .trim_end_matches('/')
            .to_string();

        let addr = get("FINTERM_HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let http_addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("FINTERM_HTTP_ADDR is not a socket address: `{addr}`"))?;

        let require_key = match get("FINTERM_REQUIRE_KEY") {
            None => false,
            Some(v) => parse_flag(&v)
                .with_context(|| format!("FINTERM_REQUIRE_KEY is not a boolean: `{v}`"))?,
        };

        let log_format = match get("FINTERM_LOG_FORMAT").as_deref() {
            None => LogFormat::Pretty,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(other) => bail!("FINTERM_LOG_FORMAT must be `pretty` or `json`, got `{other}`"),
        };

        Ok(Self {
            backend,
            api_key,
            model,
            api_base,
            http_addr,
            cors_origins: get("FINTERM_CORS_ORIGINS"),
            require_key,
            openapi_out: get("FINTERM_OPENAPI_OUT"),
            log_format,
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_to_gemini_without_key() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.backend, Backend::Gemini);
        assert_eq!(s.api_key, None);
        assert_eq!(s.model, "gemini-2.5-flash");
        assert_eq!(s.http_addr, "0.0.0.0:3000".parse().unwrap());
        assert!(!s.require_key);
        assert_eq!(s.log_format, LogFormat::Pretty);
    }

    #[test]
    fn gemini_key_falls_back_to_api_key() {
        let s = settings(&[("API_KEY", "abc")]).unwrap();
        assert_eq!(s.api_key.as_deref(), Some("abc"));
        let s = settings(&[("API_KEY", "abc"), ("GEMINI_API_KEY", "xyz")]).unwrap();
        assert_eq!(s.api_key.as_deref(), Some("xyz"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let s = settings(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert_eq!(s.api_key, None);
    }

    #[test]
    fn openai_uses_its_own_key_and_model() {
        let s = settings(&[
            ("FINTERM_PROVIDER", "OpenAI"),
            ("GEMINI_API_KEY", "g"),
            ("OPENAI_API_KEY", "sk-test"),
            ("FINTERM_API_BASE", "http://localhost:9000/v1/"),
        ])
        .unwrap();
        assert_eq!(s.backend, Backend::OpenAi);
        assert_eq!(s.api_key.as_deref(), Some("sk-test"));
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.api_base, "http://localhost:9000/v1");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(settings(&[("FINTERM_PROVIDER", "claude")]).is_err());
        assert!(settings(&[("FINTERM_HTTP_ADDR", "nowhere")]).is_err());
        assert!(settings(&[("FINTERM_REQUIRE_KEY", "maybe")]).is_err());
        assert!(settings(&[("FINTERM_LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn require_key_flag_parses() {
        assert!(settings(&[("FINTERM_REQUIRE_KEY", "TRUE")]).unwrap().require_key);
        assert!(!settings(&[("FINTERM_REQUIRE_KEY", "0")]).unwrap().require_key);
    }
}
