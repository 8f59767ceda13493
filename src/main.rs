mod api;
mod app_state;
mod config;
mod controller;
mod domain;
mod logging;
mod markdown;
mod provider;
mod service;
mod utils;
mod view;

use anyhow::{bail, Result};
use std::sync::Arc;

use app_state::AppState;
use config::Settings;
use provider::{DefinitionProvider, LlmDefinitionProvider};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    logging::init(settings.log_format);

    let provider = LlmDefinitionProvider::from_settings(&settings);
    let capability = provider.capability();
    if !capability.configured {
        if settings.require_key {
            bail!(
                "no API key configured for the {} provider and FINTERM_REQUIRE_KEY is set",
                capability.provider.as_str()
            );
        }
        tracing::warn!(
            provider = capability.provider.as_str(),
            "no API key configured; every search will fail until one is set"
        );
    }
    tracing::info!(
        provider = capability.provider.as_str(),
        model = %capability.model,
        configured = capability.configured,
        "definition provider ready"
    );

    if let Some(path) = settings.openapi_out.as_deref() {
        api::write_spec_json(path).await?;
    }

    let state = AppState::new(Arc::new(provider));
    api::run_server(settings.http_addr, state, settings.cors_origins.as_deref()).await
}
