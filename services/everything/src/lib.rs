//! EVERYTHING Service Library Crate
//!
//! Wires the core collaborators together: configuration from the environment,
//! user data from flat files, prompt overrides from disk, and the
//! OpenAI-compatible client. The `everything` binary is a thin wrapper around
//! [`run`].

pub mod config;
pub mod prompts;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::Config;
use everything_core::{
    DaySimulator, DaySummary,
    device_data::DeviceData,
    llm_client::{LLMClient, LlmGateway, OpenAICompatibleClient},
    prompts::PromptLibrary,
    user_data::UserData,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// Per-run choices made at the process boundary.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub date: NaiveDate,
    pub data_dir: PathBuf,
}

/// Simulates one day against the configured OpenAI-compatible service.
pub async fn run(config: &Config, options: &RunOptions) -> Result<DaySummary> {
    info!(base = %config.openai_api_base, model = %config.simulation.model.model, "Using OpenAI-compatible provider.");
    let client = Arc::new(OpenAICompatibleClient::new(config.openai_config()));
    run_with_client(config, options, client).await
}

/// Simulates one day using the given LLM client.
pub async fn run_with_client(
    config: &Config,
    options: &RunOptions,
    client: Arc<dyn LLMClient>,
) -> Result<DaySummary> {
    let user = UserData::load(&options.data_dir, config.user_name.clone())
        .context("Failed to load user data")?;
    let overrides = prompts::load_prompt_overrides(&config.prompts_path)?;
    let prompt_library = PromptLibrary::default()
        .with_overrides(overrides)
        .context("Invalid prompt override")?;
    let gateway = LlmGateway::new(client, config.simulation.model.clone());

    let mut simulator = DaySimulator::new(
        user,
        DeviceData::new(),
        gateway,
        prompt_library,
        config.simulation.clone(),
    )?;
    let summary = simulator
        .simulate_day(options.date)
        .await
        .context("Simulation failed")?;

    info!(
        ticks = summary.ticks,
        tasks = summary.tasks_completed,
        recommendations = simulator.recommendations().len(),
        calendar_events = simulator.user().calendar().len(),
        llm_failures = simulator.gateway().failures(),
        "Simulation complete"
    );
    Ok(summary)
}
