//! Loads prompt template overrides from disk.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, info};

/// Reads every `*.md` file in `prompts_path`, keyed by file stem.
///
/// A missing directory is not an error: the built-in templates are used.
pub fn load_prompt_overrides(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    if !prompts_path.is_dir() {
        debug!(path = %prompts_path.display(), "No prompt directory, using built-in templates");
        return Ok(prompts);
    }

    for entry in fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompt directory {}", prompts_path.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {}", path.display()))?;
            prompts.insert(prompt_key, content);
        }
    }

    info!(count = prompts.len(), path = %prompts_path.display(), "Loaded prompt overrides");
    Ok(prompts)
}
