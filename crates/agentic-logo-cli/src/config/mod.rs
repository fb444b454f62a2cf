//! Configuration loading and resolution.
//!
//! Each setting resolves as: explicit flag, then environment variable, then
//! default.

use std::path::{Path, PathBuf};

use agentic_logo::PipelineConfig;

pub const ENV_RANK_ENDPOINT: &str = "LOGO_RANK_ENDPOINT";
pub const ENV_RANK_TOKEN: &str = "LOGO_RANK_TOKEN";
pub const ENV_OUTPUT_DIR: &str = "LOGO_OUTPUT_DIR";
pub const ENV_CONFIG: &str = "LOGO_CONFIG";

fn from_env(explicit: Option<&str>, var: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(var).ok())
        .filter(|v| !v.trim().is_empty())
}

/// Resolve the directory normalized images are written to.
pub fn resolve_output_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = from_env(explicit, ENV_OUTPUT_DIR) {
        return PathBuf::from(dir);
    }
    default_output_dir()
}

fn default_output_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".agentic-logo").join("images")
}

/// Resolve the rank service endpoint. There is no default.
pub fn resolve_rank_endpoint(explicit: Option<&str>) -> Option<String> {
    from_env(explicit, ENV_RANK_ENDPOINT)
}

/// Resolve the opaque `Authorization` header value for the rank service.
pub fn resolve_rank_token(explicit: Option<&str>) -> Option<String> {
    from_env(explicit, ENV_RANK_TOKEN)
}

/// Load pipeline tunables from a JSON file, or defaults when none is given.
pub fn load_pipeline_config(explicit: Option<&str>) -> anyhow::Result<PipelineConfig> {
    match from_env(explicit, ENV_CONFIG) {
        Some(path) => read_pipeline_config(Path::new(&path)),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn read_pipeline_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
    Ok(config)
}
