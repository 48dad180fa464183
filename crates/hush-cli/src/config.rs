use anyhow::Context;
use hush_core::HushConfig;
use std::path::Path;
use tracing::warn;

/// Load configuration from a YAML file.
///
/// A missing file yields the defaults with a warning, so the tools run
/// before a config has been written.
pub fn load(path: &Path) -> anyhow::Result<HushConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(HushConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: HushConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config file {}", path.display()))?;

    Ok(config)
}

/// The default configuration as YAML.
pub fn defaults_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&HushConfig::default()).context("failed to render default configuration")
}
