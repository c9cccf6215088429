pub mod loader;

pub use loader::{
    DatabaseConfig, EndpointConfig, IssuerConfig, ObservabilityConfig, ServerConfig, SluiceConfig,
};

use std::path::Path;

/// Load configuration from a TOML file with environment-variable overrides.
///
/// Resolution order:
/// 1. `config/default.toml`: base configuration
/// 2. `config/{env}.toml`: environment overlay (development, testing, production)
/// 3. Environment variables with prefix `SLUICE_` (double underscore for nesting)
///
/// # Example
///
/// `SLUICE_DATABASE__CONNECTION_STRING=postgres://...` overrides
/// `database.connection_string`.
pub fn load_config(config_dir: &Path, env: &str) -> anyhow::Result<SluiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("default.toml")).required(true))
        .add_source(config::File::from(config_dir.join(format!("{}.toml", env))).required(false))
        .add_source(
            config::Environment::with_prefix("SLUICE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: SluiceConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
