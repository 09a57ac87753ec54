//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use geoprovider_core::config::{ConfigLayer, ProviderConfig, ValidityMode};

use crate::cli::Cli;

/// Load layered configuration: defaults, optional file, environment, then flags
pub fn load_config(cli: &Cli) -> Result<ProviderConfig> {
    let mut config = ProviderConfig::with_defaults();

    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides_from(cli)?);
    Ok(config)
}

fn overrides_from(cli: &Cli) -> Result<ConfigLayer> {
    let geometry_validity = cli.validity.as_deref().map(str::parse::<ValidityMode>).transpose()?;

    Ok(ConfigLayer {
        srid: cli.srid,
        geometry_validity,
        instrument_queries: cli.instrument.then_some(true),
    })
}
