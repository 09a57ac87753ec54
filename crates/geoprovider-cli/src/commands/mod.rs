//! Command implementations

mod get;
mod info;
mod intersect;
mod view;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geoprovider_core::config::ProviderConfig;
use geoprovider_core::{FeatureRow, FeatureTable, Provider};
use geoprovider_store::GeoJsonProvider;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Info(args) => info::execute(args, &config, &output),
        Commands::View(args) => view::execute(args, &config, &output),
        Commands::Get(args) => get::execute(args, &config, &output),
        Commands::Intersect(args) => intersect::execute(args, &config, &output),
    }
}

/// Open a GeoJSON provider configured from `config`
fn open_provider(file: &Path, config: &ProviderConfig) -> Result<GeoJsonProvider> {
    let mut provider = GeoJsonProvider::from_config(file, config);
    provider.open().with_context(|| format!("Failed to open {}", file.display()))?;
    Ok(provider)
}

/// One feature row, flattened for display
#[derive(Debug, Serialize, Tabled)]
struct FeatureOutput {
    id: u64,
    geometry: String,
    srid: String,
    attributes: String,
}

impl FeatureOutput {
    fn from_row(table: &FeatureTable, row: &FeatureRow) -> Self {
        let attributes: serde_json::Map<String, serde_json::Value> = table
            .columns()
            .iter()
            .zip(&row.values)
            .filter(|(_, value)| !value.is_null())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect();

        Self {
            id: row.id.0,
            geometry: row
                .geometry
                .as_ref()
                .map(|g| g.shape().type_name().to_string())
                .unwrap_or_else(|| "-".to_string()),
            srid: row.geometry.as_ref().map(|g| g.srid().to_string()).unwrap_or_default(),
            attributes: serde_json::Value::Object(attributes).to_string(),
        }
    }
}

/// Print a result table as a table or JSON
fn print_rows(table: &FeatureTable, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        return output.result(table.rows());
    }

    let rows = table.rows().iter().map(|row| FeatureOutput::from_row(table, row)).collect();
    output.table(rows);
    output.info(format!("{} feature(s)", table.len()));
    Ok(())
}
