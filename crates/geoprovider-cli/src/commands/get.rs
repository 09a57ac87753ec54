//! Get command implementation

use crate::cli::GetArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geoprovider_core::config::ProviderConfig;
use geoprovider_core::{FeatureId, Provider};

pub fn execute(args: GetArgs, config: &ProviderConfig, output: &OutputWriter) -> Result<()> {
    let mut provider = super::open_provider(&args.file, config)?;

    let row = provider.feature_by_id(FeatureId(args.id))?;
    let mut table = provider.clone_table_structure(provider.schema()?);
    table.add_row(row)?;

    super::print_rows(&table, output)?;
    provider.dispose()?;
    Ok(())
}
