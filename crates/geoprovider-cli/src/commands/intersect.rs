//! Intersect command implementation

use crate::cli::IntersectArgs;
use crate::output::OutputWriter;
use anyhow::{bail, Context, Result};
use geoprovider_core::config::ProviderConfig;
use geoprovider_core::Provider;

pub fn execute(args: IntersectArgs, config: &ProviderConfig, output: &OutputWriter) -> Result<()> {
    let mut provider = super::open_provider(&args.file, config)?;
    let mut result = provider.clone_table_structure(provider.schema()?);

    match (&args.geometry, &args.bbox) {
        (Some(geojson), None) => {
            let value: serde_json::Value =
                serde_json::from_str(geojson).context("Query geometry is not valid JSON")?;
            let geometry = provider.geometry_factory()?.from_geojson(&value)?;
            provider.execute_intersection_query(&geometry, &mut result)?;
        }
        (None, Some(bbox)) => {
            provider.execute_intersection_query_envelope(bbox, &mut result)?;
        }
        _ => bail!("Provide either --geometry or --bbox"),
    }

    super::print_rows(&result, output)?;
    provider.dispose()?;
    Ok(())
}
