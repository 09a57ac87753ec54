//! View command implementation

use crate::cli::ViewArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geoprovider_core::config::ProviderConfig;
use geoprovider_core::Provider;

pub fn execute(args: ViewArgs, config: &ProviderConfig, output: &OutputWriter) -> Result<()> {
    let mut provider = super::open_provider(&args.file, config)?;

    if args.ids_only {
        let ids: Vec<u64> =
            provider.object_ids_in_view(&args.bbox)?.into_iter().map(|id| id.0).collect();
        if output.is_json() {
            output.result(&ids)?;
        } else {
            for id in &ids {
                println!("{}", id);
            }
            output.info(format!("{} feature(s) in {}", ids.len(), args.bbox));
        }
    } else {
        let geometries = provider.geometries_in_view(&args.bbox)?;
        output.result(&geometries)?;
        output.info(format!("{} geometries in {}", geometries.len(), args.bbox));
    }

    provider.dispose()?;
    Ok(())
}
