//! Info command implementation

use crate::cli::InfoArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geoprovider_core::config::ProviderConfig;
use geoprovider_core::{Provider, ProviderError};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InfoOutput {
    connection_id: String,
    srid: i32,
    feature_count: usize,
    extents: Option<[f64; 4]>,
    columns: Vec<ColumnOutput>,
}

#[derive(Debug, Serialize)]
struct ColumnOutput {
    name: String,
    data_type: String,
}

pub fn execute(args: InfoArgs, config: &ProviderConfig, output: &OutputWriter) -> Result<()> {
    let mut provider = super::open_provider(&args.file, config)?;

    let extents = match provider.extents() {
        Ok(env) => Some([env.min_x(), env.min_y(), env.max_x(), env.max_y()]),
        Err(ProviderError::EmptyDataset) => None,
        Err(e) => return Err(e.into()),
    };

    let info = InfoOutput {
        connection_id: provider.connection_id().to_string(),
        srid: provider.srid(),
        feature_count: provider.feature_count()?,
        extents,
        columns: provider
            .schema()?
            .columns()
            .iter()
            .map(|c| ColumnOutput { name: c.name.clone(), data_type: format!("{:?}", c.data_type) })
            .collect(),
    };

    if output.is_json() {
        output.result(&info)?;
    } else {
        output.kv("Source", &info.connection_id);
        output.kv("SRID", info.srid);
        output.kv("Features", info.feature_count);
        match info.extents {
            Some([min_x, min_y, max_x, max_y]) => {
                output.kv("Extents", format!("[{}, {}, {}, {}]", min_x, min_y, max_x, max_y))
            }
            None => output.kv("Extents", "(empty)"),
        }

        output.section("Columns");
        for column in &info.columns {
            output.kv(&column.name, &column.data_type);
        }

        if args.show_config {
            output.section("Configuration");
            let mut entries: Vec<_> = config.to_inspection_map().into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, (value, source)) in entries {
                output.kv(key, format!("{} ({:?})", value, source));
            }
        }
    }

    provider.dispose()?;
    Ok(())
}
