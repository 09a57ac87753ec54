use clap::{Parser, Subcommand};
use geoprovider_core::Envelope;
use std::path::PathBuf;

/// GeoProvider - Query spatial datasets through the provider contract
#[derive(Parser, Debug)]
#[command(name = "geoprovider")]
#[command(about = "Query spatial datasets through the provider contract", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// SRID to bind the provider to (overrides config and environment)
    #[arg(long, global = true)]
    pub srid: Option<i32>,

    /// Geometry validity mode (strict or lenient)
    #[arg(long, global = true)]
    pub validity: Option<String>,

    /// Log begin/end timing of intersection queries
    #[arg(long, global = true)]
    pub instrument: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show feature count, extents, SRID and columns
    Info(InfoArgs),

    /// List geometries or feature ids inside a bounding box
    View(ViewArgs),

    /// Show a single feature by id
    Get(GetArgs),

    /// Find features intersecting a GeoJSON geometry
    Intersect(IntersectArgs),
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// GeoJSON file
    pub file: PathBuf,

    /// Also print the effective configuration with sources
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Parser, Debug)]
pub struct ViewArgs {
    /// GeoJSON file
    pub file: PathBuf,

    /// Bounding box as minx,miny,maxx,maxy
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Envelope,

    /// Only list feature ids (envelope test only)
    #[arg(long)]
    pub ids_only: bool,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// GeoJSON file
    pub file: PathBuf,

    /// Feature id
    #[arg(long)]
    pub id: u64,
}

#[derive(Parser, Debug)]
pub struct IntersectArgs {
    /// GeoJSON file
    pub file: PathBuf,

    /// Query geometry as a GeoJSON geometry object
    #[arg(long, conflicts_with = "bbox")]
    pub geometry: Option<String>,

    /// Query by bounding box instead (minx,miny,maxx,maxy)
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<Envelope>,
}

/// Parse "minx,miny,maxx,maxy"
pub fn parse_bbox(s: &str) -> Result<Envelope, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in bbox '{}': {}", s, e))?;

    match parts.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok(Envelope::new(*min_x, *min_y, *max_x, *max_y)),
        _ => Err(format!("bbox needs 4 comma-separated numbers, got {}", parts.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        assert_eq!(parse_bbox("0,0,10,5").unwrap(), Envelope::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(parse_bbox(" -1.5, 2 ,3,4").unwrap(), Envelope::new(-1.5, 2.0, 3.0, 4.0));
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn test_parse_view_command() {
        let cli = Cli::try_parse_from([
            "geoprovider",
            "--json",
            "view",
            "data.geojson",
            "--bbox",
            "-10,-10,10,10",
            "--ids-only",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::View(args) => {
                assert_eq!(args.bbox, Envelope::new(-10.0, -10.0, 10.0, 10.0));
                assert!(args.ids_only);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_intersect_geometry_and_bbox_conflict() {
        let result = Cli::try_parse_from([
            "geoprovider",
            "intersect",
            "data.geojson",
            "--geometry",
            "{}",
            "--bbox",
            "0,0,1,1",
        ]);
        assert!(result.is_err());
    }
}
