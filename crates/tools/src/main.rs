use std::env;
use std::sync::Arc;

use foundation::geo::{LatLngBounds, Viewport};
use layers::FeatureLayer;
use streaming::{HttpFeatureSource, LayerEvent, LayerOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "watch" => cmd_watch(args),
        _ => Err(usage()),
    }
}

/// lattice watch <query_url> <west,south,east,north> <zoom>
///     [--cell-size N] [--where EXPR] [--fields a,b,c] [--token T]
fn cmd_watch(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err(usage());
    }

    let url = args[0].clone();
    let bounds = parse_bounds(&args[1])?;
    let zoom: u8 = args[2]
        .parse()
        .map_err(|_| format!("invalid zoom: {}", args[2]))?;

    let mut options = LayerOptions::default();
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--cell-size" => {
                options.cell_size = flag_value(&args, &mut i)?
                    .parse()
                    .map_err(|_| "--cell-size expects a number".to_string())?;
            }
            "--where" => {
                options.where_clause = flag_value(&args, &mut i)?;
            }
            "--fields" => {
                options.fields = flag_value(&args, &mut i)?
                    .split(',')
                    .map(str::to_string)
                    .collect();
            }
            "--token" => {
                options.token = Some(flag_value(&args, &mut i)?);
            }
            s => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
        }
        i += 1;
    }

    run_watch(url, Viewport::new(bounds, zoom), options)
}

#[tokio::main]
async fn run_watch(url: String, viewport: Viewport, options: LayerOptions) -> Result<(), String> {
    let source = Arc::new(HttpFeatureSource::new(url));
    let (_layer, mut events) =
        FeatureLayer::new(source, options, viewport).map_err(|e| e.to_string())?;

    while let Some(event) = events.recv().await {
        match event {
            LayerEvent::LoadingStarted { bounds } => {
                info!(?bounds, "loading started");
            }
            LayerEvent::FeaturesArrived { cell, page } => {
                println!("cell {cell}: {} features", page.features().len());
            }
            LayerEvent::CellFailed { cell, error } => {
                eprintln!("cell {cell} failed: {error}");
            }
            LayerEvent::AuthenticationRequired { .. } => {
                return Err("service requires a token; pass --token".to_string());
            }
            LayerEvent::LoadingFinished { bounds } => {
                info!(?bounds, "loading finished");
                return Ok(());
            }
        }
    }

    Ok(())
}

fn flag_value(args: &[String], i: &mut usize) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires a value", args[*i - 1]))
}

fn parse_bounds(s: &str) -> Result<LatLngBounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid bounds: {s}"))?;
    if parts.len() != 4 {
        return Err(format!("bounds must be west,south,east,north: {s}"));
    }
    Ok(LatLngBounds::new(parts[0], parts[1], parts[2], parts[3]))
}

fn usage() -> String {
    [
        "usage:",
        "  lattice watch <query_url> <west,south,east,north> <zoom> \\",
        "      [--cell-size N] [--where EXPR] [--fields a,b,c] [--token T]",
        "",
        "Streams one batch of cell fetches for the given viewport and",
        "prints lifecycle events; set RUST_LOG=debug for dispatch detail.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::parse_bounds;

    #[test]
    fn parses_bounds_csv() {
        let b = parse_bounds("-122.7,45.4,-122.5,45.6").unwrap();
        assert_eq!(b.west, -122.7);
        assert_eq!(b.north, 45.6);
    }

    #[test]
    fn rejects_short_bounds() {
        assert!(parse_bounds("-122.7,45.4").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }
}
