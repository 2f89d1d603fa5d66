mod config;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use layers::{
    FeatureResolver, Layer, LayerStackAssembler, PickOptions, Pixel, PointerEventKind, Viewport,
    resolve,
};
use streaming::ResourceCache;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{DashboardConfig, parse_lon_lat, parse_pair, read_selection};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the basin dashboard layer engine")]
struct Args {
    /// Directory or http(s) base URL with the GeoJSON files (default: $DASHBOARD_DATA or ./public)
    #[arg(long)]
    data: Option<String>,

    /// Resource catalog JSON (default: $DASHBOARD_CATALOG, else built-in file names)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the layer specs resolved for a selection
    Specs {
        /// Selection state JSON (default: nothing selected)
        #[arg(long)]
        selection: Option<PathBuf>,
    },

    /// Assemble the layer stack and wait for every layer to settle
    Stack {
        #[arg(long)]
        selection: Option<PathBuf>,

        /// Write the render document to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve a pointer move (or click) against the assembled stack
    Pick {
        #[arg(long)]
        selection: Option<PathBuf>,

        /// Pointer position in pixels: x,y
        #[arg(long)]
        at: String,

        /// Treat the event as a click instead of a move
        #[arg(long)]
        click: bool,

        /// Viewport size in pixels: width,height
        #[arg(long, default_value = "800,600")]
        size: String,

        /// View center: lon,lat
        #[arg(long)]
        center: Option<String>,

        #[arg(long)]
        zoom: Option<f64>,

        /// How close (in pixels) a line or point must be to count as hit
        #[arg(long, default_value_t = PickOptions::default().tolerance_px)]
        tolerance: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> CliResult {
    let config = DashboardConfig::load(args.data, args.catalog)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match args.command {
        Command::Specs { selection } => cmd_specs(&config, selection),
        Command::Stack { selection, out } => runtime.block_on(cmd_stack(&config, selection, out)),
        Command::Pick {
            selection,
            at,
            click,
            size,
            center,
            zoom,
            tolerance,
        } => {
            let (x, y) = parse_pair(&at)?;
            let (width, height) = parse_pair(&size)?;
            let mut viewport = Viewport::new(width, height);
            if let Some(center) = center {
                viewport.center = parse_lon_lat(&center)?;
            }
            if let Some(zoom) = zoom {
                viewport.zoom = zoom;
            }
            let kind = if click {
                PointerEventKind::Click
            } else {
                PointerEventKind::Move
            };
            let options = PickOptions {
                tolerance_px: tolerance,
            };
            runtime.block_on(cmd_pick(
                &config,
                selection,
                viewport,
                options,
                Pixel::new(x, y),
                kind,
            ))
        }
    }
}

fn cmd_specs(config: &DashboardConfig, selection: Option<PathBuf>) -> CliResult {
    let selection = read_selection(selection.as_deref())?;
    let specs = resolve(&selection, &config.catalog);
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

fn assembler(config: &DashboardConfig) -> LayerStackAssembler {
    let cache = Arc::new(ResourceCache::new(config.source()));
    LayerStackAssembler::new(config.catalog.clone(), cache)
}

async fn cmd_stack(
    config: &DashboardConfig,
    selection: Option<PathBuf>,
    out: Option<PathBuf>,
) -> CliResult {
    let selection = read_selection(selection.as_deref())?;
    let assembler = assembler(config);
    let stack = assembler.assemble(&selection);
    stack.settled().await;

    for tile in stack.basemap() {
        println!("tiles\t{}\t{}", tile.id(), tile.url);
    }
    for layer in stack.iter() {
        println!(
            "{}\t{:?}\t{:?}\t{} features",
            layer.id(),
            layer.kind(),
            layer.status(),
            layer.feature_count()
        );
    }

    if let Some(out) = out {
        let payload = serde_json::to_string_pretty(&stack.render_document())?;
        fs::write(&out, payload).map_err(|e| format!("write {out:?}: {e}"))?;
        info!("wrote render document to {}", out.display());
    }
    Ok(())
}

async fn cmd_pick(
    config: &DashboardConfig,
    selection: Option<PathBuf>,
    viewport: Viewport,
    options: PickOptions,
    px: Pixel,
    kind: PointerEventKind,
) -> CliResult {
    let selection = read_selection(selection.as_deref())?;
    let assembler = assembler(config);
    let stack = assembler.assemble(&selection);
    stack.settled().await;

    let resolver = FeatureResolver::new(Arc::clone(assembler.cache()), assembler.catalog())
        .with_options(options);
    let resolution = resolver.resolve_at(&stack, &viewport, px, kind);

    println!("{}", resolution.hover);
    if let Some(click) = resolution.click {
        println!("{}", serde_json::to_string_pretty(&click)?);
    }
    Ok(())
}
