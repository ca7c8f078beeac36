//! frond: command-line host for the leaf detection and compositing
//! pipeline.
//!
//! Loads a directory of atlas layer files (`{name}_color.png`,
//! `{name}_opacity.png`, ...), detects leaf silhouettes, auto-places
//! them on a grid, composites every layer, and writes the resulting
//! texture set as PNGs.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin frond -- [OPTIONS] <ATLAS_DIR>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use frond_export::{DirectorySink, render_all, save_local};
use frond_pipeline::tile::blend_edges;
use frond_pipeline::{DetectParams, EditSession, SourceFile, session, tile};

/// Detect leaves in a foliage atlas and composite a tileable texture set.
///
/// Reads every recognized layer image in the atlas directory, runs leaf
/// detection on the opacity signal, places all detected leaves on a
/// deterministic grid, and writes one composited PNG per layer.
#[derive(Parser)]
#[command(name = "frond", version)]
struct Cli {
    /// Directory containing the atlas layer images.
    atlas_dir: PathBuf,

    /// Binarization threshold (1-255).
    #[arg(long, default_value_t = DetectParams::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Minimum leaf area in pixels.
    #[arg(long, default_value_t = DetectParams::DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Crop padding around each detected leaf, in pixels.
    #[arg(long, default_value_t = session::DEFAULT_PADDING)]
    padding: u32,

    /// Output canvas side length in pixels.
    #[arg(long, default_value_t = session::DEFAULT_OUTPUT_SIZE)]
    output_size: u32,

    /// Blend output edges for approximate seamless tiling.
    #[arg(long)]
    tile: bool,

    /// Edge wrap size in pixels (used with --tile).
    #[arg(long, default_value_t = tile::DEFAULT_WRAP)]
    wrap: u32,

    /// Output directory for the composited PNGs.
    #[arg(long, short, default_value = "out")]
    out_dir: PathBuf,

    /// Base name for output files; defaults to the atlas directory name.
    #[arg(long)]
    base_name: Option<String>,

    /// Print detected leaf bounds as JSON instead of a summary line.
    #[arg(long)]
    json: bool,
}

/// Read every regular file in the atlas directory, sorted by name so
/// batch order (and thus duplicate-layer resolution) is deterministic.
fn read_source_files(dir: &Path) -> Result<Vec<SourceFile>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Error reading {}: {e}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let bytes =
            std::fs::read(&path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        files.push(SourceFile::new(name, bytes));
    }
    Ok(files)
}

fn run(cli: &Cli) -> Result<(), String> {
    let files = read_source_files(&cli.atlas_dir)?;
    let base_name = cli.base_name.clone().unwrap_or_else(|| {
        cli.atlas_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("atlas")
            .to_owned()
    });

    let mut session = EditSession::new(cli.output_size, cli.padding);
    session.set_detect_params(DetectParams::new(cli.threshold, cli.min_area));
    log::debug!("read {} files from {}", files.len(), cli.atlas_dir.display());
    session
        .load_atlas(&base_name, &files)
        .map_err(|e| format!("Load failed: {e}"))?;

    if cli.json {
        let json = serde_json::to_string_pretty(session.leaves())
            .map_err(|e| format!("Error serializing leaf bounds: {e}"))?;
        println!("{json}");
    } else {
        println!(
            "{}: {} layers, {} leaves",
            base_name,
            session.atlas().map_or(0, frond_pipeline::AtlasModel::layer_count),
            session.leaves().len(),
        );
    }

    session.place_all_detected();

    let mut rendered = render_all(&mut session);
    if cli.tile {
        for (_, buffer) in &mut rendered {
            *buffer = blend_edges(buffer, cli.wrap);
        }
    }

    let mut sink = DirectorySink::new(&cli.out_dir);
    let report = save_local(&rendered, &base_name, &mut sink);
    log::info!(
        "saved {} of {} layers to {}",
        report.saved.len(),
        rendered.len(),
        cli.out_dir.display(),
    );
    for layer in &report.saved {
        println!(
            "wrote {}",
            cli.out_dir
                .join(frond_export::export_file_name(&base_name, *layer))
                .display(),
        );
    }
    if report.is_complete() {
        Ok(())
    } else {
        let failures: Vec<String> = report
            .failed
            .iter()
            .map(|(layer, err)| format!("{layer}: {err}"))
            .collect();
        Err(format!("Some layers failed to save: {}", failures.join("; ")))
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
