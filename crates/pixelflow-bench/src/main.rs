//! pixelflow-bench: CLI tool for running node-graph projects on image files.
//!
//! Loads a project document and a set of named images, evaluates the
//! project's main graph and prints per-node timings. Useful for:
//!
//! - Finding the slow nodes of a graph
//! - Checking what an incremental re-run actually recomputes
//! - Dumping every node preview and the viewer output as PNG files
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixelflow-bench -- [OPTIONS] <PROJECT_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use pixelflow_engine::{
    CancelToken, CatalogImage, Engine, EngineConfig, MemoryGlobals, Previews, ProgressMonitor,
    Project, decode_catalog_image, render_preview, render_viewer,
};

/// Node-graph evaluation and timing for pixelflow.
///
/// Evaluates the main graph of a project document against named images
/// and prints how long each node took.
#[derive(Parser)]
#[command(name = "pixelflow-bench", version)]
struct Cli {
    /// Path to the project document (JSON).
    project_path: PathBuf,

    /// Catalog image as `name=path` (PNG, JPEG, BMP, WebP). Repeatable.
    #[arg(long = "image", value_parser = parse_image_arg)]
    images: Vec<(String, PathBuf)>,

    /// Maximum nesting of local-function calls.
    #[arg(long, default_value_t = pixelflow_engine::config::DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: u32,

    /// Blobs shorter than this many pixels are noise.
    #[arg(long)]
    max_noise_size: Option<i32>,

    /// Blob width limit as a multiple of the estimated x-height.
    #[arg(long)]
    width_limit: Option<f64>,

    /// Number of runs.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Start every run from a fresh engine instead of re-running
    /// incrementally.
    #[arg(long)]
    fresh: bool,

    /// Write node previews and the viewer image as PNG files here.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Output timings as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other engine parameter flags are ignored.
    #[arg(long)]
    config_json: Option<String>,
}

fn parse_image_arg(arg: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=path, got '{arg}'"))?;
    if name.is_empty() {
        return Err(format!("missing image name in '{arg}'"));
    }
    Ok((name.to_owned(), PathBuf::from(path)))
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = EngineConfig {
        max_call_depth: cli.max_call_depth,
        ..EngineConfig::default()
    };
    if let Some(size) = cli.max_noise_size {
        config.block_options.max_noise_size = size;
    }
    if let Some(limit) = cli.width_limit {
        config.block_options.width_limit = limit;
    }
    Ok(config)
}

fn load_catalog(images: &[(String, PathBuf)]) -> Result<Vec<CatalogImage>, String> {
    images
        .iter()
        .map(|(name, path)| {
            let bytes =
                std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            let image = decode_catalog_image(name, &bytes)
                .map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
            eprintln!(
                "Image '{name}': {} ({}x{})",
                path.display(),
                image.data.width(),
                image.data.height()
            );
            Ok(image)
        })
        .collect()
}

/// Records how long each node took, from the progress calls bracketing it.
#[derive(Default)]
struct NodeTimer {
    started: Option<(String, Instant)>,
    timings: Vec<(String, Duration)>,
}

impl ProgressMonitor for NodeTimer {
    fn start(&mut self) {
        self.started = None;
        self.timings.clear();
    }

    fn progress(&mut self, amount: f64, message: &str) {
        log::trace!("{:>5.1}% {message}", amount * 100.0);
        match self.started.take() {
            None => self.started = Some((message.to_owned(), Instant::now())),
            Some((label, since)) => self.timings.push((label, since.elapsed())),
        }
    }

    fn end(&mut self) {}
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let project = match std::fs::read_to_string(&cli.project_path)
        .map_err(|e| e.to_string())
        .and_then(|json| Project::from_json(&json).map_err(|e| e.to_string()))
    {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error loading {}: {e}", cli.project_path.display());
            return ExitCode::FAILURE;
        }
    };

    let catalog = match load_catalog(&cli.images) {
        Ok(catalog) => catalog,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Project: {} ({} graphs)",
        cli.project_path.display(),
        project.graphs.len()
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut globals = MemoryGlobals::new(catalog);
    let mut engine = Engine::new(config.clone());
    let mut totals = Vec::with_capacity(cli.runs);
    let mut previews = Previews::new();

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }
        if cli.fresh {
            engine = Engine::new(config.clone());
        }

        let mut timer = NodeTimer::default();
        let start = Instant::now();
        match engine.update(&project, &mut globals, &mut timer, &CancelToken::new()) {
            Ok(p) => previews = p,
            Err(e) => {
                eprintln!("Engine error: {e}");
                return ExitCode::FAILURE;
            }
        }
        let total = start.elapsed();
        totals.push(total);

        if cli.json {
            let nodes: Vec<_> = timer
                .timings
                .iter()
                .map(|(label, d)| {
                    serde_json::json!({"node": label, "ms": d.as_secs_f64() * 1000.0})
                })
                .collect();
            let report = serde_json::json!({
                "run": run + 1,
                "total_ms": total.as_secs_f64() * 1000.0,
                "evaluated": engine.last_evaluated(),
                "nodes": nodes,
            });
            println!("{report}");
        } else {
            print_report(&engine, &timer, total);
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&totals);
    }

    if let Some(ref dir) = cli.out_dir
        && let Err(e) = write_outputs(dir, &previews, &globals)
    {
        eprintln!("Error writing outputs to {}: {e}", dir.display());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn print_report(engine: &Engine, timer: &NodeTimer, total: Duration) {
    let order: Vec<&str> = engine.evaluation_order().collect();
    println!("{:<24} {:<24} {:>12}", "Node", "Label", "Time (ms)");
    println!("{}", "-".repeat(62));
    for (id, (label, duration)) in order.iter().zip(&timer.timings) {
        let mark = if engine.last_evaluated().iter().any(|e| e.as_str() == *id) {
            ""
        } else {
            " (cached)"
        };
        println!(
            "{id:<24} {label:<24} {:>10.3}ms{mark}",
            duration.as_secs_f64() * 1000.0
        );
    }
    println!("{}", "-".repeat(62));
    println!(
        "{:<49} {:>10.3}ms ({} of {} nodes evaluated)",
        "Total",
        total.as_secs_f64() * 1000.0,
        engine.last_evaluated().len(),
        order.len()
    );
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(totals: &[Duration]) {
    let durations: Vec<f64> = totals.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    if durations.is_empty() {
        return;
    }
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!();
    println!("Summary ({} runs)\n{}", durations.len(), "=".repeat(60));
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
}

/// Write one PNG per preview, named after its node, plus `viewer.png`.
fn write_outputs(
    dir: &Path,
    previews: &Previews,
    globals: &MemoryGlobals,
) -> image::ImageResult<()> {
    std::fs::create_dir_all(dir)?;
    for (node, preview) in previews {
        let name: String = node
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.join(format!("{name}.png"));
        render_preview(preview).save(&path)?;
        eprintln!("{} preview written to {}", preview.tag(), path.display());
    }
    if let Some(ref viewer) = globals.viewer {
        let path = dir.join("viewer.png");
        render_viewer(viewer).save(&path)?;
        eprintln!("Viewer written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_args_split_on_first_equals() {
        assert_eq!(
            parse_image_arg("page=scans/a=b.png"),
            Ok(("page".to_owned(), PathBuf::from("scans/a=b.png")))
        );
        assert!(parse_image_arg("page.png").is_err());
        assert!(parse_image_arg("=page.png").is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::parse_from([
            "pixelflow-bench",
            "project.json",
            "--max-call-depth",
            "2",
            "--config-json",
            r#"{"max_call_depth": 5}"#,
        ]);
        assert_eq!(config_from_cli(&cli).map(|c| c.max_call_depth), Ok(5));
    }

    #[test]
    fn flags_override_block_options() {
        let cli = Cli::parse_from(["pixelflow-bench", "project.json", "--max-noise-size", "3"]);
        let config = config_from_cli(&cli).map(|c| c.block_options.max_noise_size);
        assert_eq!(config, Ok(3));
    }
}
