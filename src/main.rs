use clap::{Parser, Subcommand};
use pixelcraft::batch::{self, BatchRequest, BatchRun, OutputNaming, SuffixNaming};
use pixelcraft::codec::{ImageCodec, RustCodec};
use pixelcraft::config::{self, AppConfig};
use pixelcraft::filters::FilterKind;
use pixelcraft::output;
use pixelcraft::similarity::{Sensitivity, similarity_score};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pixelcraft")]
#[command(about = "Grayscale image filters, similarity scoring and batch processing")]
#[command(long_about = "\
Grayscale image filters, similarity scoring and batch processing

Every image is loaded as grayscale and resized to the canonical size
(450x450 unless configured otherwise) before filtering.

Filters:
  average     5x5 box blur
  sharpen     3x3 sharpen kernel
  negative    255 - x
  laplacian   3x3 Laplacian edge detector
  logarithm   ln(1 + x) thresholded to a binary image

Similarity is the percentage of samples that differ by at most
round(255 / sensitivity). A larger sensitivity is stricter.

Outputs are named {stem}_{filter}{ext} inside the output directory.

Run 'pixelcraft gen-config' to generate a documented pixelcraft.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Filter/output flags shared by `apply` and `batch`.
#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Filter name (average, sharpen, negative, laplacian, logarithm)
    #[arg(long, short)]
    filter: Option<String>,

    /// Output directory (created if absent)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Also report how similar each result is to its source
    #[arg(long)]
    similarity: bool,

    /// Sensitivity for the similarity readout
    #[arg(long, short)]
    sensitivity: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Filter a single image
    Apply {
        /// Source image
        input: PathBuf,

        #[command(flatten)]
        args: FilterArgs,

        /// Exact output path (overrides --output naming)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Score how similar two images are
    Compare {
        original: PathBuf,
        candidate: PathBuf,

        /// Sensitivity: tolerance is round(255 / sensitivity)
        #[arg(long, short)]
        sensitivity: Option<u32>,
    },
    /// Filter many images (files and/or directories) in order
    Batch {
        /// Source images or directories of images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        args: FilterArgs,

        /// Write final per-item statuses as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print a stock pixelcraft.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Apply { input, args, out } => {
            let (app_config, codec) = setup(&cli.config)?;
            run_apply(&codec, &app_config, &input, &args, out)?;
        }
        Command::Compare {
            original,
            candidate,
            sensitivity,
        } => {
            let (app_config, codec) = setup(&cli.config)?;
            let sensitivity = Sensitivity::new(
                sensitivity.unwrap_or(app_config.filters.default_sensitivity),
            )?;
            let left = codec.load(&original)?;
            let right = codec.load(&candidate)?;
            let score = similarity_score(&left, &right, sensitivity)?;
            output::print_compare_output(&original, &candidate, score, sensitivity);
        }
        Command::Batch {
            inputs,
            args,
            report,
        } => {
            let (app_config, codec) = setup(&cli.config)?;
            run_batch(codec, &app_config, inputs, &args, report.as_deref())?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config, size the thread pool, and build the codec it describes.
fn setup(config_path: &Path) -> Result<(AppConfig, RustCodec), config::ConfigError> {
    let app_config = config::load_config(config_path)?;
    init_thread_pool(&app_config.processing);
    let [width, height] = app_config.processing.canonical_size;
    Ok((app_config, RustCodec::with_canonical_size(width, height)))
}

fn run_apply(
    codec: &RustCodec,
    app_config: &AppConfig,
    input: &Path,
    args: &FilterArgs,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter: FilterKind = resolve_filter_name(args, app_config).parse()?;
    let sensitivity = Sensitivity::new(
        args.sensitivity
            .unwrap_or(app_config.filters.default_sensitivity),
    )?;
    let output_path = out.unwrap_or_else(|| {
        let dir = resolve_output_dir(args, app_config);
        SuffixNaming.output_path(input, filter, &dir)
    });

    let original = codec.load(input)?;
    let filtered = filter.apply(&original)?;
    codec.save(&filtered, &output_path)?;

    let similarity = if args.similarity {
        Some((similarity_score(&original, &filtered, sensitivity)?, sensitivity))
    } else {
        None
    };
    output::print_apply_output(input, &output_path, filter, similarity);
    Ok(())
}

fn run_batch(
    codec: RustCodec,
    app_config: &AppConfig,
    inputs: Vec<PathBuf>,
    args: &FilterArgs,
    report: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = BatchRequest {
        inputs,
        filter_name: resolve_filter_name(args, app_config).to_string(),
        sensitivity: args
            .sensitivity
            .unwrap_or(app_config.filters.default_sensitivity),
        output_dir: resolve_output_dir(args, app_config),
        score_similarity: args.similarity,
    };
    let run = BatchRun::prepare(&request)?;

    let handle = batch::spawn(run, codec);
    for event in handle.events() {
        output::print_batch_event(&event);
    }
    let run = handle.wait()?;

    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&run)?;
        std::fs::write(report_path, json)?;
        tracing::info!(path = %report_path.display(), "wrote batch report");
    }
    Ok(())
}

fn resolve_filter_name<'a>(args: &'a FilterArgs, app_config: &'a AppConfig) -> &'a str {
    args.filter
        .as_deref()
        .unwrap_or(&app_config.filters.default_filter)
}

fn resolve_output_dir(args: &FilterArgs, app_config: &AppConfig) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| app_config.output.directory.clone())
}

/// Diagnostics go to stderr; `--debug` lowers the default level.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
