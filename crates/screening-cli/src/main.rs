//! Cardiac risk screening CLI - scores retinal fundus images with an ONNX classifier.
//!
//! Usage:
//!   cardio-screen assess eye.png --model cardiac_risk_model.onnx --report report.txt
//!   cardio-screen batch images/ --model cardiac_risk_model.onnx --format json
//!   cardio-screen split original_dataset/gaussian_filtered_images Dataset --seed 42

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use screening_core::inference::RiskModel;
use screening_core::report::{
    existing_heatmap, print_results, render_assessment, write_report, OutputFormat,
};
use screening_core::screen::{assess, run_batch};
use screening_core::split::{load_split_config, split_dataset, Split, SplitConfig};

const DEFAULT_MODEL: &str = "cardiac_risk_model.onnx";

#[derive(Parser)]
#[command(name = "cardio-screen", version)]
#[command(about = "Retinal image cardiac risk screening")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a single retinal fundus image
    Assess {
        /// JPEG or PNG image
        image: PathBuf,

        /// Path to the ONNX model file
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: PathBuf,

        /// Write the plain-text report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Pre-generated attention heatmap to reference alongside the result
        #[arg(long)]
        heatmap: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Screen many images (files or directories), one after another
    Batch {
        /// Paths to screen (files or directories)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Path to the ONNX model file
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Split a class-labelled image tree into Train/Val/Test folders
    Split {
        /// Directory holding one subfolder per source class
        source: PathBuf,

        /// Destination root for Train/Val/Test
        target: PathBuf,

        /// JSON file overriding the class mapping and seed
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Shuffle seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assess {
            image,
            model,
            report,
            heatmap,
            format,
        } => run_assess(&image, &model, report.as_deref(), heatmap.as_deref(), format),
        Commands::Batch {
            paths,
            model,
            format,
        } => run_batch_command(&paths, &model, format),
        Commands::Split {
            source,
            target,
            config,
            seed,
        } => run_split(&source, &target, config.as_deref(), seed),
    }
}

fn load_model(path: &Path) -> Result<RiskModel> {
    log::info!("loading model from {}", path.display());
    RiskModel::load(path)
}

fn run_assess(
    image: &Path,
    model: &Path,
    report: Option<&Path>,
    heatmap: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let model = load_model(model)?;

    let assessment = assess(&model, image)?;

    let heatmap = existing_heatmap(heatmap);
    println!("{}", render_assessment(image, &assessment, heatmap, format));

    if let Some(report_path) = report {
        write_report(report_path, &assessment, &chrono::Local::now().naive_local())?;
    }

    Ok(())
}

fn run_batch_command(paths: &[PathBuf], model: &Path, format: OutputFormat) -> Result<()> {
    let model = load_model(model)?;

    log::info!("screening...");
    let results = run_batch(&model, paths);
    log::info!("screened {} images", results.len());

    // JSON callers always get a document, even an empty one.
    if results.is_empty() && format == OutputFormat::Text {
        log::info!("no images to screen");
        return Ok(());
    }

    print_results(&results, format);

    Ok(())
}

fn run_split(source: &Path, target: &Path, config: Option<&Path>, seed: Option<u64>) -> Result<()> {
    let mut config = match config {
        Some(path) => load_split_config(path)?,
        None => SplitConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }

    log::info!(
        "splitting {} into {} (seed {})",
        source.display(),
        target.display(),
        config.seed
    );
    let summary = split_dataset(source, target, &config)?;

    println!("{:<6} {:>9} {:>10}", "SPLIT", "LOW_RISK", "HIGH_RISK");
    for split in Split::ALL {
        let counts = summary.get(split);
        println!(
            "{:<6} {:>9} {:>10}",
            split.dir_name(),
            counts.low_risk,
            counts.high_risk
        );
    }
    println!("Total images copied: {}", summary.total());
    if !summary.skipped_classes.is_empty() {
        println!("Missing classes:     {}", summary.skipped_classes.join(", "));
    }

    Ok(())
}
