use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bathyfit::config::{
    from_json_file, AlignmentConfig, AnalysisConfig, ClipRange, GrayscaleConfig, PipelineConfig,
    ReprojectConfig, VisualizeConfig,
};
use bathyfit::core::{
    run_alignment_check, run_analysis, run_grayscale, run_reproject, run_visualize,
};

#[derive(Parser, Debug)]
#[command(
    name = "bathyfit",
    about = "Align, reproject and evaluate satellite-derived bathymetry rasters",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare CRS, geotransform and shape of two rasters
    Check {
        /// JSON configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        candidate: Option<PathBuf>,
    },

    /// Resample a band onto the pixel grid of a reference raster
    Reproject {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Sentinel for output pixels without source coverage
        #[arg(long, allow_hyphen_values = true)]
        nodata: Option<f32>,
        /// 1-based band of the source raster
        #[arg(long)]
        band: Option<usize>,
    },

    /// Contrast-stretch raster bands into an 8-bit image
    Visualize {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f32>,
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f32>,
        /// Comma-separated 1-based band order, e.g. 3,2,1
        #[arg(long, value_delimiter = ',')]
        bands: Option<Vec<usize>>,
    },

    /// Convert an image to grayscale at the pixel size of a template raster
    Grayscale {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        template: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a predicted depth raster against ground truth
    Analyze {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        predicted: Option<PathBuf>,
        #[arg(long)]
        truth: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// TrueType font for plot titles and labels
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Run every step present in one JSON configuration, in order
    Pipeline {
        #[arg(long)]
        config: PathBuf,
    },
}

fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(T::default()),
    }
}

fn check(config: &AlignmentConfig) -> Result<()> {
    let report = run_alignment_check(config)?;
    println!("{}", report);
    Ok(())
}

fn reproject(config: &ReprojectConfig) -> Result<()> {
    let stats = run_reproject(config)?;
    println!(
        "Reprojection finished: {} of {} pixels valid ({:.1}%)",
        stats.valid_pixels,
        stats.total_pixels,
        stats.coverage_percent()
    );
    Ok(())
}

fn visualize(config: &VisualizeConfig) -> Result<()> {
    run_visualize(config)?;
    println!("Image saved to {}", config.output.display());
    Ok(())
}

fn grayscale(config: &GrayscaleConfig) -> Result<()> {
    let img = run_grayscale(config)?;
    println!(
        "Grayscale image ({} x {}) saved to {}",
        img.width(),
        img.height(),
        config.output.display()
    );
    Ok(())
}

fn analyze(config: &AnalysisConfig) -> Result<()> {
    let report = run_analysis(config)?;
    println!("Pearson R: {:.4}", report.pearson_r);
    println!("RMSE: {:.4} m", report.rmse);
    println!("Results written to {}", config.output_dir.display());
    Ok(())
}

fn pipeline(config: &PipelineConfig) -> Result<()> {
    if let Some(step) = &config.alignment {
        check(step).context("Alignment check failed")?;
    }
    if let Some(step) = &config.reproject {
        reproject(step).context("Reprojection failed")?;
    }
    if let Some(step) = &config.visualize {
        visualize(step).context("Visualization failed")?;
    }
    if let Some(step) = &config.grayscale {
        grayscale(step).context("Grayscale conversion failed")?;
    }
    if let Some(step) = &config.analysis {
        analyze(step).context("Accuracy analysis failed")?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Check {
            config,
            reference,
            candidate,
        } => {
            let mut cfg: AlignmentConfig = load_or_default(config.as_deref())?;
            if let Some(path) = reference {
                cfg.reference = path;
            }
            if let Some(path) = candidate {
                cfg.candidate = path;
            }
            check(&cfg)
        }
        Command::Reproject {
            config,
            reference,
            source,
            output,
            nodata,
            band,
        } => {
            let mut cfg: ReprojectConfig = load_or_default(config.as_deref())?;
            if let Some(path) = reference {
                cfg.reference = path;
            }
            if let Some(path) = source {
                cfg.source = path;
            }
            if let Some(path) = output {
                cfg.output = path;
            }
            if let Some(value) = nodata {
                cfg.nodata = value;
            }
            if let Some(index) = band {
                cfg.source_band = index;
            }
            reproject(&cfg)
        }
        Command::Visualize {
            config,
            input,
            output,
            min,
            max,
            bands,
        } => {
            let mut cfg: VisualizeConfig = load_or_default(config.as_deref())?;
            if let Some(path) = input {
                cfg.input = path;
            }
            if let Some(path) = output {
                cfg.output = path;
            }
            cfg.range = ClipRange::new(min.unwrap_or(cfg.range.min), max.unwrap_or(cfg.range.max))?;
            if let Some(order) = bands {
                cfg.bands = order;
            }
            visualize(&cfg)
        }
        Command::Grayscale {
            config,
            image,
            template,
            output,
        } => {
            let mut cfg: GrayscaleConfig = load_or_default(config.as_deref())?;
            if let Some(path) = image {
                cfg.image = path;
            }
            if let Some(path) = template {
                cfg.template = path;
            }
            if let Some(path) = output {
                cfg.output = path;
            }
            grayscale(&cfg)
        }
        Command::Analyze {
            config,
            predicted,
            truth,
            output_dir,
            font,
        } => {
            let mut cfg: AnalysisConfig = load_or_default(config.as_deref())?;
            if let Some(path) = predicted {
                cfg.predicted = path;
            }
            if let Some(path) = truth {
                cfg.truth = path;
            }
            if let Some(path) = output_dir {
                cfg.output_dir = path;
            }
            if font.is_some() {
                cfg.font = font;
            }
            analyze(&cfg)
        }
        Command::Pipeline { config } => {
            let cfg: PipelineConfig = load_or_default(Some(&config))?;
            pipeline(&cfg)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
