#![forbid(unsafe_code)]
//! # Chat Analysis CLI
//!
//! Command-line front end of the `chat_analysis` crate. It reads one chat
//! export (JSON), runs the mining pipeline and writes the report.
//!
//! ## Example
//! ```bash
//! RUST_LOG=info cargo run --release -- chat.json --export-format txt --top-n 50
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use chat_analysis::{
    AnalysisConfig, ExportFormat, JiebaSegmenter, MaxMatchSegmenter, Result, Segmenter,
    analyze_with, export_report, load_transcript,
};
use clap::{Parser, ValueEnum};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SegmenterKind {
    /// jieba dictionary segmentation with HMM for unknown words
    Jieba,
    /// jieba dictionary segmentation only
    JiebaNoHmm,
    /// Forward maximum matching over mined vocabulary only
    MaxMatch,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Chat export to analyze (.json)
    path: PathBuf,

    /// Optional JSON config; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of words kept in the final ranking
    #[arg(long)]
    top_n: Option<usize>,

    /// Seed for sample selection (reproducible output)
    #[arg(long)]
    seed: Option<u64>,

    /// Segmentation backend
    #[arg(long, value_enum, default_value = "jieba")]
    segmenter: SegmenterKind,

    /// Output format for export (json, csv, txt)
    #[arg(long, value_enum, default_value = "txt")]
    export_format: ExportFormat,

    /// Directory for exported files (default: current directory)
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut cfg = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(n) = cli.top_n {
        cfg.top_n = n;
    }
    if cli.seed.is_some() {
        cfg.sample_seed = cli.seed;
    }
    Ok(cfg)
}

fn run(cli: &Cli) -> Result<Vec<PathBuf>> {
    let cfg = load_config(cli)?;
    let transcript = load_transcript(&cli.path)?;

    let mut segmenter: Box<dyn Segmenter> = match cli.segmenter {
        SegmenterKind::Jieba => Box::new(JiebaSegmenter::new(true)),
        SegmenterKind::JiebaNoHmm => Box::new(JiebaSegmenter::new(false)),
        SegmenterKind::MaxMatch => Box::new(MaxMatchSegmenter::new()),
    };
    let mut rng = match cfg.sample_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = analyze_with(
        &transcript.messages,
        &transcript.chat_name,
        segmenter.as_mut(),
        &cfg,
        &mut rng,
    );
    info!(
        "{}: {} top words, {} new words, {} merged phrases",
        report.chat_name,
        report.top_words.len(),
        report.discovered_words.len(),
        report.merged_words.len()
    );

    let stem = cli
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chat".to_string());
    export_report(&report, &stem, &cli.output_dir, cli.export_format)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(paths) => {
            for p in paths {
                println!("{}", p.display());
            }
        }
        Err(e) => {
            error!("Error analyzing {}: {}", cli.path.display(), e);
            process::exit(1);
        }
    }
}
