//! The `norwood analyze` command.
//!
//! Accepts a single image, a top+side image pair, or a directory of
//! images. Records stream to stdout or a file as JSON/JSONL.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use norwood_core::analysis::{FileDiscovery, ModelSlot, StageAnalyzer};
use norwood_core::embedding::EmbeddingEngine;
use norwood_core::llm::{ImageInput, LlmProviderFactory, LlmRequest, NarrateOptions, Narrator};
use norwood_core::types::{AnalysisRecord, AnalysisStats, PatientProfile};
use norwood_core::{Config, OutputFormat, OutputWriter};

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file or directory of images to analyze
    pub path: String,

    /// Side-view image for dual-view analysis (single file only)
    #[arg(long)]
    pub side: Option<String>,

    /// Patient age in years
    #[arg(long)]
    pub age: Option<u32>,

    /// Patient has a family history of hair loss
    #[arg(long)]
    pub family_history: bool,

    /// Generate an LLM narrative with this provider ("openai" or "gemini")
    #[arg(long)]
    pub llm: Option<String>,

    /// Override the LLM model name
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Attach the scalp image to the LLM request
    #[arg(long)]
    pub llm_image: bool,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format: json or jsonl
    #[arg(long)]
    pub format: Option<String>,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    let target = expand_path(&args.path);
    let side = args.side.as_deref().map(expand_path);

    let format_str = args
        .format
        .clone()
        .unwrap_or_else(|| config.output.format.clone());
    let format = OutputFormat::parse(&format_str)
        .with_context(|| format!("Unknown output format: {format_str}"))?;
    let pretty = config.output.pretty;

    let profile = PatientProfile {
        age: args.age,
        family_history: args.family_history.then_some(true),
    };

    let narrator = match &args.llm {
        Some(provider_name) => {
            let provider = LlmProviderFactory::create(
                provider_name,
                &config.llm,
                args.llm_model.as_deref(),
            )?;
            tracing::info!("Narratives enabled via {}", provider.name());
            Some(Narrator::new(
                provider,
                NarrateOptions {
                    timeout_ms: config.limits.llm_timeout_ms,
                    retry_attempts: config.retry.attempts,
                    retry_delay_ms: config.retry.delay_ms,
                },
            ))
        }
        None => None,
    };

    let mut records = if let Some(side_path) = side {
        if target.is_dir() {
            bail!("--side requires a single image file, not a directory");
        }
        vec![analyze_pair(&target, &side_path, &profile, &config).await?]
    } else if target.is_dir() {
        analyze_directory(&target, &profile, &config).await?
    } else {
        vec![analyze_one(&target, &profile, &config).await?]
    };

    // Narratives are attached after analysis so an LLM failure can never
    // lose a finished record.
    if let Some(narrator) = &narrator {
        for record in &mut records {
            attach_narrative(record, narrator, &config, args.llm_image).await;
        }
    }

    write_records(&records, args.output.as_deref(), format, pretty)?;
    Ok(())
}

/// Single image through the primary + secondary ensemble.
async fn analyze_one(
    path: &Path,
    profile: &PatientProfile,
    config: &Config,
) -> anyhow::Result<AnalysisRecord> {
    let (analyzer, primary, secondary) = build_single_view(config)?;
    let record = analyzer
        .analyze_single(path, profile, &primary, &secondary)
        .await?;
    report_prediction(&record);
    Ok(record)
}

/// Assemble the analyzer and both ensemble slots for single-view paths.
fn build_single_view(config: &Config) -> anyhow::Result<(StageAnalyzer, ModelSlot, ModelSlot)> {
    let primary_name = config.analysis.primary.as_str();
    let secondary_name = config.analysis.secondary.as_str();

    let engine = EmbeddingEngine::load(config, &[primary_name, secondary_name])?;
    let primary = ModelSlot::from_config(primary_name, primary_name, &engine, config)?;
    let secondary = ModelSlot::from_config(secondary_name, secondary_name, &engine, config)?;

    Ok((StageAnalyzer::new(config.clone()), primary, secondary))
}

/// Top + side pair through the view model with late fusion.
async fn analyze_pair(
    top_path: &Path,
    side_path: &Path,
    profile: &PatientProfile,
    config: &Config,
) -> anyhow::Result<AnalysisRecord> {
    let view_model = config.analysis.view_model.as_str();
    let engine = EmbeddingEngine::load(config, &[view_model])?;
    let top = ModelSlot::from_config(view_model, &format!("{view_model}_top"), &engine, config)?;
    let side = ModelSlot::from_config(view_model, &format!("{view_model}_side"), &engine, config)?;

    let analyzer = StageAnalyzer::new(config.clone());
    let record = analyzer
        .analyze_dual(top_path, side_path, profile, &top, &side)
        .await?;
    report_prediction(&record);
    Ok(record)
}

/// Every supported image in a directory, sequentially with progress.
async fn analyze_directory(
    dir: &Path,
    profile: &PatientProfile,
    config: &Config,
) -> anyhow::Result<Vec<AnalysisRecord>> {
    let discovery = FileDiscovery::new(config.processing.clone());
    let files = discovery.discover(dir);
    if files.is_empty() {
        bail!("No supported images found in {:?}", dir);
    }
    tracing::info!("Found {} images in {:?}", files.len(), dir);

    let (analyzer, primary, secondary) = build_single_view(config)?;

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let start = Instant::now();
    let mut records = Vec::with_capacity(files.len());
    let mut stats = AnalysisStats::default();

    for file in &files {
        bar.set_message(
            file.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        match analyzer
            .analyze_single(&file.path, profile, &primary, &secondary)
            .await
        {
            Ok(record) => {
                records.push(record);
                stats.succeeded += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to analyze {:?}: {e}", file.path);
                stats.failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    stats.total_seconds = start.elapsed().as_secs_f64();
    stats.images_per_second = if stats.total_seconds > 0.0 {
        stats.succeeded as f64 / stats.total_seconds
    } else {
        0.0
    };
    tracing::info!(
        "Analyzed {} images in {:.1}s ({:.2} img/s), {} failed",
        stats.succeeded,
        stats.total_seconds,
        stats.images_per_second,
        stats.failed
    );

    Ok(records)
}

/// Attach an LLM narrative to a record; failures log and move on.
async fn attach_narrative(
    record: &mut AnalysisRecord,
    narrator: &Narrator,
    config: &Config,
    with_image: bool,
) {
    let image = if with_image {
        match std::fs::read(&record.file_path) {
            Ok(bytes) => {
                let format = record
                    .file_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("jpeg");
                Some(ImageInput::from_bytes(&bytes, format))
            }
            Err(e) => {
                tracing::warn!("Cannot re-read image for narrative: {e}");
                None
            }
        }
    } else {
        None
    };

    let request = LlmRequest::explain_stage(
        &record.prediction,
        config.scoring.num_classes,
        record.profile.as_ref().unwrap_or(&PatientProfile::default()),
        image,
    );

    match narrator.narrate(&request).await {
        Ok(narrative) => record.narrative = Some(narrative),
        Err(e) => {
            tracing::warn!(
                "Narrative generation failed for {:?}: {e}",
                record.file_path
            );
        }
    }
}

fn report_prediction(record: &AnalysisRecord) {
    tracing::info!(
        "{:?}: stage {} (confidence {:.1}%)",
        record.file_path.file_name().unwrap_or_default(),
        record.prediction.stage,
        record.prediction.confidence * 100.0
    );
}

fn write_records(
    records: &[AnalysisRecord],
    output: Option<&str>,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let path = expand_path(path);
            let file = File::create(&path)
                .with_context(|| format!("Cannot create output file {:?}", path))?;
            let mut writer = OutputWriter::new(BufWriter::new(file), format, pretty);
            write_into(&mut writer, records)?;
            tracing::info!("Wrote {} record(s) to {:?}", records.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = OutputWriter::new(stdout.lock(), format, pretty);
            write_into(&mut writer, records)?;
        }
    }
    Ok(())
}

fn write_into<W: Write>(
    writer: &mut OutputWriter<W>,
    records: &[AnalysisRecord],
) -> anyhow::Result<()> {
    if records.len() == 1 {
        writer.write(&records[0])?;
    } else {
        writer.write_all(records)?;
    }
    writer.flush()?;
    Ok(())
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
