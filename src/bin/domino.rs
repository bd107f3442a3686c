use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use domino_rs::{
    read_phoneme_file, AlignerConfig, AlignmentInput, AlignmentOutput, ForcedAligner,
    ForcedAlignerBuilder,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[path = "domino/audio.rs"]
mod audio;
#[path = "domino/json_formatter.rs"]
mod json_formatter;
#[path = "domino/lab_formatter.rs"]
mod lab_formatter;
#[path = "domino/text_grid_formatter.rs"]
mod text_grid_formatter;

const DEFAULT_MODEL_PATH: &str = "onnx_model/phoneme_transition_model.onnx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Lab,
    #[value(name = "textgrid")]
    TextGrid,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::TextGrid => "TextGrid",
            Self::Json => "json",
        }
    }
}

/// Align Japanese phoneme sequences to speech recordings.
#[derive(Debug, Parser)]
#[command(name = "domino", version)]
struct Args {
    /// WAV file, or a directory of WAV files with sibling `.txt` phoneme files.
    #[arg(long, alias = "input_path", env = "DOMINO_INPUT_PATH")]
    input_path: PathBuf,
    /// Output file (single input) or output directory (directory input).
    #[arg(long, alias = "output_path", env = "DOMINO_OUTPUT_PATH")]
    output_path: Option<PathBuf>,
    /// Phoneme file for a single input; defaults to the WAV's sibling `.txt`.
    #[arg(
        long,
        alias = "input_phoneme",
        env = "DOMINO_INPUT_PHONEME",
        conflicts_with = "phonemes"
    )]
    input_phoneme: Option<PathBuf>,
    /// Inline phoneme text for a single input, e.g. "d o w a N g o".
    #[arg(long)]
    phonemes: Option<String>,
    /// Minimum frames assigned to each phoneme.
    #[arg(short = 'N', long = "min-frame", alias = "min_frame", env = "DOMINO_MIN_FRAME")]
    min_frame: Option<usize>,
    #[arg(long, alias = "model_path", env = "DOMINO_MODEL_PATH")]
    model_path: Option<String>,
    /// JSON aligner config; command-line flags override its fields.
    #[arg(long, env = "DOMINO_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "DOMINO_DEVICE")]
    device: Option<String>,
    #[arg(
        long,
        alias = "output_format",
        env = "DOMINO_OUTPUT_FORMAT",
        value_enum,
        default_value_t = OutputFormat::Lab
    )]
    output_format: OutputFormat,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    let aligner = ForcedAlignerBuilder::new(config)
        .build()
        .map_err(|err| format!("Failed to build aligner: {err}"))?;

    if args.input_path.is_dir() {
        run_directory(&aligner, &args)
    } else if is_wav(&args.input_path) {
        let phonemes = match (&args.phonemes, &args.input_phoneme) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => read_phoneme_file(path).map_err(|err| err.to_string())?,
            (None, None) => read_phoneme_file(&args.input_path.with_extension("txt"))
                .map_err(|err| err.to_string())?,
        };
        let out_path = args
            .output_path
            .clone()
            .unwrap_or_else(|| args.input_path.with_extension(args.output_format.extension()));
        align_file(
            &aligner,
            &args.input_path,
            phonemes,
            &out_path,
            args.output_format,
        )
    } else {
        Err(format!("invalid input path: {}", args.input_path.display()))
    }
}

fn resolve_config(args: &Args) -> Result<AlignerConfig, String> {
    let mut config = match &args.config {
        Some(path) => AlignerConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => AlignerConfig::default(),
    };
    if let Some(model_path) = &args.model_path {
        config.model_path = model_path.clone();
    }
    if config.model_path.is_empty() {
        config.model_path = DEFAULT_MODEL_PATH.to_string();
    }
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(min_frame) = args.min_frame {
        config.min_frames_per_phoneme = min_frame;
    }
    Ok(config)
}

fn run_directory(aligner: &ForcedAligner, args: &Args) -> Result<(), String> {
    let mut wav_files = fs::read_dir(&args.input_path)
        .map_err(|err| format!("Failed to list '{}': {err}", args.input_path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_wav(path))
        .collect::<Vec<_>>();
    wav_files.sort();

    let progress = ProgressBar::new(wav_files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );

    let extension = args.output_format.extension();
    let mut failures = 0usize;
    for wav_path in &wav_files {
        let name = wav_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.set_message(name);

        let default_out = wav_path.with_extension(extension);
        let out_path = match (&args.output_path, default_out.file_name()) {
            (Some(dir), Some(file_name)) => dir.join(file_name),
            _ => default_out.clone(),
        };
        let result = read_phoneme_file(&wav_path.with_extension("txt"))
            .map_err(|err| err.to_string())
            .and_then(|phonemes| {
                align_file(aligner, wav_path, phonemes, &out_path, args.output_format)
            });
        if let Err(err) = result {
            failures += 1;
            progress.suspend(|| tracing::error!(file = %wav_path.display(), "{err}"));
        }
        progress.inc(1);
    }
    progress.finish_with_message("alignment pass complete");

    tracing::info!(
        files = wav_files.len(),
        failures,
        "directory alignment finished"
    );
    if failures > 0 {
        return Err(format!("{failures} of {} files failed", wav_files.len()));
    }
    Ok(())
}

fn align_file(
    aligner: &ForcedAligner,
    wav_path: &Path,
    phonemes: String,
    out_path: &Path,
    format: OutputFormat,
) -> Result<(), String> {
    let (sample_rate_hz, samples) = audio::read_wav_mono(wav_path)?;
    let duration_sec = if sample_rate_hz == 0 {
        0.0
    } else {
        samples.len() as f64 / f64::from(sample_rate_hz)
    };
    tracing::debug!(
        wav = %wav_path.display(),
        samples = samples.len(),
        sample_rate_hz,
        "loaded audio"
    );

    let input = AlignmentInput {
        sample_rate_hz,
        samples,
        phonemes,
        min_frames_per_phoneme: None,
    };
    let output = aligner
        .align(&input)
        .map_err(|err| format!("{}: alignment failed: {err}", wav_path.display()))?;
    write_output(out_path, &output, duration_sec, format)?;
    tracing::info!(out = %out_path.display(), phonemes = output.segments.len(), "wrote alignment");
    Ok(())
}

fn write_output(
    out_path: &Path,
    output: &AlignmentOutput,
    duration_sec: f64,
    format: OutputFormat,
) -> Result<(), String> {
    match format {
        OutputFormat::Lab => lab_formatter::write_lab(out_path, &output.segments),
        OutputFormat::TextGrid => {
            text_grid_formatter::write_textgrid(out_path, &output.segments, duration_sec)
        }
        OutputFormat::Json => json_formatter::write_json(out_path, output),
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}
