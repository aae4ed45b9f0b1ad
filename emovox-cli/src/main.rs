#![deny(warnings)]

mod presenter;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use emovox_core::audio::capture::MicSource;
use emovox_core::{AudioConfig, LiveConfig, LiveDetector, ModelArtifact, Predictor};

/// Directories scanned for demo audio when no path is given.
const SAMPLE_DIRS: &[&str] = &["samples", "test_samples", "data/test", "demo_samples"];

#[derive(Parser, Debug)]
#[command(name = "emovox")]
#[command(about = "Speech emotion recognition from WAV files or the microphone")]
struct Args {
    /// A .wav file or a directory of .wav files to classify.
    path: Option<PathBuf>,

    /// Classifier artifact (JSON export).
    #[arg(long, default_value = "artifacts/svm_model.json")]
    model: PathBuf,

    /// Feature scaler artifact (JSON export).
    #[arg(long, default_value = "artifacts/standard_scaler.json")]
    scaler: PathBuf,

    /// Record from the default microphone instead of reading files.
    #[arg(long)]
    live: bool,

    /// Keep recording and classifying until interrupted (implies --live).
    #[arg(long)]
    continuous: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let artifact = ModelArtifact::load(&args.model, &args.scaler)?;
    let predictor = Predictor::new(artifact, AudioConfig::default());

    tracing::info!(
        live = args.live,
        continuous = args.continuous,
        "emovox ready"
    );

    if args.live || args.continuous {
        return run_live(predictor, args.continuous);
    }

    match args.path {
        Some(path) => classify_path(&predictor, &path),
        None => {
            if let Some(dir) = find_sample_dir() {
                println!("no path given; using {}", dir.display());
                run_directory(&predictor, &dir)?;
            }
            run_interactive(&predictor)
        }
    }
}

/// Dispatch a user-supplied path: directories run as a batch, everything
/// else as a single file.
fn classify_path(predictor: &Predictor, path: &Path) -> anyhow::Result<()> {
    if path.is_dir() {
        run_directory(predictor, path)
    } else {
        run_file(predictor, path)
    }
}

fn run_file(predictor: &Predictor, path: &Path) -> anyhow::Result<()> {
    let result = predictor.predict_file(path)?;
    presenter::print_result(&result);
    Ok(())
}

fn run_directory(predictor: &Predictor, dir: &Path) -> anyhow::Result<()> {
    let wavs = collect_wavs(dir)?;
    if wavs.is_empty() {
        anyhow::bail!("no .wav files in {}", dir.display());
    }

    let total = wavs.len();
    let refs: Vec<&Path> = wavs.iter().map(|p| p.as_path()).collect();
    let results = predictor.predict_all(&refs);

    let mut classified = 0usize;
    for (i, (path, result)) in wavs.iter().zip(&results).enumerate() {
        println!(
            "[{}/{}] {}",
            i + 1,
            total,
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        match result {
            Some(result) => {
                presenter::print_result(result);
                classified += 1;
            }
            None => eprintln!("  failed (see log for details)"),
        }
    }

    println!("{classified}/{total} files classified");
    Ok(())
}

fn run_live(predictor: Predictor, continuous: bool) -> anyhow::Result<()> {
    let source = MicSource::open()?;
    let config = LiveConfig::default();
    let duration = config.audio.duration_secs;
    let mut detector = LiveDetector::new(predictor, Box::new(source), config);

    if continuous {
        println!("listening — {duration} s windows, press Ctrl-C to stop");
        detector.run_continuous(|result, history| {
            presenter::print_result(result);
            presenter::print_history(history);
        })?;
    } else {
        println!("recording {duration} s...");
        match detector.run_single()? {
            Some(result) => presenter::print_result(&result),
            None => println!("no speech detected (recording below silence threshold)"),
        }
    }

    Ok(())
}

fn run_interactive(predictor: &Predictor) -> anyhow::Result<()> {
    println!("enter a path to a .wav file (q to quit)");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "q" | "quit" | "exit") {
            break;
        }

        if let Err(e) = classify_path(predictor, Path::new(input)) {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}

/// First candidate directory that actually contains WAV files.
fn find_sample_dir() -> Option<PathBuf> {
    SAMPLE_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|dir| matches!(collect_wavs(dir), Ok(wavs) if !wavs.is_empty()))
}

fn collect_wavs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?;

    let mut wavs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    wavs.sort();
    Ok(wavs)
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emovox_core::features::BASE_FEATURES;
    use emovox_core::model::{ClassifierModel, FeatureScaler, ModelArtifact};
    use std::f32::consts::PI;

    struct FixedModel;

    impl ClassifierModel for FixedModel {
        fn predict(&self, _features: &[f64]) -> i64 {
            1
        }
        fn predict_proba(&self, _features: &[f64]) -> Option<Vec<f64>> {
            None
        }
        fn classes(&self) -> &[i64] {
            &[1]
        }
    }

    fn predictor() -> Predictor {
        let scaler = FeatureScaler {
            mean: vec![0.0; BASE_FEATURES],
            scale: vec![1.0; BASE_FEATURES],
        };
        Predictor::new(
            ModelArtifact::from_parts(scaler, Box::new(FixedModel)),
            AudioConfig::default(),
        )
    }

    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..22_050 {
            let v =
                (0.5 * (2.0 * PI * 440.0 * i as f32 / 22_050.0).sin() * i16::MAX as f32) as i16;
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn classify_path_runs_directories_as_a_batch() {
        let dir = std::env::temp_dir().join("emovox_cli_dir_input");
        std::fs::create_dir_all(&dir).unwrap();
        write_wav(&dir.join("sample.wav"));

        // A directory path (as typed at the interactive prompt) must batch,
        // not fall into single-file decoding.
        classify_path(&predictor(), &dir).unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn classify_path_handles_single_files_and_missing_paths() {
        let dir = std::env::temp_dir();
        let wav = dir.join("emovox_cli_file_input.wav");
        write_wav(&wav);

        classify_path(&predictor(), &wav).unwrap();
        assert!(classify_path(&predictor(), Path::new("/no/such/file.wav")).is_err());

        std::fs::remove_file(&wav).ok();
    }
}
