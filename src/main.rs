use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use wakestream::cli::{Cli, Commands};
use wakestream::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Scan {
            ref wav,
            ref model_dir,
            threshold,
        } => {
            let mut config = config;
            if let Some(dir) = model_dir {
                config.wakeword.model_dir = Some(dir.clone());
            }
            if let Some(threshold) = threshold {
                config.wakeword.threshold = threshold;
            }
            run_scan(&config, wav, cli.quiet, cli.verbose)
        }
        Commands::Listen {
            ref device,
            ref model_dir,
            duration,
        } => {
            let mut config = config;
            if let Some(device) = device {
                config.audio.device = Some(device.clone());
            }
            if let Some(dir) = model_dir {
                config.wakeword.model_dir = Some(dir.clone());
            }
            run_listen(&config, duration, cli.quiet, cli.verbose)
        }
        Commands::Devices => list_audio_devices(),
        Commands::Config => {
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    Ok(config.with_env_overrides())
}

#[cfg(feature = "onnx")]
fn print_event(event: wakestream::DetectionEvent, seconds: f32, quiet: bool) {
    use owo_colors::OwoColorize;
    use wakestream::DetectionEvent;

    if quiet {
        return;
    }
    match event {
        DetectionEvent::SpeechStart => {
            println!("{:8.2}s  {}", seconds, "speech start".cyan());
        }
        DetectionEvent::SpeechEnd => {
            println!("{:8.2}s  {}", seconds, "speech end".cyan());
        }
        DetectionEvent::WakewordTriggered { score } => {
            println!(
                "{:8.2}s  {} (score {:.3})",
                seconds,
                "wake word".green().bold(),
                score
            );
        }
    }
}

#[cfg(feature = "onnx")]
fn build_detector(config: &Config, verbose: bool) -> Result<wakestream::Detector> {
    use anyhow::Context;
    use wakestream::engine::onnx::load_engine;
    use wakestream::wakeword::WakewordModel;
    use wakestream::{Detector, DetectorConfig, LogObserver};

    let model_dir = config
        .wakeword
        .model_dir
        .as_deref()
        .context("no model directory configured (--model-dir or wakeword.model_dir)")?;

    let vad_engine = load_engine(&model_dir.join("silero_vad.onnx"))?;

    let model = if config.wakeword.single_stage {
        WakewordModel::SingleStage {
            detector: load_engine(&classifier_path(model_dir)?)?,
        }
    } else {
        WakewordModel::ThreeStage {
            melspec: load_engine(&model_dir.join("melspectrogram.onnx"))?,
            embedding: load_engine(&model_dir.join("embedding_model.onnx"))?,
            detector: load_engine(&classifier_path(model_dir)?)?,
        }
    };

    let detector_config = DetectorConfig::from_config(config);
    let detector = Detector::new(vad_engine, model, detector_config)?;
    Ok(if verbose {
        detector.with_observer(Box::new(LogObserver))
    } else {
        detector
    })
}

/// Finds the wake-word classifier graph: the one `.onnx` file in the model
/// directory that is not one of the shared front-end graphs.
#[cfg(feature = "onnx")]
fn classifier_path(model_dir: &Path) -> Result<std::path::PathBuf> {
    use anyhow::Context;

    const SHARED: [&str; 3] = [
        "melspectrogram.onnx",
        "embedding_model.onnx",
        "silero_vad.onnx",
    ];

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(model_dir)
        .with_context(|| format!("cannot read model directory {}", model_dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".onnx") && !SHARED.contains(&name) {
            candidates.push(path);
        }
    }

    match candidates.len() {
        0 => bail!("no wake-word classifier found in {}", model_dir.display()),
        1 => Ok(candidates.remove(0)),
        n => bail!(
            "{} classifier candidates in {}; keep exactly one wake-word graph there",
            n,
            model_dir.display()
        ),
    }
}

#[cfg(feature = "onnx")]
fn run_scan(config: &Config, wav: &Path, quiet: bool, verbose: bool) -> Result<()> {
    use wakestream::audio::wav::load_wav_mono;
    use wakestream::defaults::SAMPLE_RATE;
    use wakestream::DetectionEvent;

    let samples = load_wav_mono(wav)?;
    let mut detector = build_detector(config, verbose)?;

    // Deliberately irregular batches: detection is batching-invariant, and
    // this exercises the same path a jittery capture device does.
    let mut fed = 0usize;
    let mut triggers = 0usize;
    for batch in [479usize, 1600, 733, 2048].iter().cycle() {
        if fed >= samples.len() {
            break;
        }
        let end = (fed + batch).min(samples.len());
        for event in detector.push_samples(&samples[fed..end])? {
            if matches!(event, DetectionEvent::WakewordTriggered { .. }) {
                triggers += 1;
            }
            print_event(event, end as f32 / SAMPLE_RATE as f32, quiet);
        }
        fed = end;
    }

    println!(
        "scanned {:.2}s of audio: {} wake-word trigger(s)",
        samples.len() as f32 / SAMPLE_RATE as f32,
        triggers
    );
    Ok(())
}

#[cfg(not(feature = "onnx"))]
fn run_scan(_config: &Config, _wav: &Path, _quiet: bool, _verbose: bool) -> Result<()> {
    bail!("this build has no inference backend; rebuild with --features onnx")
}

#[cfg(all(feature = "onnx", feature = "cpal-audio"))]
fn run_listen(config: &Config, duration: Option<u64>, quiet: bool, verbose: bool) -> Result<()> {
    use std::time::{Duration, Instant};
    use wakestream::audio::capture::CpalAudioSource;
    use wakestream::defaults::SAMPLE_RATE;
    use wakestream::AudioSource;

    let mut source = CpalAudioSource::new(config.audio.device.as_deref())?;
    let mut detector = build_detector(config, verbose)?;

    source.start()?;
    if !quiet {
        eprintln!("listening… (ctrl-c to stop)");
    }

    let started = Instant::now();
    let deadline = duration.map(|secs| started + Duration::from_secs(secs));
    let mut fed = 0usize;
    loop {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            break;
        }

        let samples = source.read_samples()?;
        if samples.is_empty() {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        fed += samples.len();
        for event in detector.push_samples(&samples)? {
            print_event(event, fed as f32 / SAMPLE_RATE as f32, quiet);
        }
    }

    source.stop()?;
    Ok(())
}

#[cfg(not(all(feature = "onnx", feature = "cpal-audio")))]
fn run_listen(_config: &Config, _duration: Option<u64>, _quiet: bool, _verbose: bool) -> Result<()> {
    bail!("this build cannot listen; rebuild with --features onnx,cpal-audio")
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = wakestream::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        println!("Available audio input devices:");
        for device in devices {
            println!("  {}", device);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    bail!("this build has no audio backend; rebuild with --features cpal-audio")
}
