use anyhow::{Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use talkback::audio::AudioFormat;
use talkback::audio::device::DeviceFactory;
use talkback::cli::{Cli, Commands};
use talkback::config::Config;
use talkback::controller::SessionController;
use talkback::events::{JsonLineSink, RecognitionEventSink, StderrSink};
use talkback::permission::GrantedPermission;
use talkback::stt::ModelLoader;
#[cfg(feature = "vosk-engine")]
use talkback::stt::RecognizerEngine;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Devices => list_audio_devices(),
        Commands::Record { duration } => run_record(&config, cli.json, duration),
        Commands::Replay => run_replay(&config, cli.json),
        Commands::Transcribe { ref file } => run_transcribe(&config, cli.json, file),
    }
}

/// Precedence: command-line flags, then environment, then the config file.
fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?.with_env_overrides();

    if let Some(model) = &cli.model {
        config.recognizer.model_path = Some(model.clone());
    }
    if let Some(device) = &cli.input_device {
        config.audio.input_device = Some(device.clone());
    }
    if let Some(device) = &cli.output_device {
        config.audio.output_device = Some(device.clone());
    }
    Ok(config)
}

fn audio_format(config: &Config) -> AudioFormat {
    AudioFormat {
        sample_rate_hz: config.audio.sample_rate,
        ..AudioFormat::default()
    }
}

fn event_sink(json: bool) -> Arc<dyn RecognitionEventSink> {
    if json {
        Arc::new(JsonLineSink)
    } else {
        Arc::new(StderrSink)
    }
}

#[cfg(feature = "cpal-audio")]
fn device_factory(config: &Config) -> Result<Arc<dyn DeviceFactory>> {
    Ok(Arc::new(
        talkback::audio::cpal_device::CpalDeviceFactory::new(
            config.audio.input_device.clone(),
            config.audio.output_device.clone(),
        ),
    ))
}

#[cfg(not(feature = "cpal-audio"))]
fn device_factory(_config: &Config) -> Result<Arc<dyn DeviceFactory>> {
    bail!("built without audio device support; rebuild with --features cpal-audio");
}

/// Kick off the model load on a background thread.
#[cfg(feature = "vosk-engine")]
fn spawn_model_load(config: &Config) -> Result<ModelLoader> {
    let Some(path) = config.recognizer.model_path.clone() else {
        bail!("no recognition model configured; pass --model or set recognizer.model_path");
    };
    eprintln!("talkback: loading model from {}", path.display());
    Ok(ModelLoader::spawn(move || {
        talkback::stt::vosk::VoskEngine::load(&path)
            .map(|engine| Arc::new(engine) as Arc<dyn RecognizerEngine>)
    }))
}

#[cfg(not(feature = "vosk-engine"))]
fn spawn_model_load(_config: &Config) -> Result<ModelLoader> {
    bail!("built without a recognition engine; rebuild with --features vosk-engine");
}

fn controller(config: &Config, json: bool) -> Result<SessionController> {
    Ok(SessionController::new(
        audio_format(config),
        device_factory(config)?,
        Arc::new(GrantedPermission),
        event_sink(json),
        config.recording_path(),
    ))
}

fn wait_for_recognition(controller: &SessionController) {
    while controller.recognition_active() {
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn run_record(config: &Config, json: bool, duration: Option<u64>) -> Result<()> {
    // Model loads while the user is speaking
    let loader = spawn_model_load(config)?;
    let mut controller = controller(config, json)?;
    let format = audio_format(config);

    controller.start_recording()?;
    match duration {
        Some(secs) => {
            eprintln!("talkback: recording for {}s", secs);
            std::thread::sleep(Duration::from_secs(secs));
        }
        None => {
            eprintln!("talkback: recording, press Enter to stop");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
        }
    }

    controller.set_engine(loader.wait()?);
    let bytes = controller.stop_recording()?;
    eprintln!(
        "talkback: recorded {} bytes ({:.1}s)",
        bytes,
        format.duration_of(bytes).as_secs_f64()
    );

    wait_for_recognition(&controller);
    controller.stop_recognition()?;
    Ok(())
}

fn run_replay(config: &Config, json: bool) -> Result<()> {
    let mut controller = controller(config, json)?;

    controller.start_replay()?;
    while controller.is_replaying() {
        std::thread::sleep(Duration::from_millis(50));
    }
    controller.stop_replay()?;
    Ok(())
}

fn run_transcribe(config: &Config, json: bool, file: &Path) -> Result<()> {
    let loader = spawn_model_load(config)?;
    let mut controller = controller(config, json)?;

    controller.set_engine(loader.wait()?);
    controller.start_recognition_of(file)?;
    wait_for_recognition(&controller);
    controller.stop_recognition()?;
    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = talkback::audio::cpal_device::list_devices()?;
    if devices.is_empty() {
        eprintln!("talkback: no audio devices found");
        return Ok(());
    }
    for name in devices {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    bail!("built without audio device support; rebuild with --features cpal-audio");
}
