// drumloop - Command line front end: live playback, WAV export, kit inspection

use clap::{Parser, Subcommand};
use drumloop::audio::device::AudioDeviceManager;
use drumloop::console::{self, ConsoleCommand};
use drumloop::messaging::channels::{NotificationConsumer, drain_notifications};
use drumloop::messaging::NotificationLevel;
use drumloop::{
    AudioEngine, CaptureSink, ExportSettings, KitConfig, KitError, LoopExporter,
    create_notification_channel,
};
use env_logger::Env;
use log::{error, info};
use parking_lot::Mutex;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Procedural drum loop player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the loop on an audio device and read commands from stdin.
    Play {
        /// Kit file (RON); the built-in rock beat when omitted.
        #[arg(short, long)]
        kit: Option<PathBuf>,
        /// Override the kit tempo.
        #[arg(short, long)]
        bpm: Option<f32>,
        /// Master volume, 0.0 to 1.0.
        #[arg(long, default_value_t = 0.8)]
        volume: f32,
        /// Output device name (see `devices`).
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Render whole bars of the loop to a 16-bit WAV file.
    Export {
        /// Destination WAV file.
        output: PathBuf,
        #[arg(short, long)]
        kit: Option<PathBuf>,
        #[arg(short, long)]
        bpm: Option<f32>,
        #[arg(long, default_value_t = 2)]
        bars: u32,
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
        /// Noise seed; the same seed renders the same file.
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
        #[arg(long)]
        mono: bool,
    },
    /// Print the kit and its rolling windows.
    Show {
        #[arg(short, long)]
        kit: Option<PathBuf>,
        /// Advance this many ticks before printing.
        #[arg(long, default_value_t = 0)]
        ticks: u64,
    },
    /// List audio output devices.
    Devices,
    /// Write the built-in kit to a file as a starting point.
    Init {
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play {
            kit,
            bpm,
            volume,
            device,
        } => run_play(kit.as_deref(), bpm, volume, device.as_deref()),
        Commands::Export {
            output,
            kit,
            bpm,
            bars,
            sample_rate,
            seed,
            mono,
        } => {
            let settings = ExportSettings {
                sample_rate,
                bars,
                channels: if mono { 1 } else { 2 },
                seed,
            };
            run_export(&output, kit.as_deref(), bpm, settings)
        }
        Commands::Show { kit, ticks } => run_show(kit.as_deref(), ticks),
        Commands::Devices => run_devices(),
        Commands::Init { output } => run_init(&output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_kit(path: Option<&Path>, bpm: Option<f32>) -> Result<KitConfig, KitError> {
    let mut kit = match path {
        Some(path) => KitConfig::load(path)?,
        None => KitConfig::default(),
    };
    if let Some(bpm) = bpm {
        kit.bpm = bpm;
        kit.validate()?;
    }
    Ok(kit)
}

fn run_play(
    kit_path: Option<&Path>,
    bpm: Option<f32>,
    volume: f32,
    device: Option<&str>,
) -> CliResult {
    let kit = load_kit(kit_path, bpm)?;

    let (audio_tx, mut audio_rx) = create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let audio = AudioEngine::new(device, Arc::new(Mutex::new(audio_tx)))?;
    audio.set_volume(volume);

    let (engine_tx, mut engine_rx) = create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let engine = kit.build_engine(audio.sink(), None)?;
    engine.attach_notifications(engine_tx);
    engine.start()?;

    println!("{}", console::HELP);
    println!("{}", console::format_grid(&engine));
    prompt();

    for line in io::stdin().lock().lines() {
        let line = line?;
        print_notifications(&mut audio_rx);
        print_notifications(&mut engine_rx);

        if !line.trim().is_empty() {
            match line.parse::<ConsoleCommand>() {
                Ok(command) => {
                    println!("{}", console::execute(&engine, &command));
                    if command == ConsoleCommand::Quit {
                        break;
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
        prompt();
    }

    engine.stop();
    info!("Played {} ticks on {}", engine.current_tick(), audio.device_name());
    Ok(())
}

fn run_export(
    output: &Path,
    kit_path: Option<&Path>,
    bpm: Option<f32>,
    settings: ExportSettings,
) -> CliResult {
    let kit = load_kit(kit_path, bpm)?;
    let exporter = LoopExporter::new(settings);
    let summary = exporter.export_wav(&kit, output)?;
    println!(
        "{}: {} bars, {} hits, {:.2}s",
        output.display(),
        exporter.settings().bars,
        summary.hits,
        summary.duration_seconds
    );
    Ok(())
}

fn run_show(kit_path: Option<&Path>, ticks: u64) -> CliResult {
    let kit = load_kit(kit_path, None)?;
    let engine = kit.build_engine(Arc::new(CaptureSink::new(44100.0)), Some(0))?;
    engine.prime();
    for _ in 0..ticks {
        engine.step();
    }

    println!(
        "grid {}x{} at {:.1} BPM, tick {}",
        kit.beats_per_bar,
        kit.ticks_per_beat,
        engine.desired_bpm(),
        engine.current_tick()
    );
    for track in &kit.tracks {
        println!(
            "  {:<8} {:<6} gain {:.2}{}",
            track.id,
            track.instrument.to_string(),
            track.gain,
            if track.enabled { "" } else { " (off)" }
        );
    }
    println!("{}", console::format_grid(&engine));
    Ok(())
}

fn run_devices() -> CliResult {
    let devices = AudioDeviceManager::new().list_output_devices();
    if devices.is_empty() {
        println!("no output devices found");
    }
    for device in devices {
        println!("  {}", device);
    }
    Ok(())
}

fn run_init(output: &Path) -> CliResult {
    KitConfig::default().save(output)?;
    println!("wrote {}", output.display());
    Ok(())
}

fn print_notifications(rx: &mut NotificationConsumer) {
    for notification in drain_notifications(rx) {
        let label = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        println!("[{}] {}", label, notification.message);
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
