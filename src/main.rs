mod audio;
mod config;
mod dsp;
mod error;
mod midi;
mod pipeline;
mod pitch;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::time::Duration;

use audio::capture::{list_input_devices, AudioCapture};
use audio::ring_buffer::{sample_queue, SampleWindow};
use config::{AppConfig, DEFAULT_DEVICE};
use error::DeviceError;
use midi::handler::{MidiOutHandler, VIRTUAL_PORT};
use pipeline::FrameProcessor;
use pitch::stabilizer::PitchReading;
use types::events::NoteEvent;
use ui::{app::App, events, render, terminal::TerminalGuard};

/// Upper bound on how long the loop waits for input (~60 FPS)
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Pending audio errors kept before new ones are dropped
const ERROR_QUEUE_LEN: usize = 32;

/// Monophonic pitch-to-MIDI converter
#[derive(Parser, Debug)]
#[command(name = "pitch-to-midi")]
#[command(about = "Turn a sung or played melody into MIDI notes", long_about = None)]
struct Args {
    /// Configuration file (YAML); built-in defaults when omitted
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// List available devices and exit
    #[arg(short = 'l', long = "list")]
    list_devices: bool,

    /// Log debug output, including every note event
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_path = std::env::temp_dir().join("pitch-to-midi.log");

    // The terminal belongs to the UI, so without a log file we run unlogged
    let log_file = match std::fs::File::create(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot create log file {}: {}", log_path.display(), e);
            return;
        }
    };

    if WriteLogger::init(log_level, Config::default(), log_file).is_ok() {
        log::info!("pitch-to-midi starting (log level: {:?})", log_level);
    }
}

/// Find device index by index string or case-insensitive name substring
fn find_device(devices: &[String], search: &str, kind: &'static str) -> Result<usize, DeviceError> {
    if let Ok(index) = search.parse::<usize>() {
        if index < devices.len() {
            return Ok(index);
        }
        return Err(DeviceError::IndexOutOfRange {
            kind,
            index,
            count: devices.len(),
        });
    }

    let search_lower = search.to_lowercase();
    devices
        .iter()
        .position(|device| device.to_lowercase().contains(&search_lower))
        .ok_or_else(|| DeviceError::NotFound {
            kind,
            query: search.to_string(),
        })
}

fn print_devices(title: &str, devices: &[String]) {
    println!("{}:", title);
    if devices.is_empty() {
        println!("  (none)");
    }
    for (i, device) in devices.iter().enumerate() {
        println!("  {}: {}", i, device);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let audio_devices = list_input_devices()?;
    let midi_devices = MidiOutHandler::list_devices()?;

    if args.list_devices {
        print_devices("Available Audio Input Devices", &audio_devices);
        println!();
        print_devices("Available MIDI Output Devices", &midi_devices);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let result = run(&config, &audio_devices, &midi_devices);
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    log::info!("pitch-to-midi stopped");
    result
}

/// Open devices and drive the frame loop until the user quits
fn run(config: &AppConfig, audio_devices: &[String], midi_devices: &[String]) -> Result<()> {
    let audio_index = if config.devices.audioin.eq_ignore_ascii_case(DEFAULT_DEVICE) {
        None
    } else {
        Some(find_device(audio_devices, &config.devices.audioin, "Audio input")?)
    };

    let mut midi_out = if config.devices.midiout.eq_ignore_ascii_case(VIRTUAL_PORT) {
        MidiOutHandler::create_virtual(&config.midi.port_name)?
    } else {
        let index = find_device(midi_devices, &config.devices.midiout, "MIDI output")?;
        MidiOutHandler::connect(index, &config.midi.port_name)?
    };

    let (producer, mut window) = sample_queue(config.capture.buffer_capacity());
    let (error_tx, error_rx) = crossbeam_channel::bounded(ERROR_QUEUE_LEN);
    let capture = AudioCapture::start(audio_index, config.capture.sample_rate, producer, error_tx)?;

    let mut processor = FrameProcessor::from_config(config);
    let mut app = App::new(
        capture.device_name.clone(),
        midi_out.port_name.clone(),
        config.midi.channel,
    );

    // Dropped first, so the screen is restored before anything else shuts down
    let mut terminal = TerminalGuard::new()?;

    run_ui_loop(&mut terminal, &mut app, &mut window, &mut processor, &mut midi_out, &error_rx)?;

    if let Some(event) = processor.release() {
        midi_out.send(event)?;
        log::debug!("{:?}", event);
    }

    Ok(())
}

/// Forward one event to MIDI out and the event log
/// A failed send is reported in the status bar and the loop keeps running
fn emit(midi_out: &mut MidiOutHandler, app: &mut App, event: NoteEvent) {
    log::debug!("{:?}", event);
    if let Err(e) = midi_out.send(event) {
        log::warn!("{}", e);
        app.set_status(e.to_string());
    }
    app.push_event(event);
}

fn run_ui_loop(
    terminal: &mut TerminalGuard,
    app: &mut App,
    window: &mut SampleWindow,
    processor: &mut FrameProcessor,
    midi_out: &mut MidiOutHandler,
    error_rx: &Receiver<String>,
) -> Result<()> {
    let mut samples = Vec::with_capacity(window.capacity());

    loop {
        while let Ok(message) = error_rx.try_recv() {
            log::warn!("{}", message);
            app.set_status(message);
        }

        if app.take_reset() {
            window.clear();
            if let Some(event) = processor.reset() {
                emit(midi_out, app, event);
            }
            app.update_frame(0.0, PitchReading::unvoiced(), 0, processor.active_note());
            app.set_status("Reset");
            log::info!("Reset requested");
        }

        if app.take_panic() {
            // The handler sends the note off itself, so the event is dropped
            let _ = processor.release();
            match midi_out.panic(processor.channel()) {
                Ok(()) => app.set_status("All notes off"),
                Err(e) => {
                    log::warn!("{}", e);
                    app.set_status(e.to_string());
                }
            }
            log::info!("Panic requested");
        }

        if window.snapshot(&mut samples) {
            let output = processor.process(&samples);
            for event in output.events.iter() {
                emit(midi_out, app, event);
            }
            app.update_frame(
                output.raw_pitch,
                output.reading,
                output.loudness,
                processor.active_note(),
            );
        }

        terminal.draw(|f| render::render(f, app))?;

        events::handle_events(app, FRAME_INTERVAL)?;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
