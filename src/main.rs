//! Snapshift — real-time snapshot and transition engine for MIDI grooveboxes.
//!
//! Headless CLI around the engine core:
//!   snapshift params                      — print the parameter catalogue
//!   snapshift devices                     — list MIDI ports
//!   snapshift run --bank 0 --slot 3 ...   — trigger a snapshot and pump

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use snapshift::clock::{ClockSource, Quantize};
use snapshift::coordinator::Coordinator;
use snapshift::midi::{ClockInput, DeviceOutput};
use snapshift::params::{ParameterRegistry, WireEncoding};
use snapshift::snapshot::{persistence, SnapshotStore};
use snapshift::transition::{TransitionMode, TransitionSettings};

#[derive(Parser)]
#[command(
    name = "snapshift",
    about = "Real-time snapshot and transition engine for MIDI grooveboxes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parameter catalogue
    Params,
    /// List available MIDI input and output devices
    Devices,
    /// Load a snapshot set, trigger one snapshot, and pump the engine
    Run {
        /// Snapshot YAML file (defaults to ~/.snapshift/snapshots.yaml)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Bank of the snapshot to trigger
        #[arg(short, long, default_value_t = 0)]
        bank: u8,
        /// Slot of the snapshot to trigger
        #[arg(short, long, default_value_t = 0)]
        slot: u8,
        /// Transition mode: jump | drop
        #[arg(short, long, default_value = "jump")]
        mode: String,
        /// Jump fade time in milliseconds
        #[arg(long, default_value_t = 500)]
        fade: u64,
        /// Jump quantization: none | beat | bar | 2bar | 4bar
        #[arg(short, long, default_value = "bar")]
        quantize: String,
        /// Drop cycle length in bars (1-32)
        #[arg(long, default_value_t = 4)]
        cycle: u32,
        /// Re-schedule the drop every cycle until interrupted
        #[arg(long)]
        repeat: bool,
        /// Internal clock tempo
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
        /// Clock source: internal | external
        #[arg(long, default_value = "internal")]
        source: String,
        /// MIDI input device for the external clock (substring match)
        #[arg(long)]
        input: Option<String>,
        /// MIDI output device (substring match); without one, messages print
        /// to stderr
        #[arg(long)]
        output: Option<String>,
        /// Stop after this many seconds (omit to run until Ctrl-C)
        #[arg(short, long)]
        duration: Option<f64>,
    },
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Params => print_params(),
        Commands::Devices => print_devices(),
        Commands::Run {
            file,
            bank,
            slot,
            mode,
            fade,
            quantize,
            cycle,
            repeat,
            bpm,
            source,
            input,
            output,
            duration,
        } => {
            let settings = build_settings(&mode, fade, &quantize, cycle, repeat, bpm, &source)?;
            run(file, bank, slot, settings, input, output, duration)
        }
    }
}

fn print_params() -> io::Result<()> {
    let registry = ParameterRegistry::new();
    for def in registry.iter() {
        let wire = match def.encoding {
            WireEncoding::Cc { cc } => format!("CC{cc}"),
            WireEncoding::ProgramChange => "PC".to_string(),
            WireEncoding::Note { note, .. } => format!("Note{note}"),
            WireEncoding::Nrpn { msb, lsb } => format!("NRPN {msb}/{lsb}"),
        };
        println!(
            "{:<18} {:<18} ch{:<3} {:<10} default {}",
            def.id.as_str(),
            def.name,
            def.channel,
            wire,
            def.default
        );
    }
    Ok(())
}

fn print_devices() -> io::Result<()> {
    println!("MIDI inputs:");
    for name in ClockInput::list_devices() {
        println!("  {name}");
    }
    println!("MIDI outputs:");
    for name in DeviceOutput::list_devices() {
        println!("  {name}");
    }
    Ok(())
}

fn build_settings(
    mode: &str,
    fade: u64,
    quantize: &str,
    cycle: u32,
    repeat: bool,
    bpm: f64,
    source: &str,
) -> io::Result<TransitionSettings> {
    let mode = match mode {
        "jump" => TransitionMode::Jump,
        "drop" => TransitionMode::Drop,
        other => return Err(io::Error::other(format!("unknown mode '{other}'"))),
    };
    let quantize = match quantize {
        "none" => Quantize::None,
        "beat" => Quantize::Beat,
        "bar" => Quantize::Bar,
        "2bar" => Quantize::TwoBars,
        "4bar" => Quantize::FourBars,
        other => return Err(io::Error::other(format!("unknown quantization '{other}'"))),
    };
    let source = match source {
        "internal" => ClockSource::Internal,
        "external" => ClockSource::External,
        other => return Err(io::Error::other(format!("unknown clock source '{other}'"))),
    };
    let settings = match mode {
        TransitionMode::Jump => TransitionSettings::jump(fade, quantize),
        TransitionMode::Drop => TransitionSettings::drop(cycle, repeat),
    };
    Ok(settings.with_bpm(bpm).with_source(source))
}

fn run(
    file: Option<PathBuf>,
    bank: u8,
    slot: u8,
    settings: TransitionSettings,
    input: Option<String>,
    output: Option<String>,
    duration: Option<f64>,
) -> io::Result<()> {
    let path = file.unwrap_or_else(persistence::default_store_path);
    let report = persistence::load_snapshots(&path)?;
    if report.snapshots.is_empty() {
        eprintln!("warning: no snapshots in {}", path.display());
    }
    if report.repaired > 0 {
        eprintln!("warning: repaired {} snapshot(s) while loading", report.repaired);
    }
    for (bank, slot) in &report.collisions {
        eprintln!("warning: bank {bank} slot {slot} holds multiple snapshots; first wins");
    }

    let mut store = SnapshotStore::new(ParameterRegistry::new());
    store.load(report.into_snapshots());

    let (port_tx, port_rx) = std::sync::mpsc::channel();
    let mut coordinator = Coordinator::new(store, port_rx);

    // Keep the input connection alive for the whole run.
    let _clock_in = if settings.clock_source == ClockSource::External {
        Some(ClockInput::start(input.as_deref(), port_tx.clone()).map_err(|e| {
            io::Error::other(format!("clock input: {e}"))
        })?)
    } else {
        None
    };

    // An explicitly named output must exist; otherwise fall back to the
    // first port, or to stderr when no device is present.
    let device = match output.as_deref() {
        Some(name) => Some(DeviceOutput::connect(Some(name))?),
        None => DeviceOutput::connect(None).ok(),
    };
    match device {
        Some(device) => {
            eprintln!("sending to {}", device.port_name());
            let device = Rc::new(RefCell::new(device));
            {
                let device = Rc::clone(&device);
                coordinator.engine_mut().on_message(Box::new(move |msg| {
                    if let Err(e) = device.borrow_mut().send(msg) {
                        eprintln!("warning: send failed: {e}");
                    }
                }));
            }
            coordinator.set_transport_out(Box::new(move |bytes| {
                if let Err(e) = device.borrow_mut().send_raw(bytes) {
                    eprintln!("warning: send failed: {e}");
                }
            }));
        }
        None => {
            eprintln!("no MIDI output available, printing messages");
            coordinator
                .engine_mut()
                .on_message(Box::new(|msg| eprintln!("-> {msg:?}")));
        }
    }

    coordinator
        .engine_mut()
        .on_complete(Box::new(|snapshot| eprintln!("applied '{}'", snapshot.name)));

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| io::Error::other(format!("failed to set Ctrl-C handler: {e}")))?;

    let start = Instant::now();
    if settings.clock_source == ClockSource::Internal {
        coordinator.start(start);
    }
    if !coordinator.trigger_position(bank, slot, settings, start) {
        coordinator.stop();
        return Err(io::Error::other(format!(
            "no snapshot at bank {bank}, slot {slot}"
        )));
    }
    eprintln!("triggered bank {bank} slot {slot}... (Ctrl-C to stop)");

    let timeout = duration.map(Duration::from_secs_f64);
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if let Some(t) = timeout {
            if start.elapsed() >= t {
                break;
            }
        }
        coordinator.pump(Instant::now());
        std::thread::sleep(Duration::from_millis(1));
    }

    coordinator.stop();
    for entry in coordinator.log().entries() {
        if entry.count > 1 {
            eprintln!("warning: {} (x{})", entry.message, entry.count);
        } else {
            eprintln!("warning: {}", entry.message);
        }
    }
    eprintln!("Stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_params() {
        let cli = Cli::try_parse_from(["snapshift", "params"]).unwrap();
        assert!(matches!(cli.command, Commands::Params));
    }

    #[test]
    fn cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["snapshift", "run"]).unwrap();
        match cli.command {
            Commands::Run {
                bank,
                slot,
                mode,
                fade,
                quantize,
                cycle,
                repeat,
                ..
            } => {
                assert_eq!((bank, slot), (0, 0));
                assert_eq!(mode, "jump");
                assert_eq!(fade, 500);
                assert_eq!(quantize, "bar");
                assert_eq!(cycle, 4);
                assert!(!repeat);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parse_run_drop() {
        let cli = Cli::try_parse_from([
            "snapshift", "run", "--bank", "2", "--slot", "7", "--mode", "drop", "--cycle", "8",
            "--repeat",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                bank,
                slot,
                mode,
                cycle,
                repeat,
                ..
            } => {
                assert_eq!((bank, slot), (2, 7));
                assert_eq!(mode, "drop");
                assert_eq!(cycle, 8);
                assert!(repeat);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn build_settings_jump() {
        let s = build_settings("jump", 1000, "2bar", 4, false, 140.0, "internal").unwrap();
        assert_eq!(s.mode, TransitionMode::Jump);
        assert_eq!(s.fade_ms, 1000);
        assert_eq!(s.quantize, Quantize::TwoBars);
        assert!((s.bpm - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_settings_drop_external() {
        let s = build_settings("drop", 0, "none", 16, true, 120.0, "external").unwrap();
        assert_eq!(s.mode, TransitionMode::Drop);
        assert_eq!(s.cycle_bars, 16);
        assert!(s.repeat);
        assert_eq!(s.clock_source, ClockSource::External);
    }

    #[test]
    fn build_settings_rejects_unknown_values() {
        assert!(build_settings("fade", 0, "bar", 1, false, 120.0, "internal").is_err());
        assert!(build_settings("jump", 0, "8bar", 1, false, 120.0, "internal").is_err());
        assert!(build_settings("jump", 0, "bar", 1, false, 120.0, "radio").is_err());
    }
}
