//! clockforge CLI: real-time lamp display and WAV trace export.
//!
//! Usage:
//!   clockforge [--bpm N] [--beats N] [--wav out.wav] [--set OUT:KEY=VALUE]...
//!
//! Example:
//!   clockforge --bpm 100 --set 2:div=x2 --set 3:wave=sine --wav trace.wav

use cf_io::{ConsoleDriver, OutputDriver};
use cf_master::{Controller, EngineConfig, Setting, NUM_OUTPUTS};
use std::time::{Duration, Instant};
use std::{env, process};

const USAGE: &str = "Usage: clockforge [--bpm N] [--beats N] [--wav out.wav] [--set OUT:KEY=VALUE]...";

struct Args {
    bpm: Option<i32>,
    beats: u32,
    wav: Option<String>,
    settings: Vec<Setting>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args { bpm: None, beats: 8, wav: None, settings: Vec::new() };
    let mut iter = args.iter().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or_else(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--bpm" => {
                let v = value()?;
                parsed.bpm = Some(v.parse().map_err(|_| format!("bad BPM '{}'", v))?);
            }
            "--beats" => {
                let v = value()?;
                parsed.beats = v.parse().map_err(|_| format!("bad beat count '{}'", v))?;
            }
            "--wav" => parsed.wav = Some(value()?.clone()),
            "--set" => parsed.settings.push(value()?.parse().map_err(|e| format!("{}", e))?),
            "-h" | "--help" => return Err(String::new()),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(parsed)
}

fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    let raw: Vec<String> = env::args().collect();
    let args = parse_args(&raw).unwrap_or_else(|e| {
        if !e.is_empty() {
            eprintln!("{}", e);
        }
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let mut ctrl = Controller::new(EngineConfig::default());
    if let Some(bpm) = args.bpm {
        ctrl.with_engine(|e| e.set_bpm(bpm));
    }
    for setting in &args.settings {
        ctrl.apply_setting(setting);
    }

    print_summary(&ctrl);

    match args.wav {
        Some(path) => export(&ctrl, &path, args.beats),
        None => play(&mut ctrl, args.beats),
    }
}

fn print_summary(ctrl: &Controller) {
    ctrl.with_engine(|e| {
        println!("Tempo:    {} BPM, {} PPQN", e.bpm(), e.ppqn());
        println!("Ext div:  {}", e.external_divider_label());
        println!();
        for i in 0..NUM_OUTPUTS {
            let o = e.output(i);
            print!(
                "Out {} {:<7} {:>5} duty {:>4} phase {:>4} prob {:>4} swing {:>5}/{:<2} {}",
                o.id(),
                format!("{:?}", o.kind()),
                o.divider_label(),
                o.duty_cycle_label(),
                o.phase_label(),
                o.probability_label(),
                o.swing_label(),
                o.swing_every(),
                o.waveform_name(),
            );
            if o.euclidean().enabled {
                let pattern: String =
                    o.rhythm().as_slice().iter().map(|&s| if s { 'x' } else { '.' }).collect();
                print!("  euclid {}", pattern);
            }
            if !o.is_enabled() {
                print!("  (off)");
            }
            println!();
        }
        println!();
    });
}

fn play(ctrl: &mut Controller, beats: u32) {
    let bpm = ctrl.with_engine(|e| e.bpm()) as u64;
    let duration = Duration::from_millis(beats as u64 * 60_000 / bpm);

    let mut driver = ConsoleDriver::new(std::io::stdout());
    if let Err(e) = driver.start() {
        eprintln!("Failed to start output driver: {}", e);
        process::exit(1);
    }
    if let Err(e) = ctrl.start() {
        eprintln!("{}", e);
        process::exit(1);
    }
    println!("Playing {} beats...", beats);

    let started = Instant::now();
    while started.elapsed() < duration {
        if let Err(e) = ctrl.drive(&mut driver) {
            eprintln!("{}", e);
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    ctrl.stop();
    let _ = driver.stop();
    println!("Done after {} ticks.", ctrl.ticks());
}

fn export(ctrl: &Controller, path: &str, beats: u32) {
    println!("Rendering {} beats to {} at {} Hz...", beats, path, ctrl.tick_rate());
    if let Err(e) = ctrl.export_wav(path, beats) {
        eprintln!("Failed to write {}: {}", path, e);
        process::exit(1);
    }
    println!("Done.");
}
