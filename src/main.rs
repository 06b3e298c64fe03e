//! glucowatch: Nightscout glucose monitor
//!
//! Drives the history/alerting engine from Nightscout `entries.json`
//! documents and rings the terminal bell on out-of-range readings.
//!
//! Usage:
//!   glucowatch watch <entries.json>      - Poll a file and show a live status line
//!   glucowatch replay <entries.json>     - Replay recorded entries, one cycle each
//!   glucowatch classify <mg/dL>          - Classify a value with the saved thresholds
//!   glucowatch thresholds <ul> <l> <h> <uh> - Save new alarm thresholds
//!   glucowatch snooze <minutes>          - Silence alerts (0 clears)
//!   glucowatch path                      - Show data file locations
//!   GLUCOWATCH_DBG=1 glucowatch watch f  - Enable debug output

use std::env;
use std::thread;

use chrono::Local;
use log::{info, warn};

use glucowatch::alarm::{classify, AlarmThresholds};
use glucowatch::alert::TerminalBell;
use glucowatch::config::{
    default_database_path, ensure_data_dir, get_data_dir, settings_file_path, Settings,
    SharedSettings,
};
use glucowatch::display::GlucoseBand;
use glucowatch::error::GlucoseError;
use glucowatch::monitor::{EntriesFile, Monitor, ReadingSource};
use glucowatch::reading::parse_entries;
use glucowatch::storage::Storage;

fn main() -> Result<(), GlucoseError> {
    let args: Vec<String> = env::args().collect();

    if env::var("GLUCOWATCH_DBG").is_ok() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    let settings = Settings::load_or_default(settings_file_path());

    match args.get(1).map(|s| s.as_str()) {
        Some("watch") => cmd_watch(settings, required(&args, 2, "entries file")?),
        Some("replay") => cmd_replay(settings, required(&args, 2, "entries file")?),
        Some("classify") => cmd_classify(&settings, required(&args, 2, "value")?),
        Some("thresholds") => cmd_thresholds(settings, &args[2..]),
        Some("snooze") => cmd_snooze(settings, required(&args, 2, "minutes")?),
        Some("path") | Some("paths") => {
            cmd_show_paths();
            Ok(())
        }
        Some("--version") | Some("-V") => {
            println!("glucowatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str, GlucoseError> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| GlucoseError::InvalidArgument(format!("missing {}", what)))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, GlucoseError> {
    text.trim()
        .parse()
        .map_err(|_| GlucoseError::InvalidArgument(format!("not a number: {}", text)))
}

/// Open the archive, or carry on without one
fn open_storage() -> Option<Storage> {
    match Storage::new(default_database_path()) {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!("Reading archive unavailable: {}", e);
            None
        }
    }
}

/// Poll an entries file forever, printing one status line per cycle
fn cmd_watch(settings: Settings, path: &str) -> Result<(), GlucoseError> {
    let shared = SharedSettings::new(settings);
    let storage = open_storage();
    let mut source = EntriesFile::new(path);
    let mut monitor = Monitor::new(shared.clone(), TerminalBell);

    if let Some(storage) = &storage {
        let capacity = shared.snapshot().history_capacity;
        match storage.recent(capacity, Local::now()) {
            Ok(readings) => monitor.seed(readings),
            Err(e) => warn!("Could not load archived readings: {}", e),
        }
    }

    info!("Watching {}", path);
    loop {
        let now = Local::now();
        match source.fetch(now) {
            Ok(readings) => {
                if let Some(storage) = &storage {
                    if let Err(e) = storage.import_readings(&readings) {
                        warn!("Could not archive readings: {}", e);
                    }
                }
                let report = monitor.run_cycle(readings, now);
                println!(
                    "[{}] {}",
                    now.format("%H:%M:%S"),
                    report.status_line(&shared.snapshot())
                );
            }
            Err(e) => eprintln!("[{}] Fetch failed: {}", now.format("%H:%M:%S"), e),
        }
        thread::sleep(shared.snapshot().poll_interval());
    }
}

/// Replay recorded entries in measurement order, as if each had just arrived
fn cmd_replay(settings: Settings, path: &str) -> Result<(), GlucoseError> {
    let json = std::fs::read_to_string(path)?;
    let mut readings = parse_entries(&json, Local::now())?;
    readings.sort_by_key(|r| r.timestamp());

    let mut monitor = Monitor::new(SharedSettings::new(settings), TerminalBell);
    let total = readings.len();
    for reading in readings {
        let at = reading.timestamp();
        let report = monitor.run_cycle(vec![reading.checked_at(at)], at);
        println!("{}", serde_json::to_string(&report)?);
    }

    eprintln!("Replayed {} readings", total);
    Ok(())
}

fn cmd_classify(settings: &Settings, value: &str) -> Result<(), GlucoseError> {
    let value: f64 = parse_number(value)?;
    if !value.is_finite() || value < 0.0 {
        return Err(GlucoseError::InvalidArgument(format!("not a glucose value: {}", value)));
    }
    let category = classify(value, &settings.thresholds);
    let band = GlucoseBand::of(value);
    println!(
        "{}: {} ({:?}, {:?})",
        settings.unit.format(value),
        category.map_or("Normal", |c| c.name()),
        band,
        band.color()
    );
    Ok(())
}

fn cmd_thresholds(mut settings: Settings, values: &[String]) -> Result<(), GlucoseError> {
    if values.len() != 4 {
        eprintln!("Current thresholds: {}", settings.thresholds.format_range());
        return Err(GlucoseError::InvalidArgument(
            "expected: urgent_low low high urgent_high".to_string(),
        ));
    }
    let parsed = values
        .iter()
        .map(|v| parse_number::<f64>(v))
        .collect::<Result<Vec<_>, _>>()?;
    let thresholds = AlarmThresholds::new(parsed[0], parsed[1], parsed[2], parsed[3]);
    if !thresholds.is_ordered() {
        eprintln!("Warning: thresholds are not increasing; high-side alarms take precedence");
    }
    settings.thresholds = thresholds;
    settings.validate()?;
    settings.save(settings_file_path())?;
    eprintln!("Saved thresholds: {}", thresholds.format_range());
    Ok(())
}

fn cmd_snooze(mut settings: Settings, minutes: &str) -> Result<(), GlucoseError> {
    let minutes: i64 = parse_number(minutes)?;
    settings.snooze_for(minutes, Local::now())?;
    settings.save(settings_file_path())?;
    match settings.snooze_until {
        Some(until) => eprintln!("Alerts snoozed until {}", until.format("%H:%M")),
        None => eprintln!("Snooze cleared"),
    }
    Ok(())
}

fn cmd_show_paths() {
    println!("glucowatch data paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Database:        {}", default_database_path().display());
    println!("  Settings file:   {}", settings_file_path().display());
}

fn print_help() {
    eprintln!("glucowatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glucowatch watch <entries.json>          Poll a Nightscout entries file");
    eprintln!("  glucowatch replay <entries.json>         Replay entries as JSON reports");
    eprintln!("  glucowatch classify <mg/dL>              Classify a glucose value");
    eprintln!("  glucowatch thresholds <ul> <l> <h> <uh>  Save alarm thresholds (mg/dL)");
    eprintln!("  glucowatch snooze <minutes>              Snooze alerts, 0 clears");
    eprintln!("  glucowatch path                          Show data file locations");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLUCOWATCH_DBG=1                         Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Database:  {}", default_database_path().display());
    eprintln!("  Settings:  {}", settings_file_path().display());
}
