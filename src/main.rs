use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use airsentry::{
    config::SentryConfig,
    network::NetworkKey,
    output::{format_cycle_summary, format_records, ConsoleAlertSink, CycleEvent},
    scanner::{FixedLocation, LocationProvider, ReplayScanSource, ScanCycleOrchestrator},
    settings::{SettingKey, SettingsStore},
    store::export::{export_to_file, ExportFormat},
    store::NetworkStore,
};

fn build_cli() -> Command {
    let replay = Arg::new("replay")
        .short('r')
        .long("replay")
        .value_name("FILE")
        .help("JSON file of recorded scan batches to feed the pipeline")
        .default_value("demos/recorded_scans.json");
    let latitude = Arg::new("latitude")
        .long("lat")
        .value_name("DEG")
        .help("Latitude reported for every cycle")
        .value_parser(clap::value_parser!(f64))
        .requires("longitude");
    let longitude = Arg::new("longitude")
        .long("lon")
        .value_name("DEG")
        .help("Longitude reported for every cycle")
        .value_parser(clap::value_parser!(f64))
        .requires("latitude");

    Command::new("airsentry")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Passive Wi-Fi access point auditing")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to ~/.airsentry.toml)")
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding the dataset and settings")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Scan continuously in the foreground")
                .arg(replay.clone())
                .arg(latitude.clone())
                .arg(longitude.clone())
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Run a single cycle and exit")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Pause between cycles in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("background")
                .about("Run one scheduled pass (exit 75 asks the scheduler to retry)")
                .arg(replay)
                .arg(latitude)
                .arg(longitude),
        )
        .subcommand(
            Command::new("list")
                .about("Show every stored network")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Remove one network from the dataset")
                .arg(Arg::new("ssid").required(true))
                .arg(Arg::new("bssid").required(true)),
        )
        .subcommand(
            Command::new("clear")
                .about("Remove every network from the dataset")
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Do not ask for confirmation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export the dataset for sharing")
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_parser(["json", "csv"])
                        .default_value("csv"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Show or change behaviour flags")
                .arg(Arg::new("key").help("auto-scan, auto-save, notifications, vibration, show-version"))
                .arg(
                    Arg::new("value")
                        .requires("key")
                        .value_parser(clap::value_parser!(bool)),
                ),
        )
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<SentryConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SentryConfig::from_toml_file(path)?,
        None => SentryConfig::load_default_config(),
    };
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config = config.with_data_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

fn location_provider(matches: &ArgMatches) -> Arc<dyn LocationProvider> {
    match (matches.get_one::<f64>("latitude"), matches.get_one::<f64>("longitude")) {
        (Some(&lat), Some(&lon)) => Arc::new(FixedLocation::at(lat, lon)),
        _ => Arc::new(FixedLocation::unavailable()),
    }
}

fn build_orchestrator(
    config: &SentryConfig,
    matches: &ArgMatches,
    settings: Arc<SettingsStore>,
) -> anyhow::Result<ScanCycleOrchestrator> {
    let replay = matches
        .get_one::<String>("replay")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/recorded_scans.json"));
    let source = Arc::new(ReplayScanSource::from_file(&replay)?);
    let orchestrator = ScanCycleOrchestrator::from_config(config, source, location_provider(matches), settings)?
        .with_alert_sink(Arc::new(ConsoleAlertSink));
    Ok(orchestrator)
}

fn print_event(event: &CycleEvent, colored_output: bool) {
    let summary = format_cycle_summary(event);
    match event {
        CycleEvent::Completed { .. } if colored_output => println!("{} {}", "[*]".bright_cyan(), summary),
        CycleEvent::Failed { .. } if colored_output => println!("{} {}", "[!]".bright_red(), summary),
        _ => println!("{}", summary),
    }
    if !event.merged().is_empty() {
        print!("{}", format_records(event.merged(), colored_output));
    }
    for record in event.new_networks() {
        let line = format!("new: {} ({}) {}", record.ssid, record.bssid, record.label);
        if colored_output {
            println!("{}", line.color(record.label.color()));
        } else {
            println!("{}", line);
        }
    }
}

async fn run_scan(config: &SentryConfig, matches: &ArgMatches, colored_output: bool) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config = config.with_scan_interval(interval);
        config.validate()?;
    }
    let settings = Arc::new(SettingsStore::load(config.settings_path())?);
    let orchestrator = Arc::new(build_orchestrator(&config, matches, settings)?);

    if matches.get_flag("once") {
        let event = orchestrator.tick().await;
        print_event(&event, colored_output);
        return Ok(());
    }

    let mut events = orchestrator.notifier().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event, colored_output),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Display lagged, skipped {} cycles", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (_run_tx, run_rx) = watch::channel(true);
    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    orchestrator.run_foreground(run_rx, shutdown).await;
    drop(orchestrator);
    let _ = printer.await;
    Ok(())
}

async fn run_background(config: &SentryConfig, matches: &ArgMatches) -> anyhow::Result<i32> {
    let settings = Arc::new(SettingsStore::load(config.settings_path())?);
    let orchestrator = build_orchestrator(config, matches, settings)?;
    let outcome = orchestrator.run_background().await;
    log::info!("Background pass outcome: {:?}", outcome);
    Ok(outcome.exit_code())
}

fn run_settings(config: &SentryConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let settings = SettingsStore::load(config.settings_path())?;

    if let Some(key) = matches.get_one::<String>("key") {
        let key: SettingKey = key.parse().map_err(anyhow::Error::msg)?;
        match matches.get_one::<bool>("value") {
            Some(&value) => settings.set(key, value)?,
            None => anyhow::bail!("missing value for {:?}", key),
        }
    }

    print!("{}", toml::to_string_pretty(&settings.current())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let colored_output = !matches.get_flag("no-color");
    if !colored_output {
        colored::control::set_override(false);
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".bright_red().bold(), e);
            process::exit(1);
        }
    };

    match matches.subcommand() {
        Some(("scan", sub)) => run_scan(&config, sub, colored_output).await?,
        Some(("background", sub)) => {
            let code = run_background(&config, sub).await?;
            process::exit(code);
        }
        Some(("list", sub)) => {
            let store = NetworkStore::new(config.store_path())?;
            let records = store.read_all()?;
            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print!("{}", format_records(&records, colored_output));
                println!("{} networks in {}", records.len(), store.path().display());
            }
        }
        Some(("delete", sub)) => {
            let store = NetworkStore::new(config.store_path())?;
            let ssid = sub.get_one::<String>("ssid").map(String::as_str).unwrap_or_default();
            let bssid = sub.get_one::<String>("bssid").map(String::as_str).unwrap_or_default();
            let key = NetworkKey::new(ssid, bssid);
            if store.delete(&key)? {
                println!("Deleted {}", key);
            } else {
                eprintln!("{} {} not found", "[!]".bright_yellow(), key);
                process::exit(1);
            }
        }
        Some(("clear", sub)) => {
            if !sub.get_flag("yes") {
                eprintln!("Refusing to clear the dataset without --yes");
                process::exit(1);
            }
            NetworkStore::new(config.store_path())?.clear()?;
            println!("Dataset cleared");
        }
        Some(("export", sub)) => {
            let format: ExportFormat = sub
                .get_one::<String>("format")
                .map(String::as_str)
                .unwrap_or("csv")
                .parse()
                .map_err(anyhow::Error::msg)?;
            let output = sub
                .get_one::<String>("output")
                .ok_or_else(|| anyhow::anyhow!("--output is required"))?;
            let records = NetworkStore::new(config.store_path())?.read_all()?;
            export_to_file(output, &records, format)?;
            println!("Exported {} networks to {}", records.len(), output);
        }
        Some(("settings", sub)) => run_settings(&config, sub)?,
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
