use anyhow::{bail, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use boat_studio::api::ApiServer;
use boat_studio::display;
use boat_studio::intake::{collect_paths, intake, load_source_file};
use boat_studio::{
    Config, HttpProcessingEndpoint, ItemStatus, LensProfile, Orchestrator, PassOutcome, QueueStore,
    ShotDynamic, SourceFile,
};

fn cli() -> Command {
    Command::new("Boat Studio")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Turns photos of boats on trailers into on-water marketing shots")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to boat-studio.toml)")
                .global(true),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the image processing server")
                .arg(Arg::new("host").long("host").value_name("HOST").help("Interface to bind"))
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Queue boat photos and run them through a processing server")
                .arg(
                    Arg::new("paths")
                        .value_name("PATH")
                        .help("Image files or directories")
                        .required(true)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("server")
                        .short('s')
                        .long("server")
                        .value_name("URL")
                        .help("Base URL of the processing server"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Output directory for generated images")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("lens")
                        .long("lens")
                        .value_name("PROFILE")
                        .help("Lens profile")
                        .value_parser(LensProfile::ALL.map(|l| l.id())),
                )
                .arg(
                    Arg::new("dynamic")
                        .long("dynamic")
                        .value_name("DYNAMIC")
                        .help("Shot dynamic")
                        .value_parser(ShotDynamic::ALL.map(|d| d.id())),
                )
                .arg(
                    Arg::new("location")
                        .short('l')
                        .long("location")
                        .value_name("TEXT")
                        .help("Where the boat should appear"),
                )
                .arg(
                    Arg::new("interiors")
                        .long("interiors")
                        .help("Showcase the interior and deck layout")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration")
                .arg(
                    Arg::new("save")
                        .long("save")
                        .value_name("FILE")
                        .help("Write the configuration to a TOML file"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Initialize logging
    if matches.get_flag("verbose") {
        tracing_subscriber::fmt()
            .with_env_filter("boat_studio=debug,tower_http=debug,info")
            .with_target(true)
            .with_thread_ids(true)
            .init();
        debug!("Verbose logging enabled");
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("boat_studio=info,warn")
            .with_target(false)
            .init();
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            debug!("{}, using defaults", e);
            Config::default()
        }),
    };
    config.apply_env();

    match matches.subcommand() {
        Some(("serve", sub)) => serve(config, sub).await,
        Some(("process", sub)) => process(config, sub).await,
        Some(("config", sub)) => show_config(config, sub),
        _ => bail!("Unknown command"),
    }
}

async fn serve(mut config: Config, matches: &ArgMatches) -> Result<()> {
    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    config.validate()?;

    info!("🚤 Boat Studio server starting...");
    if !config.provider.has_credential() {
        warn!("⚠️  Set GEMINI_API_KEY (or API_KEY) to enable image processing");
    }

    ApiServer::new(Arc::new(config)).start_background().await?
}

async fn process(mut config: Config, matches: &ArgMatches) -> Result<()> {
    if let Some(server) = matches.get_one::<String>("server") {
        config.client.server_url = server.clone();
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        config.client.output_dir = output.clone();
    }
    if let Some(lens) = matches.get_one::<String>("lens") {
        config.style.lens = LensProfile::resolve(lens);
    }
    if let Some(dynamic) = matches.get_one::<String>("dynamic") {
        config.style.dynamic = ShotDynamic::resolve(dynamic);
    }
    if let Some(location) = matches.get_one::<String>("location") {
        config.style.location = location.clone();
    }
    if matches.get_flag("interiors") {
        config.style.include_interiors = true;
    }
    config.validate()?;

    let inputs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("paths")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();

    let mut selection: Vec<SourceFile> = Vec::new();
    for path in collect_paths(&inputs) {
        match load_source_file(&path).await {
            Ok(file) => selection.push(file),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    let store = QueueStore::new();
    let progress = display::spawn_progress(&store);

    let report = intake(&store, &mut selection).await;
    for name in &report.dropped {
        warn!("Skipping {}: unsupported image type", name);
    }
    if report.accepted.is_empty() {
        progress.abort();
        bail!("No supported images found (accepted types: jpeg, png, webp, heic, heif)");
    }

    info!("📡 Processing server: {}", config.client.server_url);
    info!("📂 Output directory: {}", config.client.output_dir.display());

    let endpoint = Arc::new(HttpProcessingEndpoint::new(&config.client)?);
    let orchestrator = Orchestrator::new(store.clone(), endpoint);
    let outcome = orchestrator.run_pass(config.style.clone()).await;

    // Let the renderer drain the final updates before stopping it
    tokio::task::yield_now().await;
    progress.abort();

    let PassOutcome::Finished(summary) = outcome else {
        bail!("Nothing was processed");
    };

    let items = store.snapshot().await;
    let written = display::export_results(&items, &config.client.output_dir).await?;
    debug!("Wrote {} images", written.len());

    let failures: Vec<(String, String)> = items
        .iter()
        .filter(|item| item.status == ItemStatus::Error)
        .map(|item| (item.file.name.clone(), item.error.clone().unwrap_or_default()))
        .collect();

    for line in display::summary_lines(&summary, &store.statistics().await, &failures) {
        info!("{}", line);
    }

    Ok(())
}

fn show_config(config: Config, matches: &ArgMatches) -> Result<()> {
    config.validate()?;
    println!("{}", config.summary());

    if let Some(path) = matches.get_one::<String>("save") {
        config.save(path)?;
    }

    Ok(())
}
