use anyhow::{Context, Result};
use clap::{Arg, Command};
use graduate_map::logging::init_logger;
use graduate_map::models::API_KEY_VAR;
use graduate_map::output::print_summary;
use graduate_map::{run_dashboard, ApiKey, Config};
use log::LevelFilter;
use std::path::Path;
use std::process;

fn cli() -> Command {
    Command::new("graduate-map")
        .version("1.0")
        .about("Maps where residency graduates work and summarizes the roster")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("URL_OR_PATH")
                .help("Roster source, overrides sheet_url from the configuration"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory, overrides output_directory from the configuration"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Minimum log level")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("info"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let log_level: LevelFilter = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info")
        .parse()
        .context("Invalid log level")?;
    init_logger(log_level).context("Failed to initialize logger")?;

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration from {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default()
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write {}", config_file))?;
        println!(
            "⚠️  Please review {} and set {} in the environment, then run the program again.",
            config_file, API_KEY_VAR
        );
        return Ok(());
    };

    if let Some(source) = matches.get_one::<String>("source") {
        config.sheet_url = source.clone();
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = output.clone();
    }

    println!("🔍 Building graduate map from: {}", config.sheet_url);
    println!("📄 Output directory: {}", config.output_directory);

    match run_dashboard(&config, ApiKey::from_env()).await {
        Ok(report) => {
            print_summary(&report.statistics, &config.title, &report.outputs);
            println!("\n✅ Done! Open {} in a browser.", report.map_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ graduate-map error: {:#}", anyhow::Error::from(e));
            process::exit(1);
        }
    }
}
