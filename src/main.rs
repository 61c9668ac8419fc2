//! wxmcp - a mock weather service and the shell that drives it.
//!
//! `wxmcp serve` answers JSON-RPC requests on stdin/stdout from a fixed city
//! catalog. Every other subcommand is a client: it starts `wxmcp serve` as a
//! child process, talks to it over its stdio, and stops it again.

mod client;
mod config;
mod protocol;
mod service;
mod weather;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{Lookup, Shell, ShellCommand};
use config::Config;
use service::WeatherService;
use std::io;
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, ExitCode};
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;
use weather::TemperatureUnit;

#[derive(Parser)]
#[command(name = "wxmcp")]
#[command(author, version, about = "Mock weather service and client shell")]
#[command(long_about = "Mock weather service speaking JSON-RPC over stdio, plus a shell that starts it as a subprocess.\n\nRun 'wxmcp shell' for the interactive client.")]
struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run the service in-process instead of spawning a child
    #[arg(long, global = true)]
    embedded: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the weather service on stdin/stdout
    Serve,
    /// Interactive shell (reads commands from stdin when it is not a terminal)
    Shell,
    /// List the cities the service knows about
    Cities,
    /// Show the current weather for a city
    Weather {
        city: String,
        /// Read the weather://city resource instead of calling the getWeather tool
        #[arg(long)]
        resource: bool,
    },
    /// Convert a temperature between celsius and fahrenheit
    Convert {
        #[arg(allow_negative_numbers = true)]
        value: f64,
        #[arg(long)]
        from: TemperatureUnit,
        #[arg(long)]
        to: TemperatureUnit,
    },
    /// Print the weather prompt for a city
    Prompt { city: String },
    /// List the service's resources, tools, and prompts
    Describe,
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => handle_serve().await,
        Commands::Config => handle_config(cli.config),
        Commands::Shell => {
            let config = load_config(cli.config, cli.embedded)?;
            handle_shell(config).await
        }
        Commands::Cities => one_shot(cli.config, cli.embedded, ShellCommand::Cities).await,
        Commands::Weather { city, resource } => {
            let config = load_config(cli.config, cli.embedded)?;
            handle_weather(config, &city, resource).await
        }
        Commands::Convert { value, from, to } => {
            let command = ShellCommand::Convert { value, from, to };
            one_shot(cli.config, cli.embedded, command).await
        }
        Commands::Prompt { city } => {
            one_shot(cli.config, cli.embedded, ShellCommand::Prompt(city)).await
        }
        Commands::Describe => one_shot(cli.config, cli.embedded, ShellCommand::Describe).await,
    }
}

/// Log to stderr; stdout belongs to the protocol or to command output.
fn init_logging(default_directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(default_directive.parse::<Directive>()?),
        )
        .init();
    Ok(())
}

fn load_config(path: Option<PathBuf>, embedded: bool) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if embedded {
        config.server.embedded = true;
    }
    Ok(config)
}

/// Run the weather service until stdin closes.
async fn handle_serve() -> Result<ExitCode> {
    init_logging("wxmcp=info")?;
    info!("Starting weather service on stdio...");

    WeatherService::default().run_stdio().await?;

    info!("Weather service exiting");
    Ok(ExitCode::SUCCESS)
}

/// TUI on a terminal, script mode otherwise.
async fn handle_shell(config: Config) -> Result<ExitCode> {
    let auto_start = config.client.auto_start;
    let mut shell = Shell::new(config);

    if atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout) {
        let result = client::run_tui(&mut shell, auto_start).await;
        shell.shutdown().await;
        result?;
        return Ok(ExitCode::SUCCESS);
    }

    init_logging("wxmcp=warn")?;
    if auto_start {
        match shell.start().await {
            Ok(message) => println!("{}", message),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let failures = client::run_script(&mut shell, stdin, &mut io::stdout(), &mut io::stderr())
        .await?;

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Start a shell with the service running, or report why it could not start.
async fn started_shell(config: Config) -> Option<Shell> {
    let mut shell = Shell::new(config);
    match shell.start().await {
        Ok(_) => Some(shell),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Start the service, run one command, print its output, stop the service.
async fn one_shot(path: Option<PathBuf>, embedded: bool, command: ShellCommand) -> Result<ExitCode> {
    init_logging("wxmcp=warn")?;
    let config = load_config(path, embedded)?;
    let Some(mut shell) = started_shell(config).await else {
        return Ok(ExitCode::FAILURE);
    };

    let result = shell.execute(command).await;
    shell.shutdown().await;

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Like `one_shot`, but an unknown city exits non-zero.
async fn handle_weather(config: Config, city: &str, resource: bool) -> Result<ExitCode> {
    init_logging("wxmcp=warn")?;
    let Some(mut shell) = started_shell(config).await else {
        return Ok(ExitCode::FAILURE);
    };

    let city = shell.resolve_city(city);
    let result = if resource {
        shell.read_city(&city).await
    } else {
        shell.select_city(&city).await
    };
    shell.shutdown().await;

    match result {
        Ok(lookup @ Lookup::Found(_)) => {
            println!("{}", client::shell::format_lookup(&city, &lookup));
            Ok(ExitCode::SUCCESS)
        }
        Ok(Lookup::NotFound(message)) => {
            println!("{}", message);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Handle the config command.
fn handle_config(path: Option<PathBuf>) -> Result<ExitCode> {
    let config_path = match path {
        Some(path) => path,
        None => Config::config_path()?,
    };

    // Create default config if it doesn't exist
    if !config_path.exists() {
        Config::default().save_to(&config_path)?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
