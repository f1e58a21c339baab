mod config;
mod generate_cmd;
mod input;
mod scan_cmd;
mod serve_cmd;
mod validate_cmd;

#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};

use glowell_core::{ExportFormat, SchemaVersion, ViolationPolicy};

use config::{GlowellConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "glowell",
    version,
    about = "Rule-based wellness plan composer with a content safety filter"
)]
struct Cli {
    /// Config file (defaults to ~/.config/glowell/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output schema version: v1 or v2 (overrides GLOWELL_SCHEMA_VERSION)
    #[arg(long, global = true)]
    schema_version: Option<SchemaVersion>,

    /// Violation policy: redact or block (overrides GLOWELL_VIOLATION_POLICY)
    #[arg(long, global = true)]
    policy: Option<ViolationPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default glowell config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate a plan from an intake JSON file (`-` for stdin)
    Generate {
        /// Intake JSON file, or `-` for stdin
        input: String,
        /// Output format: json, text or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Output file or directory (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Generation timestamp, RFC 3339 (defaults to now)
        #[arg(long, value_parser = generate_cmd::parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
    /// Normalize an intake and list validation issues
    Validate {
        /// Intake JSON file, or `-` for stdin
        input: String,
    },
    /// Run the safety filter over any JSON document
    Scan {
        /// JSON file, or `-` for stdin
        input: String,
        /// Print the rewritten document instead of failing on violations
        #[arg(long)]
        fix: bool,
    },
    /// List the active compliance rules in evaluation order
    Rules,
    /// Start the HTTP service
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides GLOWELL_SERVE_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Execute the `glowell init` command: write config file.
fn cmd_init(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config::config_path);

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg, &path)?;

    println!("Config written to {}", path.display());
    println!("  generate.version = {}", cfg.generate.version);
    println!("  generate.policy = {}", cfg.generate.policy);
    println!("  serve = {}:{}", cfg.serve.bind, cfg.serve.port);
    println!();
    println!("Add [[generate.rules]] tables to extend the built-in compliance rules.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut overrides = Overrides {
        config_path: cli.config.clone(),
        schema_version: cli.schema_version,
        policy: cli.policy,
        ..Overrides::default()
    };

    match cli.command {
        Commands::Init { force } => {
            cmd_init(cli.config, force)?;
        }
        Commands::Generate {
            input,
            format,
            output,
            at,
        } => {
            let resolved = GlowellConfig::resolve(&overrides)?;
            generate_cmd::run_generate(&resolved, &input, format, output.as_deref(), at)?;
        }
        Commands::Validate { input } => {
            validate_cmd::run_validate(&input)?;
        }
        Commands::Scan { input, fix } => {
            let resolved = GlowellConfig::resolve(&overrides)?;
            scan_cmd::run_scan(&resolved, &input, fix)?;
        }
        Commands::Rules => {
            let resolved = GlowellConfig::resolve(&overrides)?;
            scan_cmd::run_rules(&resolved)?;
        }
        Commands::Serve { bind, port } => {
            overrides.bind = bind;
            overrides.port = port;
            let resolved = GlowellConfig::resolve(&overrides)?;
            serve_cmd::run_serve(&resolved).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "glowell",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
