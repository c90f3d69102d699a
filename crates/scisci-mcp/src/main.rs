//! SciSci MCP Server - Entry Point
//!
//! Serves the MCP tools over stdio or HTTP, or lints skill documents.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scisci_mcp::{
    config::Config, models::ExportFormat, server::McpServer, skills, tools::ToolContext,
    tools::format_report,
};

#[derive(Parser, Debug)]
#[command(name = "scisci-mcp")]
#[command(about = "MCP server for OpenAlex and Dimensions")]
#[command(version)]
struct Cli {
    /// Email for the OpenAlex polite pool
    #[arg(long, env = "OPENALEX_EMAIL", global = true)]
    openalex_email: Option<String>,

    /// Dimensions API key (falls back to ~/.dimensions/dsl.ini)
    #[arg(long, env = "DIMENSIONS_KEY", hide_env_values = true, global = true)]
    dimensions_key: Option<String>,

    /// Root directory for saved results ({dir}/openalex, {dir}/dimensions)
    #[arg(long, env = "SCISCI_OUTPUT_DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Default on-disk format: dual, parquet, jsonl, tsv, csv
    #[arg(long, env = "SCISCI_EXPORT_FORMAT", global = true)]
    export_format: Option<ExportFormat>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server (default)
    Serve {
        /// Transport mode: stdio or http
        #[arg(long, default_value = "stdio")]
        transport: Transport,

        /// HTTP server port (only used with --transport http)
        #[arg(long, default_value = "8000", env = "PORT")]
        port: u16,

        /// Bearer token required on /mcp (only used with --transport http)
        #[arg(long, env = "MCP_SERVER_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,
    },

    /// Check SKILL.md frontmatter under a directory
    LintSkills {
        /// File or directory to lint
        path: PathBuf,

        /// Also lint every *.md that opens with a frontmatter fence
        #[arg(long)]
        all_markdown: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// Standard input/output
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

// Logs go to stderr; stdout carries the stdio transport.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(email) = &cli.openalex_email {
        config.openalex_email = Some(email.clone());
    }
    if let Some(key) = &cli.dimensions_key {
        config.dimensions_key = Some(key.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(format) = cli.export_format {
        config.export_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let command = cli.command.take().unwrap_or(Command::Serve {
        transport: Transport::Stdio,
        port: 8000,
        auth_token: None,
    });

    match command {
        Command::Serve { transport, port, auth_token } => {
            let mut config = build_config(&cli)?;
            if auth_token.is_some() {
                config.auth_token = auth_token;
            }

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                transport = ?transport,
                polite_pool = config.openalex_email.is_some(),
                dimensions = config.has_dimensions_key(),
                "Starting SciSci MCP server"
            );

            let auth_token = config.auth_token.clone();
            let server = McpServer::new(ToolContext::new(config)?);
            match transport {
                Transport::Stdio => server.run_stdio().await?,
                Transport::Http => server.run_http(port, auth_token).await?,
            }
        }
        Command::LintSkills { path, all_markdown } => {
            let report = skills::lint_directory(&path, all_markdown)?;
            println!("{}", format_report(&report));
            let failed = report.failures().count();
            if failed > 0 {
                anyhow::bail!("{failed} skill file(s) failed lint");
            }
        }
    }

    Ok(())
}
