//! AgenticLogo: entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_logo::{LogoRequest, DEFAULT_ENTITY, DEFAULT_PREFIX};
use agentic_logo_cli::commands::{self, FindSettings};
use agentic_logo_cli::config::{
    load_pipeline_config, resolve_output_dir, resolve_rank_endpoint, resolve_rank_token,
    ENV_RANK_ENDPOINT,
};

#[derive(Parser)]
#[command(
    name = "agentic-logo",
    about = "AgenticLogo: find the canonical logo image for an entity from its web page",
    version
)]
struct Cli {
    /// Path to a JSON pipeline config file.
    /// Also reads from LOGO_CONFIG env var.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the best logo for a page and print the result as JSON.
    Find {
        /// Page URL to scan.
        #[arg(long)]
        url: String,

        /// Entity name, e.g. the company or university.
        #[arg(long, default_value = "")]
        name: String,

        /// Entity kind matched against alt text.
        #[arg(long, default_value = DEFAULT_ENTITY)]
        entity: String,

        /// Prompt prefix placed before the entity name.
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Directory normalized images are written to.
        /// Also reads from LOGO_OUTPUT_DIR env var.
        #[arg(long)]
        output_dir: Option<String>,

        /// Rank service endpoint.
        /// Also reads from LOGO_RANK_ENDPOINT env var.
        #[arg(long)]
        rank_endpoint: Option<String>,

        /// Authorization header value for the rank service.
        /// Also reads from LOGO_RANK_TOKEN env var.
        #[arg(long)]
        rank_token: Option<String>,
    },

    /// List candidate image URLs discovered on a page.
    Discover {
        /// Page URL to scan.
        #[arg(long)]
        url: String,

        /// Entity name.
        #[arg(long, default_value = "")]
        name: String,

        /// Entity kind matched against alt text.
        #[arg(long, default_value = DEFAULT_ENTITY)]
        entity: String,
    },

    /// Normalize a local image (png, jpeg, webp, svg) into a square PNG.
    Normalize {
        /// Input image path.
        input: PathBuf,

        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the prompt list sent to the rank service.
    Prompts {
        /// Entity name.
        #[arg(long, default_value = "")]
        name: String,

        /// Prompt prefix placed before the entity name.
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-logo completions bash > ~/.local/share/bash-completion/completions/agentic-logo
    ///   agentic-logo completions zsh > ~/.zfunc/_agentic-logo
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_pipeline_config(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Find {
            url,
            name,
            entity,
            prefix,
            output_dir,
            rank_endpoint,
            rank_token,
        } => {
            let Some(rank_endpoint) = resolve_rank_endpoint(rank_endpoint.as_deref()) else {
                anyhow::bail!(
                    "No rank service configured. Pass --rank-endpoint or set {ENV_RANK_ENDPOINT}."
                );
            };
            let output_dir = resolve_output_dir(output_dir.as_deref());
            tracing::info!("Output dir: {}", output_dir.display());

            let request = LogoRequest {
                url,
                name,
                entity,
                prefix,
            };
            let settings = FindSettings {
                rank_endpoint,
                rank_token: resolve_rank_token(rank_token.as_deref()),
                output_dir,
                config,
            };
            commands::find(request, settings).await?
        }

        Commands::Discover { url, name, entity } => {
            commands::discover_candidates(&url, &name, &entity, config.timeout_ms).await?
        }

        Commands::Normalize { input, output } => commands::normalize_file(&input, &output, config)?,

        Commands::Prompts { name, prefix } => commands::prompts(&name, &prefix),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "agentic-logo", &mut std::io::stdout());
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
