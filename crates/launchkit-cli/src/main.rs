mod assistant;
mod cancel;
mod cmd;
mod integrations;
mod output;
mod terminal;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "launchkit",
    about = "Scaffold a SaaS starter project through an interactive wizard",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (default: ~/.config/launchkit/config.json)
    #[arg(long, global = true, env = "LAUNCHKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the claude CLI (overrides the `claude_path` setting)
    #[arg(long, global = true, env = "LAUNCHKIT_CLAUDE")]
    claude: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project with the interactive wizard
    #[command(visible_alias = "new")]
    Create(cmd::create::CreateArgs),

    /// Read and write persistent settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Check whether domain names are registered
    Domain {
        /// Names to check; bare names are tried with every --tld
        #[arg(required = true)]
        names: Vec<String>,

        /// Top-level domains to try for bare names
        #[arg(long, value_delimiter = ',', default_value = "com,io,dev")]
        tld: Vec<String>,
    },

    /// Deploy a generated project with the Vercel CLI
    Deploy {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,

        /// Deploy to production instead of a preview
        #[arg(long)]
        prod: bool,
    },

    /// Research competitors for a product idea
    Research {
        /// Product name or idea description
        #[arg(required = true)]
        input: Vec<String>,

        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let globals = cmd::Globals {
        config: cli.config,
        claude: cli.claude,
    };

    let result = match cli.command {
        Commands::Create(args) => cmd::create::run(&globals, args),
        Commands::Config { subcommand } => cmd::config::run(&globals, subcommand),
        Commands::Domain { names, tld } => cmd::domain::run(&names, &tld),
        Commands::Deploy { dir, prod } => cmd::deploy::run(&globals, dir, prod),
        Commands::Research { input, json } => {
            cmd::research::run(&globals, &input.join(" "), json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
