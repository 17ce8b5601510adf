use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sshid::{
    commands,
    paths::{CONFIG_ENV, Paths},
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "sshid")]
#[command(about = "SSH Identity Switcher - choose which private key ssh uses for a host")]
#[command(version)]
struct Cli {
    /// SSH config file to read and edit [default: ~/.ssh/config]
    #[arg(long, global = true, value_name = "PATH", env = CONFIG_ENV)]
    config: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the IdentityFile ssh would use for a host
    Active {
        /// Hostname as passed to ssh (e.g. github.com)
        host: String,

        /// Print a JSON report instead of the bare path
        #[arg(long)]
        json: bool,
    },

    /// Make a key the active identity for a host
    Use {
        /// Hostname to configure
        host: String,

        /// Private key path (e.g. ~/.ssh/id_work); prompts when omitted
        key: Option<String>,

        /// Do not check that the key file exists
        #[arg(long)]
        no_verify: bool,
    },

    /// List Host blocks and their IdentityFile
    Hosts {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List key pairs in ~/.ssh and the hosts using them
    Keys,

    /// Run diagnostics on the SSH config setup
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sshid=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new(cli.config.as_deref())?;
    let ui = Ui::new(cli.color, cli.no_color);

    match cli.command {
        Commands::Active { host, json } => commands::active(&paths, &host, json, &ui),
        Commands::Use {
            host,
            key,
            no_verify,
        } => commands::use_key(&paths, &host, key, no_verify, &ui),
        Commands::Hosts { json } => commands::hosts(&paths, json, &ui),
        Commands::Keys => commands::keys(&paths, &ui),
        Commands::Doctor => commands::doctor(&paths, &ui),
        Commands::Completions { .. } => Ok(()),
    }
}
