use anyhow::Result;
use clap::{Parser, Subcommand};
use phoenix_core::Environment;
use phoenix_core::seed::{ConflictStrategy, MergeStrategy, WorldStrategy};
use phoenix_infrastructure::config_service::CONFIG_ENV_VAR;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "phoenix")]
#[command(
    about = "Phoenix - world snapshots, conflict analysis and cross-environment sync",
    long_about = None
)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Root of the per-environment stores (overrides the config file)
    #[arg(long, global = true, env = "PHOENIX_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Environment to operate on (LOCAL, BETA, PROD)
    #[arg(short, long = "env", global = true)]
    environment: Option<Environment>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a world into a seed package
    Export {
        world_id: String,
        /// Environment to export from (defaults to --env)
        #[arg(long)]
        from: Option<Environment>,
        /// Copy the world's attachments into the package
        #[arg(long)]
        attachments: bool,
        /// Package directory name
        #[arg(long)]
        name: Option<String>,
    },
    /// Compare a seed package with the environment
    Analyze { package: PathBuf },
    /// Import a seed package into the environment
    Import {
        package: PathBuf,
        #[command(flatten)]
        strategy: StrategyArgs,
    },
    /// Check a seed package (exit code 1 when invalid)
    Validate { package: PathBuf },
    /// List seed packages
    List,
    /// Back up every world of the environment
    Backup,
    /// List backup files
    Backups,
    /// Restore a backup file into the environment
    Restore {
        file: PathBuf,
        /// Replace worlds that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Copy worlds from one environment to another
    Transfer {
        #[arg(long)]
        from: Environment,
        #[arg(long)]
        to: Environment,
        /// World to transfer (repeatable; all worlds when omitted)
        #[arg(long = "world")]
        worlds: Vec<String>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        attachments: bool,
    },
    /// Upsert every world of one environment into another
    Sync {
        #[arg(long)]
        from: Environment,
        #[arg(long)]
        to: Environment,
    },
    /// List orphaned attachments
    Orphans {
        /// Delete them instead of only listing
        #[arg(long)]
        delete: bool,
    },
    /// List expired auto-cleanup worlds
    Cleanup {
        /// Delete them instead of only listing
        #[arg(long)]
        apply: bool,
    },
    /// Summarize the state of the environment (exit code 1 when unhealthy)
    Health,
}

/// Conflict strategy for every collection; all are required.
#[derive(clap::Args)]
struct StrategyArgs {
    #[arg(long)]
    world: WorldStrategy,
    #[arg(long)]
    users: MergeStrategy,
    #[arg(long)]
    artifacts: MergeStrategy,
    #[arg(long)]
    chats: MergeStrategy,
    #[arg(long)]
    blobs: MergeStrategy,
}

impl From<StrategyArgs> for ConflictStrategy {
    fn from(args: StrategyArgs) -> Self {
        ConflictStrategy {
            world: args.world,
            users: args.users,
            artifacts: args.artifacts,
            chats: args.chats,
            blobs: args.blobs,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("phoenix=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phoenix=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::load(cli.config, cli.data_dir, cli.environment)?;

    match cli.command {
        Commands::Export {
            world_id,
            from,
            attachments,
            name,
        } => commands::seed::export(&ctx, &world_id, from, attachments, name)?,
        Commands::Analyze { package } => commands::seed::analyze(&ctx, &package)?,
        Commands::Import { package, strategy } => {
            commands::seed::import(&ctx, &package, &strategy.into())?
        }
        Commands::Validate { package } => {
            if !commands::seed::validate(&ctx, &package)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List => commands::seed::list(&ctx)?,
        Commands::Backup => commands::environment::backup(&ctx)?,
        Commands::Backups => commands::environment::backups(&ctx)?,
        Commands::Restore { file, overwrite } => {
            commands::environment::restore(&ctx, &file, overwrite)?
        }
        Commands::Transfer {
            from,
            to,
            worlds,
            overwrite,
            attachments,
        } => commands::environment::transfer(&ctx, from, to, worlds, overwrite, attachments)?,
        Commands::Sync { from, to } => commands::environment::sync(&ctx, from, to)?,
        Commands::Orphans { delete } => commands::housekeeping::orphans(&ctx, delete)?,
        Commands::Cleanup { apply } => commands::housekeeping::cleanup(&ctx, apply)?,
        Commands::Health => {
            if !commands::housekeeping::health(&ctx)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_requires_every_strategy() {
        let missing = Cli::try_parse_from([
            "phoenix", "import", "pkg", "--world", "merge", "--users", "skip",
        ]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "phoenix", "--env", "beta", "import", "pkg", "--world", "merge", "--users", "skip",
            "--artifacts", "overwrite", "--chats", "rename", "--blobs", "merge",
        ])
        .unwrap();
        assert_eq!(cli.environment, Some(Environment::Beta));
        match cli.command {
            Commands::Import { strategy, .. } => {
                let strategy: ConflictStrategy = strategy.into();
                assert_eq!(strategy.chats, MergeStrategy::Rename);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_backups_listing_command() {
        let cli = Cli::try_parse_from(["phoenix", "backups"]).unwrap();
        assert!(matches!(cli.command, Commands::Backups));
    }
}
