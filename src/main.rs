//! gator — apply a changeset to repositories and open pull requests
//!
//! Usage:
//!   gator run --config gator.toml --changeset changeset.yaml   → run against configured repositories
//!   gator run ... --repository org/name --dry-run              → one repository, diff only
//!   gator validate --changeset changeset.yaml                  → parse and summarise a changeset

use clap::{Parser, Subcommand};
use gator::{load_changeset, Orchestrator, RunContext};
use gator_core::{Configuration, RepositoryName};
use gator_git::GitCliProvider;
use gator_host::GitHubHost;
use gator_resources::create_default_registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "gator",
    about = "Apply changesets across repositories and open pull requests",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a changeset against repositories
    Run {
        /// Configuration file (TOML)
        #[arg(short, long, default_value = "gator.toml")]
        config: PathBuf,
        /// Changeset document (YAML)
        #[arg(long)]
        changeset: PathBuf,
        /// Repositories to run against, overriding the configuration (org/name)
        #[arg(short, long)]
        repository: Vec<String>,
        /// Compute diffs only; push and open nothing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Write logs to a file (in addition to stderr)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Parse a changeset and print its summary
    Validate {
        #[arg(long)]
        changeset: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { changeset } => {
            init_tracing(None);
            let registry = create_default_registry();
            let changeset = load_changeset(&registry, &changeset)?;
            println!("{}", changeset);
        }

        Commands::Run {
            config,
            changeset,
            repository,
            dry_run,
            log_file,
        } => {
            // Keep the guard alive so buffered file logs are flushed on exit
            let _guard = init_tracing(log_file.as_deref());

            let mut config = Configuration::load(&config)?;
            config.apply_env_overrides();
            if !repository.is_empty() {
                config.repositories = repository;
            }
            config.dry_run |= dry_run;
            config.validate()?;

            let repos: Vec<RepositoryName> = config.repository_names()?;
            if repos.is_empty() {
                anyhow::bail!("no repositories configured");
            }

            let host = GitHubHost::new(
                config.github_domain.clone(),
                config.github_username.clone(),
                config.github_token.clone(),
            );
            let context = RunContext::load(config, create_default_registry(), &changeset)?;
            tracing::info!("{}", context.changeset());

            let orchestrator =
                Orchestrator::new(context, Arc::new(GitCliProvider::new()), Arc::new(host));
            let report = orchestrator.run(&repos).await;
            print!("{}", report);
            if report.has_failures() {
                anyhow::bail!("{} repositories failed", report.failures());
            }
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gator=info".into());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("gator.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}
