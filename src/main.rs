use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use dependency_miner::config::{self, ConfigError, MinerConfig};
use dependency_miner::ecosystem::{Ecosystem, UnknownEcosystem};
use dependency_miner::graph::SqliteGraphStore;
use dependency_miner::logging;
use dependency_miner::pipeline::{
    Crawler, DependencyGraphResolver, ErrorLog, LatestTargetResolver, VersionChainBuilder,
};
use dependency_miner::registry::{NpmRegistry, NugetRegistry, Registry};

#[derive(Parser)]
#[command(name = "dependency-miner")]
#[command(version, about = "Mine npm and NuGet registries into a dependency graph")]
struct Cli {
    /// Registry to mine: npm or nuget
    #[arg(short, long)]
    ecosystem: String,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Graph database file (defaults to the data directory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Worker count for every phase
    #[arg(short, long)]
    workers: Option<usize>,

    /// Hop bound for current target search
    #[arg(long)]
    max_depth: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Copy registry releases into the graph
    Crawl,
    /// Create constraint nodes and their edges
    Resolve,
    /// Link releases of each library in version order
    Chain,
    /// Resolve the current target of each constraint
    Target,
    /// Run crawl, resolve, chain and target in order
    All,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Crawl => "crawl",
            Command::Resolve => "resolve",
            Command::Chain => "chain",
            Command::Target => "target",
            Command::All => "all",
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<MinerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => MinerConfig::load(path)?,
            None => MinerConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.resolver.workers = workers;
            config.chain.workers = workers;
            config.target.workers = workers;
            config.crawl.workers = workers;
        }
        if let Some(max_depth) = self.max_depth {
            config.target.max_depth = max_depth;
        }

        Ok(config)
    }
}

fn registry_for(
    ecosystem: Ecosystem,
    config: &config::CrawlConfig,
) -> anyhow::Result<Arc<dyn Registry>> {
    match ecosystem {
        Ecosystem::Npm => Ok(Arc::new(NpmRegistry::new(
            &config.npm_registry_url,
            &config.npm_replicate_url,
            config.page_size,
        ))),
        Ecosystem::Nuget => Ok(Arc::new(NugetRegistry::new(&config.nuget_service_index_url))),
        Ecosystem::Unknown => Err(UnknownEcosystem(ecosystem.to_string()).into()),
    }
}

async fn run(
    command: Command,
    ecosystem: Ecosystem,
    config: MinerConfig,
    db_path: PathBuf,
) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteGraphStore::open(&db_path, ecosystem)?);
    let error_log = Arc::new(ErrorLog::open(&config::error_log_path())?);

    if matches!(command, Command::Crawl | Command::All) {
        let crawler = Crawler::new(
            Arc::clone(&store),
            registry_for(ecosystem, &config.crawl)?,
            config.crawl.clone(),
            &config::checkpoint_path(ecosystem),
            Arc::clone(&error_log),
        );
        crawler.run().await?;
    }

    if matches!(command, Command::Resolve | Command::All) {
        DependencyGraphResolver::new(
            Arc::clone(&store),
            ecosystem,
            config.resolver.clone(),
            Arc::clone(&error_log),
        )
        .run()
        .await?;
    }

    if matches!(command, Command::Chain | Command::All) {
        VersionChainBuilder::new(Arc::clone(&store), config.chain.clone(), Arc::clone(&error_log))
            .run()
            .await?;
    }

    if matches!(command, Command::Target | Command::All) {
        LatestTargetResolver::new(Arc::clone(&store), config.target.clone(), error_log)
            .run()
            .await?;
    }

    info!("Finished {} run for {}", command.name(), ecosystem);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration problems abort before any work starts
    let ecosystem: Ecosystem = cli.ecosystem.parse().map_err(ConfigError::from)?;
    let config = cli.load_config()?;
    let db_path = cli.db.clone().unwrap_or_else(|| config::db_path(ecosystem));

    let _guard = logging::init(&config::log_path())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, ecosystem, config, db_path))
}
