//! fedchain: explore, simulate and configure the leader-fault election core.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use fedchain_node::{init_logging, simulate, LogFormat, NodeConfig, ShutdownController};
use fedchain_search::{explore, Federation, Roster, SearchContext, SlotScenario};
use fedchain_types::{DbHeight, IdentityChainId, NetworkId};

#[derive(Parser)]
#[command(name = "fedchain", about = "Leader-fault election core for a permissioned chain")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "FEDCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Network the signing payloads are bound to: "main", "test" or "local".
    #[arg(long, env = "FEDCHAIN_NETWORK")]
    network: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FEDCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FEDCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Explore every delivery order of a leader-fault election.
    Search(SearchArgs),

    /// Run a federation of in-process nodes through a silent leader.
    Simulate(SimulateArgs),

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Federated servers (leader slots).
    #[arg(long, env = "FEDCHAIN_FEDERATED")]
    federated: Option<u32>,

    /// Audit servers.
    #[arg(long, env = "FEDCHAIN_AUDIT")]
    audit: Option<u32>,

    /// Slot whose leader faulted.
    #[arg(long)]
    faulted: Option<usize>,

    /// Roster index of the node to explore (single-node search only).
    #[arg(long)]
    local: Option<u32>,

    /// Maximum deliveries along one path.
    #[arg(long, env = "FEDCHAIN_DEPTH_LIMIT")]
    depth: Option<usize>,

    /// Explore one controller per authority instead of a single node.
    #[arg(long)]
    federation: bool,

    /// Stop at the first solution.
    #[arg(long)]
    first: bool,

    /// Stop after visiting this many states.
    #[arg(long)]
    max_visits: Option<u64>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct SimulateArgs {
    #[arg(long, env = "FEDCHAIN_FEDERATED")]
    federated: Option<u32>,

    #[arg(long, env = "FEDCHAIN_AUDIT")]
    audit: Option<u32>,

    #[arg(long)]
    faulted: Option<usize>,

    /// Seconds to wait for every node to commit.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print Prometheus metrics of the first node when done.
    #[arg(long)]
    metrics: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(network) = &cli.network {
        config.network = NetworkId::parse(network);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

fn run_search(mut config: NodeConfig, args: SearchArgs) -> anyhow::Result<()> {
    if let Some(n) = args.federated {
        config.roster.federated = n;
    }
    if let Some(n) = args.audit {
        config.roster.audit = n;
    }
    if let Some(slot) = args.faulted {
        config.roster.faulted_slot = slot;
    }
    if let Some(local) = args.local {
        config.local_identity = local;
    }
    if let Some(depth) = args.depth {
        config.search.depth_limit = depth;
    }
    if args.first {
        config.search.stop_at_first_solution = true;
    }
    if args.max_visits.is_some() {
        config.search.max_visits = args.max_visits;
    }
    config.validate()?;

    let roster = Roster::simulated(
        config.roster.federated,
        config.roster.audit,
        DbHeight::new(config.roster.height),
    );
    let mut ctx = SearchContext::new(config.search.clone());
    if args.federation {
        let space = Federation::new(&roster, config.roster.faulted_slot)?;
        explore(&space, &mut ctx)?;
    } else {
        let local = IdentityChainId::from_u32(config.local_identity);
        let space = SlotScenario::new(&roster, local, config.roster.faulted_slot)?;
        explore(&space, &mut ctx)?;
    }

    let report = ctx.report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "visits {}  solutions {}  failures {}  limit hits {}  mirrors {}  collisions {}",
            report.visits,
            report.solutions,
            report.failures,
            report.limit_hits,
            report.mirrors,
            report.collisions
        );
        for (winner, count) in &report.winners {
            println!("  winner {winner}: {count}");
        }
        if let Some(path) = &report.first_solution {
            println!("first solution ({} steps):", path.len());
            for step in path {
                println!("  {step}");
            }
        }
    }
    if report.collisions > 0 {
        bail!("{} safety violations found", report.collisions);
    }
    Ok(())
}

async fn run_simulate(mut config: NodeConfig, args: SimulateArgs) -> anyhow::Result<()> {
    if let Some(n) = args.federated {
        config.roster.federated = n;
    }
    if let Some(n) = args.audit {
        config.roster.audit = n;
    }
    if let Some(slot) = args.faulted {
        config.roster.faulted_slot = slot;
    }
    config.enable_metrics |= args.metrics;

    let signals = ShutdownController::new();
    let report = tokio::select! {
        report = simulate(&config, Duration::from_secs(args.timeout_secs)) => report?,
        _ = signals.wait_for_signal() => bail!("simulation interrupted"),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (node, winner) in &report.winners {
            match winner {
                Some(w) => println!("{node}: slot {} -> {w:?}", report.faulted_slot),
                None => println!("{node}: no commit"),
            }
        }
        println!(
            "forwarded {}  votes {}  rejected {}",
            report.forwarded, report.votes_counted, report.rejected
        );
    }
    if let Some(metrics) = &report.metrics {
        println!("{metrics}");
    }
    if !report.agreed {
        bail!("nodes did not agree on a replacement for slot {}", report.faulted_slot);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(LogFormat::parse(&config.log_format), &config.log_level)?;
    tracing::debug!(network = config.network.as_str(), "configuration loaded");

    match cli.command {
        Command::Search(args) => run_search(config, args),
        Command::Simulate(args) => run_simulate(config, args).await,
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
