use airdrop_analysis::clusters::SizeBucket;
use airdrop_analysis::{cluster_transfers, ClusterLabel, ClusteringOutcome, ExclusionPolicy};
use airdrop_data::loader::{load_exclusions, load_transfers};
use airdrop_data::store::Store;
use airdrop_data::types::{Address, LoadReport, RunRecord};
use airdrop_data::writer::{write_assignments_csv, write_assignments_json};
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "data/clusters.sqlite";

#[derive(Debug, Clone)]
struct AppContext {
    db_path: String,
}

#[derive(Parser, Debug)]
#[command(name = "airdrop-cluster")]
#[command(about = "Cluster airdrop recipients by transitive transfer connectivity")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// SQLite database for persisted runs (falls back to AIRDROP_CLUSTER_DB).
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster a transfer table and write address → cluster assignments.
    Run(RunArgs),
    /// List persisted clustering runs.
    Runs,
    /// Show which clusters an address was assigned to in persisted runs.
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// CSV with an `address` column of centralized addresses.
    #[arg(long)]
    exclusions: PathBuf,

    /// Transfer table (CSV or .parquet) with AIRDROP_RECIPIENT, SENT_TO, AMOUNT, BLOCK_NUMBER.
    #[arg(long)]
    transfers: PathBuf,

    /// Cluster id prefix, e.g. `1inch_eth`.
    #[arg(long, conflicts_with_all = ["protocol", "chain"])]
    name: Option<String>,

    /// Protocol slug; combined with --chain into `{protocol}_{chain}`.
    #[arg(long, requires = "chain")]
    protocol: Option<String>,

    /// Chain slug; combined with --protocol into `{protocol}_{chain}`.
    #[arg(long, requires = "protocol")]
    chain: Option<String>,

    #[arg(long, default_value = "results.csv")]
    out: PathBuf,

    /// Output format: csv (default) or json.
    #[arg(long, default_value = "csv")]
    format: String,

    /// Number of largest clusters to show in the summary table.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Store the run and its assignments in the SQLite database. The output
    /// file is only written once the run is stored.
    #[arg(long)]
    persist: bool,
}

#[derive(Args, Debug)]
struct LookupArgs {
    #[arg(long)]
    address: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        db_path: cli
            .db_path
            .or_else(|| std::env::var("AIRDROP_CLUSTER_DB").ok())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
    };

    match cli.command {
        Commands::Run(args) => handle_run(&ctx, args),
        Commands::Runs => handle_runs(&ctx),
        Commands::Lookup(args) => handle_lookup(&ctx, args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn resolve_label(args: &RunArgs) -> Result<ClusterLabel> {
    match (&args.name, &args.protocol, &args.chain) {
        (Some(name), _, _) => ClusterLabel::new(name),
        (None, Some(protocol), Some(chain)) => ClusterLabel::from_slugs(protocol, chain),
        _ => Err(eyre!("either --name or both --protocol and --chain are required")),
    }
}

fn handle_run(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let label = resolve_label(&args)?;
    if !matches!(args.format.as_str(), "csv" | "json") {
        return Err(eyre!("unsupported output format {:?} (expected csv or json)", args.format));
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    // Both inputs must load before any clustering happens.
    pb.set_message("loading exclusion list");
    let exclusions = load_exclusions(&args.exclusions)
        .wrap_err("failed to load exclusion list")?;

    pb.set_message("loading transfer records");
    let (records, report) =
        load_transfers(&args.transfers).wrap_err("failed to load transfer records")?;

    pb.set_message(format!("clustering {} transfer rows", records.len()));
    let policy = ExclusionPolicy::new(exclusions);
    let outcome = cluster_transfers(&records, &policy, &label);

    // Output is written only after the run is stored.
    let run_id = if args.persist {
        pb.set_message("persisting run");
        let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
        let run = RunRecord {
            id: None,
            name: label.to_string(),
            clustered_at: chrono::Utc::now().to_rfc3339(),
            rows_read: report.rows_read,
            rows_skipped: report.rows_skipped,
            edges_accepted: outcome.filter.accepted,
            address_count: outcome.stats.address_count,
            cluster_count: outcome.stats.cluster_count,
        };
        Some(
            store
                .insert_run(&run, &outcome.assignments)
                .wrap_err("failed to persist clustering run")?,
        )
    } else {
        None
    };

    pb.set_message("writing assignments");
    let written = match args.format.as_str() {
        "json" => write_assignments_json(&args.out, &outcome.assignments)?,
        _ => write_assignments_csv(&args.out, &outcome.assignments)?,
    };
    pb.finish_and_clear();

    print_cluster_table(&outcome, args.top);
    print_summary_table(&outcome, &report, policy.centralized_count());

    info!(
        label = %label,
        rows_read = report.rows_read,
        rows_skipped = report.rows_skipped,
        written,
        out = %args.out.display(),
        run_id,
        "run command completed"
    );

    Ok(())
}

fn print_cluster_table(outcome: &ClusteringOutcome, top: usize) {
    if outcome.clusters.is_empty() || top == 0 {
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Rank", "Cluster ID", "Addresses", "Edges", "Representative"]);

    for cluster in outcome.clusters.iter().take(top) {
        table.add_row(vec![
            cluster.rank.to_string(),
            cluster.cluster_id.clone(),
            cluster.size().to_string(),
            cluster.edge_count.to_string(),
            truncate_hash(cluster.representative().as_str()),
        ]);
    }

    println!("\n{table}\n");
}

fn print_summary_table(outcome: &ClusteringOutcome, report: &LoadReport, centralized: usize) {
    let filter = &outcome.filter;
    let stats = &outcome.stats;

    let mut summary = Table::new();
    summary.load_preset(UTF8_BORDERS_ONLY);
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_row(vec!["Centralized addresses".to_string(), centralized.to_string()]);
    summary.add_row(vec!["Rows read".to_string(), report.rows_read.to_string()]);
    summary.add_row(vec![
        "Rows skipped (malformed)".to_string(),
        report.rows_skipped.to_string(),
    ]);
    summary.add_row(vec!["Transfers accepted".to_string(), filter.accepted.to_string()]);
    summary.add_row(vec![
        "Rejected: amount <= 0".to_string(),
        filter.non_positive_amount.to_string(),
    ]);
    summary.add_row(vec![
        "Rejected: centralized recipient".to_string(),
        filter.excluded_recipient.to_string(),
    ]);
    summary.add_row(vec![
        "Rejected: excluded sink".to_string(),
        filter.excluded_sink.to_string(),
    ]);
    summary.add_row(vec!["Distinct edges".to_string(), stats.edge_count.to_string()]);
    summary.add_row(vec!["Clustered addresses".to_string(), stats.address_count.to_string()]);
    summary.add_row(vec!["Clusters".to_string(), stats.cluster_count.to_string()]);
    summary.add_row(vec!["Largest cluster".to_string(), stats.largest_cluster.to_string()]);
    println!("{summary}\n");

    if stats.cluster_count == 0 {
        println!("No transfers passed the edge filter; output is empty.\n");
        return;
    }

    let mut histogram = Table::new();
    histogram.load_preset(UTF8_BORDERS_ONLY);
    histogram.set_header(vec!["Cluster size", "Clusters"]);
    for (bucket, count) in &stats.size_histogram {
        if *bucket == SizeBucket::One && *count == 0 {
            continue;
        }
        histogram.add_row(vec![bucket.label().to_string(), count.to_string()]);
    }
    println!("{histogram}\n");
}

fn handle_runs(ctx: &AppContext) -> Result<()> {
    let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let runs = store.list_runs().wrap_err("failed to query clustering runs")?;

    if runs.is_empty() {
        println!("No clustering runs stored in {}", ctx.db_path);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Run", "Name", "Clustered At", "Rows", "Skipped", "Edges", "Addresses", "Clusters",
    ]);
    for run in &runs {
        table.add_row(vec![
            run.id.map(|id| id.to_string()).unwrap_or_default(),
            run.name.clone(),
            run.clustered_at.clone(),
            run.rows_read.to_string(),
            run.rows_skipped.to_string(),
            run.edges_accepted.to_string(),
            run.address_count.to_string(),
            run.cluster_count.to_string(),
        ]);
    }
    println!("\n{table}\n");

    info!(runs = runs.len(), "runs command completed");
    Ok(())
}

fn handle_lookup(ctx: &AppContext, args: LookupArgs) -> Result<()> {
    let address = Address::parse(&args.address)
        .ok_or_else(|| eyre!("--address must not be empty"))?;

    let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let history = store
        .lookup_address(&address)
        .wrap_err_with(|| format!("failed to look up {address}"))?;

    if history.is_empty() {
        println!("{address} is not clustered in any stored run");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Run", "Name", "Clustered At", "Cluster ID", "Rank"]);
    for row in &history {
        table.add_row(vec![
            row.run_id.to_string(),
            row.run_name.clone(),
            row.clustered_at.clone(),
            row.cluster_id.clone(),
            row.rank.to_string(),
        ]);
    }
    println!("\n{table}\n");

    info!(address = %address, runs = history.len(), "lookup command completed");
    Ok(())
}

/// Truncate a hex address for compact table display.
fn truncate_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() > 14 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    } else {
        hash.to_string()
    }
}
