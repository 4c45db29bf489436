use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use rcxi_core::time::unix_millis_to_iso8601;
use rcxi_core::{GraphConfig, HashEmbedder, PropagationGraph, Session, import_json};
use rcxi_store::{SessionConfig, Store, default_data_dir};

#[derive(Parser)]
#[command(name = "rcxi", about = "RC+xi recursive state engine CLI")]
struct Cli {
    /// Data directory (default: $RCXI_DATA_DIR or ~/.rcxi)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Session name
    #[arg(long, global = true, default_value = "default")]
    session: String,

    /// TOML session config, used when a new session is created
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed each non-empty line of a file through the session
    Run {
        /// Input text file
        file: PathBuf,

        /// Engine RNG seed (overrides the config seed)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the session's consciousness snapshot as JSON
    Snapshot,

    /// Print stored memory records
    History {
        /// Only the newest N records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export the session to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import a session from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// List stored sessions
    Sessions,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run { file, seed } => cmd_run(&cli, file, *seed),
        Commands::Snapshot => cmd_snapshot(&cli),
        Commands::History { limit } => cmd_history(&cli, *limit),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
        Commands::Sessions => cmd_sessions(&cli),
    }
}

fn open_store(cli: &Cli) -> Result<Store> {
    let dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    Store::open_dir(&dir).with_context(|| format!("failed to open store in {}", dir.display()))
}

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

/// Rebuild a stored session. The embedder follows the stored engine's dimension.
fn resume_session(payload: &str, seed: Option<u64>) -> Result<Session<HashEmbedder>> {
    let imported = import_json(payload, seed).context("failed to decode stored session")?;
    let embedder = HashEmbedder::new(imported.engine.dimension());
    let graph = match imported.graph {
        Some(graph) => graph,
        None => PropagationGraph::new(GraphConfig::default())
            .context("failed to build default graph")?,
    };
    Session::from_parts(imported.id, imported.engine, graph, embedder)
        .context("failed to rebuild session")
}

fn require_session(cli: &Cli, store: &Store) -> Result<Session<HashEmbedder>> {
    let Some(payload) = store.load_session(&cli.session)? else {
        bail!("no session named {:?}", cli.session);
    };
    resume_session(&payload, None)
}

fn cmd_run(cli: &Cli, file: &Path, seed: Option<u64>) -> Result<()> {
    let store = open_store(cli)?;
    let config = load_config(cli)?;
    let seed = seed.or(config.seed);

    let mut session = match store.load_session(&cli.session)? {
        Some(payload) => {
            tracing::info!(session = %cli.session, "resuming stored session");
            resume_session(&payload, seed)?
        }
        None => {
            let embedder = HashEmbedder::new(config.engine.dimension);
            Session::new(config.engine, config.graph, embedder, seed)
                .context("failed to create session")?
        }
    };

    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut steps = 0usize;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let report = session
            .step(line)
            .with_context(|| format!("step failed on line {line:?}"))?;
        let payload = session.export_json().context("failed to serialize session")?;
        store
            .checkpoint(&cli.session, &session.record(1), &payload)
            .context("failed to save step")?;
        println!(
            "#{:<4} {:<12} xi={:.6} local={:.6} node={}",
            report.sequence_index,
            report.phase.as_str(),
            report.tension.xi,
            report.local_tension,
            report.origin_node
        );
        steps += 1;
    }

    if steps == 0 {
        let payload = session.export_json().context("failed to serialize session")?;
        store
            .save_session(&cli.session, &payload)
            .context("failed to save session")?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&session.snapshot().to_record())?
    );
    tracing::info!(session = %cli.session, steps, "run complete");
    Ok(())
}

fn cmd_snapshot(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let session = require_session(cli, &store)?;
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

fn cmd_history(cli: &Cli, limit: Option<usize>) -> Result<()> {
    let store = open_store(cli)?;
    let records = store
        .load_records(&cli.session, limit)
        .context("failed to load records")?;
    if records.is_empty() {
        println!("(no records)");
        return Ok(());
    }
    for record in &records {
        let peaks: Vec<String> = record
            .glyph_peaks
            .iter()
            .map(|(k, m)| format!("{k}:{m:.4}"))
            .collect();
        println!(
            "#{:<4} {}  tension={:.6}  attractors={}  peaks=[{}]",
            record.sequence_index,
            unix_millis_to_iso8601(record.timestamp),
            record.tension,
            record.attractor_count,
            peaks.join(" ")
        );
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let Some(payload) = store.load_session(&cli.session)? else {
        bail!("no session named {:?}", cli.session);
    };
    fs::write(path, &payload).with_context(|| format!("failed to write {}", path.display()))?;
    println!("exported {} to {}", cli.session, path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let payload =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    // Validate before storing
    let session = resume_session(&payload, Some(0))?;
    store
        .save_session(&cli.session, &payload)
        .context("failed to save session")?;
    println!(
        "imported {} as {}: {} states, next sequence {}",
        session.id(),
        cli.session,
        session.engine().history_len(),
        session.engine().latest().map_or(1, |s| s.sequence_index + 1)
    );
    Ok(())
}

fn cmd_sessions(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let sessions = store.list_sessions().context("failed to list sessions")?;
    if sessions.is_empty() {
        println!("(no sessions)");
    }
    for summary in sessions {
        println!(
            "{:<24} updated {}  records={}",
            summary.name,
            summary.updated_at,
            store.record_count(&summary.name)?
        );
    }
    Ok(())
}
