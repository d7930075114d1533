use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::time::Duration;

use anyhow::{Context, Result};
use review_core::{IdentityRegistry, ReviewConfig, ReviewSession, SaveRequest, SessionSummary};
use review_match::IdentityResolver;
use serde::Serialize;
use tracing::{debug, info};

use review_cli::console::{Console, is_finished};
use review_cli::logging::redact_value;
use review_cli::render;
use review_cli::sources::{FileExtractor, RegistrySource, SimulatedRowStore, load_table_file};

use crate::cli::{MatchArgs, RegistryArgs, ReviewArgs, TableArgs};

/// Written by `review --output`.
#[derive(Serialize)]
struct ReviewOutput<'a> {
    summary: SessionSummary,
    saved: &'a [SaveRequest],
}

pub async fn run_review(args: &ReviewArgs) -> Result<bool> {
    let mut config = ReviewConfig::load_or_default(args.config.as_deref())
        .context("load review config")?;
    if let Some(date) = args.date {
        config = config.with_processing_date(date);
    }
    let registry = RegistrySource::from_option(args.registry.registry.clone());
    let mut session = ReviewSession::start(&registry, &config)
        .await
        .context("start review session")?;

    if let Some(path) = &args.table {
        let table = load_table_file(path)
            .await
            .with_context(|| format!("load table {}", path.display()))?;
        session
            .load_table(table)
            .with_context(|| format!("review table {}", path.display()))?;
    }

    let store = SimulatedRowStore::new()
        .with_fail_every(args.fail_every)
        .with_latency(Duration::from_millis(args.latency_ms));
    let extractor = FileExtractor;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut console = Console::new(&mut session, &extractor, &store).with_candidate_limit(args.limit);
    let report = match &args.script {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open script {}", path.display()))?;
            console.run(BufReader::new(file), &mut out).await?
        }
        None => console.run(io::stdin().lock(), &mut out).await?,
    };
    info!(
        commands = report.commands,
        rejected = report.rejected,
        attempts = store.attempts(),
        "operator input finished"
    );

    if let Some(path) = &args.output {
        let saved = store.accepted();
        let output = ReviewOutput {
            summary: session.state().summary(),
            saved: &saved,
        };
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &output)
            .with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), rows = saved.len(), "saved rows written");
    }
    Ok(is_finished(&session))
}

pub async fn run_table(args: &TableArgs) -> Result<()> {
    let table = load_table_file(&args.table)
        .await
        .with_context(|| format!("load table {}", args.table.display()))?;
    println!("{}", render::extracted_table(&table));
    Ok(())
}

pub async fn run_registry(args: &RegistryArgs) -> Result<()> {
    let identities = RegistrySource::from_option(args.registry.clone())
        .fetch_identities()
        .await
        .context("load identity registry")?;
    println!("{}", render::identity_table(&identities));
    Ok(())
}

pub async fn run_match(args: &MatchArgs) -> Result<()> {
    let identities = RegistrySource::from_option(args.registry.registry.clone())
        .fetch_identities()
        .await
        .context("load identity registry")?;
    let ranking = IdentityResolver::new(identities).rank(&args.name);
    debug!(
        name = redact_value(&args.name),
        candidate_count = ranking.len(),
        "ranked registry"
    );
    let best = ranking.best_match().map(|candidate| candidate.identity.id);
    println!(
        "{}",
        render::candidate_table(ranking.ranked_list(), best, args.limit.max(1))
    );
    Ok(())
}
