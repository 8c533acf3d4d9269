//! Pipeline orchestration for the `resolve` and `rules` commands.
//!
//! Hard ordering barrier: the registry is fully built and published
//! before any matching starts. Matching then runs in parallel over the
//! read-only indexes.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use cmed_ingest::{TransactionCsvOptions, read_registry_csv, read_transaction_csv};
use cmed_match::{BatchOptions, Matcher, resolve_batch};
use cmed_model::{CmedError, ConsolidateOptions, MatchOptions, RunSummary};
use cmed_normalize::{Normalizer, RuleTable, RuleTableSpec};
use cmed_registry::build_registry;
use cmed_report::{
    SummaryInputs, build_summary, consolidate_output, triage_groups, write_manifest,
    write_resolved_csv, write_triage_csv,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cli::{ResolveArgs, RulesArgs};

/// Paths and summary of one completed run.
pub struct RunOutputs {
    pub summary: RunSummary,
    pub output_dir: PathBuf,
    pub resolved_csv: PathBuf,
    pub manifest: PathBuf,
    pub triage_csv: PathBuf,
}

pub fn run_resolve(args: &ResolveArgs) -> anyhow::Result<RunOutputs> {
    let started = Instant::now();

    let table = load_rule_table(args.rule_table.as_deref())?;
    let normalizer = Normalizer::new(table).context("compile correction rules")?;

    let (registry_rows, registry_ingest) = read_registry_csv(&args.registry)
        .with_context(|| format!("read registry {}", args.registry.display()))?;
    let consolidate_options = ConsolidateOptions {
        gap_tolerance_days: args.gap_tolerance.unwrap_or_default(),
    };
    let (registry, registry_stats) =
        build_registry(&registry_rows, &normalizer, &consolidate_options)
            .context("build canonical registry")?;

    let source_id = args.source_id.clone().unwrap_or_else(|| {
        args.transactions
            .file_name()
            .map_or_else(|| "transactions".to_string(), |n| n.to_string_lossy().into_owned())
    });
    let (transactions, transaction_ingest) = read_transaction_csv(
        &args.transactions,
        &TransactionCsvOptions::new(source_id),
    )
    .with_context(|| format!("read transactions {}", args.transactions.display()))?;
    if transactions.is_empty() {
        return Err(CmedError::EmptyTransactions.into());
    }

    let matcher = Matcher::new(&registry, &normalizer, match_options(args))
        .context("prepare matcher")?;
    let batch_options = BatchOptions {
        time_budget: args.time_budget.map(Duration::from_secs),
        ..BatchOptions::default()
    };

    let progress = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let outcome = resolve_batch(&matcher, &transactions, &batch_options, |done| {
        progress.set_message(format!("{done} workloads scored"));
        progress.tick();
    });
    progress.finish_and_clear();

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        args.transactions
            .parent()
            .map_or_else(|| PathBuf::from("output"), |p| p.join("output"))
    });
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;

    let table = consolidate_output(&transactions, &outcome.results, &registry)
        .context("consolidate output")?;
    let resolved_csv = output_dir.join("resolved.csv");
    let manifest = output_dir.join("resolved.manifest.json");
    let triage_csv = output_dir.join("unresolved_triage.csv");
    write_resolved_csv(&resolved_csv, &table)?;
    write_manifest(&manifest, &table, outcome.budget_expired)?;
    let groups = triage_groups(&transactions, &outcome.results, &normalizer);
    write_triage_csv(&triage_csv, &groups)?;

    let summary = build_summary(
        &outcome.results,
        SummaryInputs {
            registry_products: registry_stats.products,
            intervals_before: registry_stats.intervals_before,
            intervals_after: registry_stats.intervals_after,
            transactions_total: transaction_ingest.rows_read,
            malformed_skipped: registry_ingest.malformed_skipped
                + transaction_ingest.malformed_skipped,
            tier2_ambiguous: outcome.tier2_ambiguous,
            duration_secs: started.elapsed().as_secs_f64(),
            incomplete_run: outcome.budget_expired,
        },
    );
    info!(
        resolved = summary.resolved_total(),
        unresolved = summary.unresolved,
        rate = format!("{:.1}%", summary.resolution_rate() * 100.0),
        "run finished"
    );

    Ok(RunOutputs {
        summary,
        output_dir,
        resolved_csv,
        manifest,
        triage_csv,
    })
}

pub fn run_rules(args: &RulesArgs) -> anyhow::Result<()> {
    let table = load_rule_table(args.rule_table.as_deref())?;
    crate::summary::print_rules(&table);
    Ok(())
}

fn load_rule_table(path: Option<&std::path::Path>) -> anyhow::Result<RuleTable> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("read rule table {}", path.display()))?;
            let spec: RuleTableSpec = serde_json::from_str(&content)
                .with_context(|| format!("parse rule table {}", path.display()))?;
            RuleTable::from_spec(&spec).context("compile rule table override")
        }
        None => RuleTable::builtin().context("compile built-in rule table"),
    }
}

fn match_options(args: &ResolveArgs) -> MatchOptions {
    let mut options = MatchOptions::default();
    if let Some(threshold) = args.threshold {
        options.acceptance_threshold = threshold;
    }
    if let Some(weight) = args.weight_name {
        options.weights.name = weight;
    }
    if let Some(weight) = args.weight_ingredient {
        options.weights.ingredient = weight;
    }
    if let Some(weight) = args.weight_laboratory {
        options.weights.laboratory = weight;
    }
    options
}
