//! Parallel batch resolution.
//!
//! Transactions are embarrassingly parallel once the registry is
//! published: each resolution reads only the transaction and the shared
//! indexes. Invoice data repeats the same (barcode, description) pair
//! across thousands of line items, so the cascade runs once per distinct
//! pair and the outcome fans back out to every transaction carrying it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cmed_model::{Barcode, MatchResult, TransactionRecord};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cascade::{Matcher, Resolution};

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Wall-clock budget for the whole batch. Checked between chunks;
    /// on expiry the remaining work is marked unattempted, never
    /// silently dropped.
    pub time_budget: Option<Duration>,
    /// Distinct workloads scored per budget check.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            time_budget: None,
            chunk_size: 256,
        }
    }
}

/// Outcome of a batch run. `results` is index-aligned with the input
/// transactions.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<MatchResult>,
    pub tier2_ambiguous: usize,
    pub unattempted: usize,
    /// Distinct (barcode, description) workloads actually scored.
    pub distinct_workloads: usize,
    pub budget_expired: bool,
}

/// Resolve a batch of transactions against the matcher. `on_progress`
/// is called with the cumulative number of transactions whose workload
/// has been scored; chunks run in parallel internally but the callback
/// fires sequentially between chunks.
pub fn resolve_batch(
    matcher: &Matcher<'_>,
    transactions: &[TransactionRecord],
    options: &BatchOptions,
    mut on_progress: impl FnMut(usize),
) -> BatchOutcome {
    let started = Instant::now();

    // Distinct workloads in first-appearance order, for determinism.
    let mut work_of: Vec<usize> = Vec::with_capacity(transactions.len());
    let mut keys: HashMap<(Option<Barcode>, &str), usize> = HashMap::new();
    let mut representatives: Vec<&TransactionRecord> = Vec::new();
    for transaction in transactions {
        let key = (
            transaction.barcode.clone(),
            transaction.description_raw.as_str(),
        );
        let idx = *keys.entry(key).or_insert_with(|| {
            representatives.push(transaction);
            representatives.len() - 1
        });
        work_of.push(idx);
    }
    info!(
        transactions = transactions.len(),
        distinct = representatives.len(),
        "batch workload deduplicated"
    );

    let mut resolutions: Vec<Option<Resolution>> = vec![None; representatives.len()];
    let mut budget_expired = false;
    for (chunk_start, chunk) in representatives
        .chunks(options.chunk_size.max(1))
        .enumerate()
        .map(|(i, c)| (i * options.chunk_size.max(1), c))
    {
        if let Some(budget) = options.time_budget {
            if started.elapsed() >= budget {
                warn!(
                    resolved_workloads = chunk_start,
                    total_workloads = representatives.len(),
                    "wall-clock budget expired, remaining transactions left unattempted"
                );
                budget_expired = true;
                break;
            }
        }
        let chunk_results: Vec<Resolution> = chunk
            .par_iter()
            .map(|transaction| matcher.resolve(transaction))
            .collect();
        for (offset, resolution) in chunk_results.into_iter().enumerate() {
            resolutions[chunk_start + offset] = Some(resolution);
        }
        on_progress(chunk_start + chunk.len());
    }

    let mut tier2_ambiguous = 0usize;
    let mut unattempted = 0usize;
    let results = transactions
        .iter()
        .zip(&work_of)
        .map(|(transaction, &idx)| match &resolutions[idx] {
            Some(resolution) => {
                if resolution.tier2_ambiguous {
                    tier2_ambiguous += 1;
                }
                MatchResult {
                    transaction: transaction.id,
                    ..resolution.result.clone()
                }
            }
            None => {
                unattempted += 1;
                MatchResult::unattempted(transaction.id)
            }
        })
        .collect();

    BatchOutcome {
        results,
        tier2_ambiguous,
        unattempted,
        distinct_workloads: representatives.len(),
        budget_expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cmed_ingest::RegistryRowRaw;
    use cmed_model::{ConsolidateOptions, MatchOptions, MatchTier, TransactionId};
    use cmed_normalize::Normalizer;
    use cmed_registry::{Registry, build_registry};
    use std::collections::BTreeMap;

    fn registry(normalizer: &Normalizer) -> Registry {
        let rows = [RegistryRowRaw {
            ingredient: "DIPIRONA".to_string(),
            product: "DIPIRONA".to_string(),
            presentation: "20 COMPRIMIDOS".to_string(),
            laboratory: "LAB A".to_string(),
            therapeutic_class: "N02B".to_string(),
            ean1: Some("7891058001407".to_string()),
            ean2: None,
            ean3: None,
            registration: None,
            vig_start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            vig_end: None,
            pf_0: None,
            pf_20: Some(10.0),
            pmvg_0: None,
            pmvg_20: None,
            cap: false,
            icms_zero: false,
        }];
        let (registry, _) =
            build_registry(&rows, normalizer, &ConsolidateOptions::default()).unwrap();
        registry
    }

    fn transaction(seed: u8, barcode: Option<&str>, description: &str) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::from_first_16_bytes_of_sha256([seed; 32]),
            barcode: barcode.and_then(Barcode::parse),
            description_raw: description.to_string(),
            quantity: 1.0,
            total_value: 5.0,
            emission_date: None,
            context: BTreeMap::new(),
        }
    }

    #[test]
    fn results_are_aligned_and_keep_their_own_transaction_ids() {
        let normalizer = Normalizer::builtin().unwrap();
        let reg = registry(&normalizer);
        let matcher = Matcher::new(&reg, &normalizer, MatchOptions::default()).unwrap();

        let transactions = vec![
            transaction(1, Some("7891058001407"), "DIPIRONA"),
            transaction(2, Some("7891058001407"), "DIPIRONA"),
            transaction(3, None, "ALGO COMPLETAMENTE DIFERENTE"),
        ];
        let outcome = resolve_batch(&matcher, &transactions, &BatchOptions::default(), |_| {});

        assert_eq!(outcome.results.len(), 3);
        // Duplicate workload scored once, fanned out to both rows.
        assert_eq!(outcome.distinct_workloads, 2);
        assert_eq!(outcome.results[0].transaction, transactions[0].id);
        assert_eq!(outcome.results[1].transaction, transactions[1].id);
        assert_eq!(outcome.results[0].tier, MatchTier::Barcode);
        assert_eq!(outcome.results[1].tier, MatchTier::Barcode);
        assert!(!outcome.results[2].is_resolved());
        assert!(!outcome.budget_expired);
        assert_eq!(outcome.unattempted, 0);
    }

    #[test]
    fn zero_budget_marks_everything_unattempted() {
        let normalizer = Normalizer::builtin().unwrap();
        let reg = registry(&normalizer);
        let matcher = Matcher::new(&reg, &normalizer, MatchOptions::default()).unwrap();

        let transactions = vec![
            transaction(1, None, "DIPIRONA 20 COMPRIMIDOS"),
            transaction(2, None, "PARACETAMOL"),
        ];
        let options = BatchOptions {
            time_budget: Some(Duration::ZERO),
            ..BatchOptions::default()
        };
        let outcome = resolve_batch(&matcher, &transactions, &options, |_| {});

        assert!(outcome.budget_expired);
        assert_eq!(outcome.unattempted, 2);
        assert!(outcome.results.iter().all(|r| !r.attempted));
    }

    #[test]
    fn progress_reports_cumulative_workloads() {
        let normalizer = Normalizer::builtin().unwrap();
        let reg = registry(&normalizer);
        let matcher = Matcher::new(&reg, &normalizer, MatchOptions::default()).unwrap();

        let transactions: Vec<_> = (0u8..5)
            .map(|i| transaction(i, None, &format!("DESCRICAO {i}")))
            .collect();
        let options = BatchOptions {
            chunk_size: 2,
            ..BatchOptions::default()
        };
        let mut seen = Vec::new();
        let _ = resolve_batch(&matcher, &transactions, &options, |done| seen.push(done));
        assert_eq!(seen, vec![2, 4, 5]);
    }
}
