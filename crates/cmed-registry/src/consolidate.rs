//! The vigency consolidator.
//!
//! Source price tables republish a product's row on every edition, so one
//! product accumulates dozens of intervals that differ only in dates.
//! Consolidation merges chronologically contiguous, attribute-identical
//! snapshots into maximal intervals without losing a day of coverage.

use cmed_model::{ConsolidateOptions, ValidityInterval};

/// Merge one product's validity intervals.
///
/// The walk is: stable sort by start, collapse duplicate starts (most
/// complete snapshot wins, source order breaks remaining ties), merge
/// contiguous equal-snapshot runs, then close or truncate any interval
/// that would otherwise overlap its successor. The later start wins an
/// attribute conflict, matching how a new table edition supersedes the
/// previous one.
pub fn consolidate(
    mut intervals: Vec<ValidityInterval>,
    options: &ConsolidateOptions,
) -> Vec<ValidityInterval> {
    if intervals.len() < 2 {
        return intervals;
    }
    intervals.sort_by_key(|interval| interval.start);

    let mut deduped: Vec<ValidityInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match deduped.last_mut() {
            Some(last) if last.start == interval.start => {
                if interval.snapshot.completeness() > last.snapshot.completeness() {
                    *last = interval;
                }
            }
            _ => deduped.push(interval),
        }
    }

    let mut merged: Vec<ValidityInterval> = Vec::with_capacity(deduped.len());
    for interval in deduped {
        match merged.last_mut() {
            Some(last)
                if last.snapshot == interval.snapshot
                    && is_contiguous(last, &interval, options) =>
            {
                last.end = match (last.end, interval.end) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) => Some(a.max(b)),
                };
            }
            _ => merged.push(interval),
        }
    }

    for idx in 0..merged.len().saturating_sub(1) {
        let next_start = merged[idx + 1].start;
        let must_close = match merged[idx].end {
            None => true,
            Some(end) => end >= next_start,
        };
        if must_close {
            merged[idx].end = next_start.pred_opt();
        }
    }
    merged
}

fn is_contiguous(
    last: &ValidityInterval,
    next: &ValidityInterval,
    options: &ConsolidateOptions,
) -> bool {
    match last.end {
        // An open-ended run swallows any later equal-snapshot interval.
        None => true,
        Some(end) => (next.start - end).num_days() <= options.gap_tolerance_days + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cmed_model::AttributeSnapshot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(pf_20: Option<f64>, pmvg_20: Option<f64>) -> AttributeSnapshot {
        AttributeSnapshot {
            pf_0: None,
            pf_20,
            pmvg_0: None,
            pmvg_20,
            cap: false,
            icms_zero: false,
        }
    }

    fn interval(
        start: NaiveDate,
        end: Option<NaiveDate>,
        snap: AttributeSnapshot,
    ) -> ValidityInterval {
        ValidityInterval {
            start,
            end,
            snapshot: snap,
        }
    }

    #[test]
    fn contiguous_identical_intervals_merge_without_losing_coverage() {
        let merged = consolidate(
            vec![
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 3, 31)),
                    snapshot(Some(10.0), None),
                ),
                interval(
                    date(2023, 4, 1),
                    Some(date(2023, 6, 30)),
                    snapshot(Some(10.0), None),
                ),
                interval(
                    date(2023, 7, 1),
                    Some(date(2023, 12, 31)),
                    snapshot(Some(10.0), None),
                ),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, date(2023, 1, 1));
        assert_eq!(merged[0].end, Some(date(2023, 12, 31)));
        assert_eq!(merged[0].span_days(), Some(365));
    }

    #[test]
    fn attribute_change_breaks_the_run() {
        let merged = consolidate(
            vec![
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 3, 31)),
                    snapshot(Some(10.0), None),
                ),
                interval(
                    date(2023, 4, 1),
                    Some(date(2023, 6, 30)),
                    snapshot(Some(11.0), None),
                ),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end, Some(date(2023, 3, 31)));
        assert_eq!(merged[1].start, date(2023, 4, 1));
    }

    #[test]
    fn gap_beyond_tolerance_breaks_the_run() {
        let inputs = vec![
            interval(
                date(2023, 1, 1),
                Some(date(2023, 1, 31)),
                snapshot(Some(10.0), None),
            ),
            interval(
                date(2023, 2, 2),
                Some(date(2023, 2, 28)),
                snapshot(Some(10.0), None),
            ),
        ];
        let strict = consolidate(inputs.clone(), &ConsolidateOptions::default());
        assert_eq!(strict.len(), 2);

        let tolerant = consolidate(
            inputs,
            &ConsolidateOptions {
                gap_tolerance_days: 1,
            },
        );
        assert_eq!(tolerant.len(), 1);
        assert_eq!(tolerant[0].end, Some(date(2023, 2, 28)));
    }

    #[test]
    fn duplicate_start_keeps_most_complete_snapshot() {
        let merged = consolidate(
            vec![
                interval(date(2023, 1, 1), Some(date(2023, 1, 31)), snapshot(None, None)),
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 1, 31)),
                    snapshot(Some(10.0), Some(8.0)),
                ),
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 1, 31)),
                    snapshot(Some(99.0), None),
                ),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].snapshot.pf_20, Some(10.0));
    }

    #[test]
    fn duplicate_start_ties_keep_source_order() {
        let merged = consolidate(
            vec![
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 1, 31)),
                    snapshot(Some(1.0), None),
                ),
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 1, 31)),
                    snapshot(Some(2.0), None),
                ),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged[0].snapshot.pf_20, Some(1.0));
    }

    #[test]
    fn open_end_is_closed_by_the_next_edition() {
        let merged = consolidate(
            vec![
                interval(date(2023, 1, 1), None, snapshot(Some(10.0), None)),
                interval(date(2023, 7, 1), None, snapshot(Some(11.0), None)),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end, Some(date(2023, 6, 30)));
        assert_eq!(merged[1].end, None);
    }

    #[test]
    fn overlap_with_different_snapshot_is_truncated_at_the_newer_start() {
        let merged = consolidate(
            vec![
                interval(
                    date(2023, 1, 1),
                    Some(date(2023, 12, 31)),
                    snapshot(Some(10.0), None),
                ),
                interval(
                    date(2023, 7, 1),
                    Some(date(2023, 12, 31)),
                    snapshot(Some(11.0), None),
                ),
            ],
            &ConsolidateOptions::default(),
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end, Some(date(2023, 6, 30)));
        assert_eq!(merged[1].start, date(2023, 7, 1));
    }

    #[test]
    fn output_count_never_exceeds_input_count() {
        let inputs = vec![
            interval(
                date(2023, 1, 1),
                Some(date(2023, 1, 31)),
                snapshot(Some(10.0), None),
            ),
            interval(
                date(2023, 3, 1),
                Some(date(2023, 3, 31)),
                snapshot(Some(10.0), None),
            ),
            interval(
                date(2023, 5, 1),
                Some(date(2023, 5, 31)),
                snapshot(Some(12.0), None),
            ),
        ];
        let count = inputs.len();
        let merged = consolidate(inputs, &ConsolidateOptions::default());
        assert!(merged.len() <= count);
        assert_eq!(merged.len(), 3);
    }
}
