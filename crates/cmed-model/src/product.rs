//! Canonical registry entries and their time-bounded commercial attributes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Barcode, ProductId, RegistrationNumber};

/// Snapshot of the mutable commercial attributes of a product over one
/// validity interval. Two intervals with equal snapshots and contiguous
/// dates are merged by the vigency consolidator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// Factory price, 0% ICMS band.
    pub pf_0: Option<f64>,
    /// Factory price, 20% ICMS band.
    pub pf_20: Option<f64>,
    /// Government ceiling price, 0% ICMS band.
    pub pmvg_0: Option<f64>,
    /// Government ceiling price, 20% ICMS band.
    pub pmvg_20: Option<f64>,
    /// Whether the product falls under the CAP rebate regime.
    pub cap: bool,
    /// Whether the product is ICMS-exempt.
    pub icms_zero: bool,
}

impl AttributeSnapshot {
    /// Effective ceiling price under the CMED selection rule: CAP products
    /// use the PMVG column, others the PF column, each in the ICMS band
    /// the product is taxed in.
    pub fn ceiling_price(&self) -> Option<f64> {
        match (self.cap, self.icms_zero) {
            (true, true) => self.pmvg_0,
            (true, false) => self.pmvg_20,
            (false, true) => self.pf_0,
            (false, false) => self.pf_20,
        }
    }

    /// Number of non-null price fields. Used to break ties between
    /// duplicate source rows with the same validity start.
    pub fn completeness(&self) -> usize {
        [self.pf_0, self.pf_20, self.pmvg_0, self.pmvg_20]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}

/// A time span over which a product's commercial attributes are constant.
///
/// `end` is `None` for an open-ended interval (still in force).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityInterval {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub snapshot: AttributeSnapshot,
}

impl ValidityInterval {
    /// Whether `date` falls inside this interval (inclusive bounds).
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }

    /// Day count of the interval, `None` when open-ended.
    pub fn span_days(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_days() + 1)
    }
}

/// One distinct registered pharmaceutical product.
///
/// All text fields hold the canonical (normalized) form; the raw source
/// strings stay in the ingest layer. Intervals are ordered by start date
/// and non-overlapping after consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: ProductId,
    pub ingredient: String,
    pub name: String,
    pub presentation: String,
    pub laboratory: String,
    pub therapeutic_class: String,
    /// Up to three EAN codes from the source table.
    pub barcodes: Vec<Barcode>,
    pub registration: Option<RegistrationNumber>,
    pub intervals: Vec<ValidityInterval>,
}

impl CanonicalProduct {
    /// The interval in force on `date`, when any. With consolidated,
    /// ordered intervals the last one starting at or before `date` is the
    /// only candidate.
    pub fn interval_at(&self, date: NaiveDate) -> Option<&ValidityInterval> {
        self.intervals
            .iter()
            .rev()
            .find(|interval| interval.start <= date)
            .filter(|interval| interval.covers(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pf_20: Option<f64>) -> AttributeSnapshot {
        AttributeSnapshot {
            pf_0: None,
            pf_20,
            pmvg_0: None,
            pmvg_20: None,
            cap: false,
            icms_zero: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ceiling_price_follows_cap_icms_matrix() {
        let snap = AttributeSnapshot {
            pf_0: Some(1.0),
            pf_20: Some(2.0),
            pmvg_0: Some(3.0),
            pmvg_20: Some(4.0),
            cap: true,
            icms_zero: false,
        };
        assert_eq!(snap.ceiling_price(), Some(4.0));
        let no_cap = AttributeSnapshot { cap: false, ..snap };
        assert_eq!(no_cap.ceiling_price(), Some(2.0));
    }

    #[test]
    fn interval_at_picks_covering_interval() {
        let product = CanonicalProduct {
            id: ProductId::new("P1").unwrap(),
            ingredient: "DIPIRONA".to_string(),
            name: "DIPIRONA".to_string(),
            presentation: "20 COMPRIMIDOS".to_string(),
            laboratory: "LAB A".to_string(),
            therapeutic_class: "N02B".to_string(),
            barcodes: vec![],
            registration: None,
            intervals: vec![
                ValidityInterval {
                    start: date(2023, 1, 1),
                    end: Some(date(2023, 6, 30)),
                    snapshot: snapshot(Some(10.0)),
                },
                ValidityInterval {
                    start: date(2023, 7, 1),
                    end: None,
                    snapshot: snapshot(Some(11.0)),
                },
            ],
        };
        let hit = product.interval_at(date(2023, 3, 15)).unwrap();
        assert_eq!(hit.snapshot.pf_20, Some(10.0));
        let open = product.interval_at(date(2024, 1, 1)).unwrap();
        assert_eq!(open.snapshot.pf_20, Some(11.0));
        assert!(product.interval_at(date(2022, 12, 31)).is_none());
    }

    #[test]
    fn interval_at_respects_gaps() {
        let product = CanonicalProduct {
            id: ProductId::new("P2").unwrap(),
            ingredient: String::new(),
            name: String::new(),
            presentation: String::new(),
            laboratory: String::new(),
            therapeutic_class: String::new(),
            barcodes: vec![],
            registration: None,
            intervals: vec![ValidityInterval {
                start: date(2023, 1, 1),
                end: Some(date(2023, 1, 31)),
                snapshot: snapshot(None),
            }],
        };
        assert!(product.interval_at(date(2023, 2, 15)).is_none());
    }
}
