//! Invoice line items, the immutable input side of the matcher.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Barcode, TransactionId};

/// One invoice line item.
///
/// Never mutated after ingestion; the matcher only annotates it with a
/// [`crate::MatchResult`]. `description_raw` is preserved for audit, the
/// normalized form lives beside it and is used only as a matching key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Normalized barcode, when the source field held a usable one.
    pub barcode: Option<Barcode>,
    /// Raw free-text product description as invoiced.
    pub description_raw: String,
    pub quantity: f64,
    /// Total monetary value of the line item.
    pub total_value: f64,
    pub emission_date: Option<NaiveDate>,
    /// Pass-through contextual fields (issuer, municipality, ...) carried
    /// untouched into the final output.
    pub context: BTreeMap<String, String>,
}
