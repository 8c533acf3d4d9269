//! Canonical registry construction from raw price-table rows.
//!
//! Identity of a product is the normalized tuple (ingredient, name,
//! presentation, laboratory): the government table republishes the same
//! product across editions with cosmetic spelling differences, and the
//! normalizer is what folds those editions onto one entry.

use std::collections::BTreeMap;

use cmed_ingest::RegistryRowRaw;
use cmed_model::{
    AttributeSnapshot, Barcode, CanonicalProduct, CmedError, ConsolidateOptions, MatchedVia,
    ProductId, RegistrationNumber, Result, ValidityInterval,
};
use cmed_normalize::{FieldKind, NOT_SPECIFIED, Normalizer};
use tracing::{debug, info};

use crate::consolidate::consolidate;
use crate::index::Registry;

/// Counters from one registry build, surfaced in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub rows_in: usize,
    /// Administrative test/placeholder rows dropped before grouping.
    pub rows_excluded: usize,
    pub products: usize,
    pub intervals_before: usize,
    pub intervals_after: usize,
}

#[derive(Default)]
struct Draft {
    therapeutic_class: String,
    registration: Option<RegistrationNumber>,
    /// Barcodes per source column, in first-seen order.
    ean_slots: [Vec<Barcode>; 3],
    intervals: Vec<ValidityInterval>,
}

/// Build the canonical registry. Fatal when no product survives; nothing
/// downstream may run against an empty registry.
pub fn build_registry(
    rows: &[RegistryRowRaw],
    normalizer: &Normalizer,
    options: &ConsolidateOptions,
) -> Result<(Registry, RegistryStats)> {
    let mut stats = RegistryStats {
        rows_in: rows.len(),
        ..RegistryStats::default()
    };

    let mut drafts: BTreeMap<(String, String, String, String), Draft> = BTreeMap::new();
    for row in rows {
        if normalizer.should_exclude(&row.product)
            || normalizer.should_exclude(&row.ingredient)
            || normalizer.should_exclude(&row.presentation)
        {
            stats.rows_excluded += 1;
            continue;
        }

        let key = (
            normalizer.normalize(&row.ingredient, FieldKind::Ingredient),
            normalizer.normalize(&row.product, FieldKind::ProductName),
            normalizer.normalize(&row.presentation, FieldKind::Presentation),
            normalizer.normalize(&row.laboratory, FieldKind::Laboratory),
        );
        let draft = drafts.entry(key).or_default();

        if draft.therapeutic_class.is_empty() && !row.therapeutic_class.trim().is_empty() {
            draft.therapeutic_class =
                normalizer.normalize(&row.therapeutic_class, FieldKind::Presentation);
        }
        if draft.registration.is_none() {
            draft.registration = row
                .registration
                .as_deref()
                .and_then(RegistrationNumber::parse);
        }
        let slots = [&row.ean1, &row.ean2, &row.ean3];
        for (slot, raw) in slots.into_iter().enumerate() {
            if let Some(barcode) = raw.as_deref().and_then(Barcode::parse) {
                let known = draft.ean_slots.iter().flatten().any(|b| *b == barcode);
                if !known {
                    draft.ean_slots[slot].push(barcode);
                }
            }
        }
        draft.intervals.push(ValidityInterval {
            start: row.vig_start,
            end: row.vig_end,
            snapshot: AttributeSnapshot {
                pf_0: row.pf_0,
                pf_20: row.pf_20,
                pmvg_0: row.pmvg_0,
                pmvg_20: row.pmvg_20,
                cap: row.cap,
                icms_zero: row.icms_zero,
            },
        });
    }

    if drafts.is_empty() {
        return Err(CmedError::EmptyRegistry);
    }

    let mut products = Vec::with_capacity(drafts.len());
    // Key material per slot; concatenated in slot order so that EAN 1
    // entries win collisions over EAN 2, and so on, registration last.
    let mut slot_keys: [Vec<(String, ProductId, MatchedVia)>; 4] = Default::default();
    let mut descriptions = Vec::with_capacity(drafts.len());

    for (seq, ((ingredient, name, presentation, laboratory), draft)) in
        drafts.into_iter().enumerate()
    {
        let id = ProductId::new(format!("P{:06}", seq + 1))?;
        stats.intervals_before += draft.intervals.len();
        let intervals = consolidate(draft.intervals, options);
        stats.intervals_after += intervals.len();

        let vias = [MatchedVia::Ean1, MatchedVia::Ean2, MatchedVia::Ean3];
        for (slot, via) in vias.into_iter().enumerate() {
            for barcode in &draft.ean_slots[slot] {
                slot_keys[slot].push((barcode.as_str().to_string(), id.clone(), via));
            }
        }
        if let Some(registration) = &draft.registration {
            slot_keys[3].push((
                registration.as_str().to_string(),
                id.clone(),
                MatchedVia::Registration,
            ));
        }

        let description = if presentation.is_empty() || presentation == NOT_SPECIFIED {
            name.clone()
        } else {
            format!("{name} {presentation}")
        };
        descriptions.push((description, id.clone()));

        products.push(CanonicalProduct {
            id,
            ingredient,
            name,
            presentation,
            laboratory,
            therapeutic_class: draft.therapeutic_class,
            barcodes: draft.ean_slots.into_iter().flatten().collect(),
            registration: draft.registration,
            intervals,
        });
    }

    stats.products = products.len();
    debug!(
        rows = stats.rows_in,
        excluded = stats.rows_excluded,
        "registry rows grouped"
    );
    info!(
        products = stats.products,
        intervals_before = stats.intervals_before,
        intervals_after = stats.intervals_after,
        "canonical registry built"
    );

    let keys = slot_keys.into_iter().flatten().collect();
    Ok((Registry::assemble(products, keys, descriptions), stats))
}
