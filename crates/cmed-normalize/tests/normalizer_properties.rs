//! Property tests for the canonicalization pipeline.

use cmed_normalize::{FieldKind, NOT_SPECIFIED, Normalizer};
use proptest::prelude::*;

fn normalizer() -> Normalizer {
    Normalizer::builtin().expect("built-in normalizer")
}

/// A plausible ingredient component: letters only, no bypass tags.
fn component() -> impl Strategy<Value = String> {
    "[A-Z]{3,10}( [A-Z]{2,8})?".prop_filter("bypass tags excluded", |s| {
        !["FURP", "LQFEX", "ISOFARMA", "FRACAO"]
            .iter()
            .any(|tag| s.contains(tag))
    })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "[A-Za-z0-9 +;.À-ÿ]{0,40}") {
        let n = normalizer();
        let once = n.normalize(&raw, FieldKind::Ingredient);
        let twice = n.normalize(&once, FieldKind::Ingredient);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_never_returns_empty(raw in "[A-Za-z +;]{0,20}") {
        let n = normalizer();
        let out = n.normalize(&raw, FieldKind::Ingredient);
        prop_assert!(!out.is_empty());
    }

    #[test]
    fn combination_is_order_invariant(a in component(), b in component()) {
        let n = normalizer();
        let ab = n.normalize(&format!("{a} + {b}"), FieldKind::Ingredient);
        let ba = n.normalize(&format!("{b} + {a}"), FieldKind::Ingredient);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn normalize_is_deterministic(raw in "[A-Za-z0-9 +;]{0,40}") {
        let first = normalizer().normalize(&raw, FieldKind::Description);
        let second = normalizer().normalize(&raw, FieldKind::Description);
        prop_assert_eq!(first, second);
    }
}

#[test]
fn sentinel_is_a_fixed_point() {
    let n = normalizer();
    assert_eq!(
        n.normalize(NOT_SPECIFIED, FieldKind::Ingredient),
        NOT_SPECIFIED
    );
}
