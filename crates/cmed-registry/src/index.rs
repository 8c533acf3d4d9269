//! Read-only lookup indexes published after the registry build.
//!
//! Three indexes back the matcher cascade: a 13-digit key index (EAN
//! columns first, registration numbers last) for tier 1, a normalized
//! description index for tier 2, and an inverted token index that bounds
//! the tier-3 candidate pool.

use std::collections::{BTreeSet, HashMap};

use cmed_model::{Barcode, CanonicalProduct, MatchedVia, ProductId};

/// One tier-1 index entry: the owning product and which source column
/// the key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHit {
    pub product: ProductId,
    pub via: MatchedVia,
}

/// The immutable canonical registry: products plus their lookup indexes.
///
/// Built once per run, then shared read-only across matcher workers.
#[derive(Debug)]
pub struct Registry {
    products: Vec<CanonicalProduct>,
    by_id: HashMap<ProductId, usize>,
    key_index: HashMap<String, KeyHit>,
    description_index: HashMap<String, Vec<ProductId>>,
    token_index: HashMap<String, Vec<usize>>,
}

impl Registry {
    /// Assemble the indexes. `keys` carries the raw tier-1 key material
    /// in slot order; earlier `MatchedVia` slots win key collisions, so
    /// callers must push all EAN 1 keys before EAN 2, and so on.
    pub(crate) fn assemble(
        products: Vec<CanonicalProduct>,
        keys: Vec<(String, ProductId, MatchedVia)>,
        descriptions: Vec<(String, ProductId)>,
    ) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(idx, product)| (product.id.clone(), idx))
            .collect();

        let mut key_index: HashMap<String, KeyHit> = HashMap::new();
        for (key, product, via) in keys {
            key_index.entry(key).or_insert(KeyHit { product, via });
        }

        let mut description_index: HashMap<String, Vec<ProductId>> = HashMap::new();
        for (description, product) in descriptions {
            let entry = description_index.entry(description).or_default();
            if !entry.contains(&product) {
                entry.push(product);
            }
        }
        for candidates in description_index.values_mut() {
            candidates.sort();
        }

        let mut token_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, product) in products.iter().enumerate() {
            let mut seen = BTreeSet::new();
            seen.extend(tokenize(&product.name));
            seen.extend(tokenize(&product.ingredient));
            for token in seen {
                token_index.entry(token).or_default().push(idx);
            }
        }

        Self {
            products,
            by_id,
            key_index,
            description_index,
            token_index,
        }
    }

    pub fn products(&self) -> &[CanonicalProduct] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &ProductId) -> Option<&CanonicalProduct> {
        self.by_id.get(id).map(|&idx| &self.products[idx])
    }

    /// Tier-1 lookup. The same 13-digit key space holds EAN codes and
    /// registration numbers; the hit records which one matched.
    pub fn lookup_key(&self, barcode: &Barcode) -> Option<&KeyHit> {
        self.key_index.get(barcode.as_str())
    }

    /// Tier-2 lookup: canonical products whose normalized description
    /// equals the given one. Sorted by product id.
    pub fn lookup_description(&self, normalized: &str) -> &[ProductId] {
        self.description_index
            .get(normalized)
            .map_or(&[], Vec::as_slice)
    }

    /// Tier-3 candidate pool: indexes of products sharing at least one
    /// token with the query. Ascending, deduplicated.
    pub fn candidates_sharing_tokens(&self, tokens: &BTreeSet<String>) -> Vec<usize> {
        let mut candidates = BTreeSet::new();
        for token in tokens {
            if let Some(postings) = self.token_index.get(token) {
                candidates.extend(postings.iter().copied());
            }
        }
        candidates.into_iter().collect()
    }

    pub fn product_at(&self, idx: usize) -> &CanonicalProduct {
        &self.products[idx]
    }
}

/// Split normalized text into comparison tokens. Single characters and
/// the conjunction delimiter carry no signal and are dropped.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|word| word.len() >= 2)
        .map(str::to_string)
        .collect()
}

/// Token-set Jaccard similarity in `[0, 1]`. Two empty sets count as
/// dissimilar, not identical; an empty field should never attract a match.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_tokens_and_delimiters() {
        let tokens = tokenize("DIPIRONA + CAFEINA 500 MG C");
        assert!(tokens.contains("DIPIRONA"));
        assert!(tokens.contains("CAFEINA"));
        assert!(tokens.contains("500"));
        assert!(tokens.contains("MG"));
        assert!(!tokens.contains("+"));
        assert!(!tokens.contains("C"));
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a = tokenize("DIPIRONA SODICA");
        let b = tokenize("PARACETAMOL");
        assert_eq!(jaccard(&a, &b), 0.0);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_of_empty_sets_is_zero() {
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }
}
