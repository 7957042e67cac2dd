//! Seedable selection of example and evaluation diagrams.
//!
//! Every draw is a pure function of the pool, the request and a seed. Per-diagram
//! seeds are derived from the global seed and the diagram id, so concurrent
//! workers never share an RNG and results do not depend on execution order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::error::ScoringError;
use crate::store::DiagramStore;

/// Pool label used when the draw spans every text.
const ALL_TEXTS: &str = "<all texts>";

/// Draw `k` example diagram ids for `text_name`, never including `exclude`.
///
/// Only diagrams of the same text are eligible; `exclude` is matched exactly.
/// The result has exactly `k` distinct ids.
pub fn sample(
    pool: &DiagramStore,
    exclude: &str,
    text_name: &str,
    k: usize,
    seed: u64,
) -> Result<Vec<String>, ScoringError> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let eligible: Vec<&str> = pool
        .iter()
        .filter(|d| d.text_name == text_name && d.id != exclude)
        .map(|d| d.id.as_str())
        .collect();

    if k > eligible.len() {
        return Err(ScoringError::InsufficientPool {
            text_name: text_name.to_string(),
            requested: k,
            available: eligible.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    Ok(eligible
        .choose_multiple(&mut rng, k)
        .map(|id| id.to_string())
        .collect())
}

/// Seed for one diagram's draw, stable across runs and platforms.
pub fn derive_seed(global_seed: u64, diagram_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(diagram_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Pick `n` diagrams to evaluate from the whole store, returned in id order.
pub fn select_for_evaluation(
    store: &DiagramStore,
    n: usize,
    seed: u64,
) -> Result<Vec<String>, ScoringError> {
    let ids = store.ids();
    if n > ids.len() {
        return Err(ScoringError::InsufficientPool {
            text_name: ALL_TEXTS.to_string(),
            requested: n,
            available: ids.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut selected: Vec<String> = ids.choose_multiple(&mut rng, n).cloned().collect();
    selected.sort();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::full_diagram_rows;
    use crate::store::StoreOptions;

    fn pool() -> DiagramStore {
        let mut rows = Vec::new();
        for student in 1..=8 {
            rows.extend(full_diagram_rows(&student.to_string(), "Beton"));
        }
        for student in 1..=3 {
            rows.extend(full_diagram_rows(&student.to_string(), "Suez"));
        }
        DiagramStore::try_from_rows(&rows, &StoreOptions::default()).unwrap()
    }

    #[test]
    fn never_returns_excluded_or_other_texts() {
        let store = pool();
        for seed in 0..20 {
            let ids = sample(&store, "3_3A_Beton", "Beton", 5, seed).unwrap();
            assert_eq!(ids.len(), 5);
            assert!(!ids.contains(&"3_3A_Beton".to_string()));
            assert!(ids.iter().all(|id| id.ends_with("_Beton")));
            let mut unique = ids.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 5);
        }
    }

    #[test]
    fn exclusion_is_exact_not_substring() {
        let mut rows = Vec::new();
        for student in ["1", "11", "2"] {
            rows.extend(full_diagram_rows(student, "Beton"));
        }
        let store = DiagramStore::try_from_rows(&rows, &StoreOptions::default()).unwrap();

        // "1_3A_Beton" is a substring of "11_3A_Beton"; only the exact id goes.
        let mut ids = sample(&store, "1_3A_Beton", "Beton", 2, 7).unwrap();
        ids.sort();
        assert_eq!(ids, vec!["11_3A_Beton", "2_3A_Beton"]);

        let err = sample(&store, "1_3A_Beton", "Beton", 3, 7).unwrap_err();
        assert!(matches!(err, ScoringError::InsufficientPool { available: 2, .. }));
    }

    #[test]
    fn same_seed_same_draw() {
        let store = pool();
        let a = sample(&store, "1_3A_Beton", "Beton", 4, 42).unwrap();
        let b = sample(&store, "1_3A_Beton", "Beton", 4, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn insufficient_pool_is_an_error() {
        let store = pool();
        let err = sample(&store, "1_3A_Suez", "Suez", 3, 1).unwrap_err();
        assert_eq!(
            err,
            ScoringError::InsufficientPool {
                text_name: "Suez".into(),
                requested: 3,
                available: 2,
            }
        );
    }

    #[test]
    fn zero_examples_is_empty() {
        let store = pool();
        assert!(sample(&store, "x", "Unknown", 0, 1).unwrap().is_empty());
    }

    #[test]
    fn derived_seed_depends_on_both_inputs() {
        let a = derive_seed(1, "1_3A_Beton");
        assert_eq!(a, derive_seed(1, "1_3A_Beton"));
        assert_ne!(a, derive_seed(2, "1_3A_Beton"));
        assert_ne!(a, derive_seed(1, "2_3A_Beton"));
    }

    #[test]
    fn evaluation_subset_is_sorted_and_bounded() {
        let store = pool();
        let ids = select_for_evaluation(&store, 6, 9).unwrap();
        assert_eq!(ids.len(), 6);
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(select_for_evaluation(&store, 12, 9).is_err());
        assert_eq!(select_for_evaluation(&store, 11, 9).unwrap(), store.ids());
    }
}
