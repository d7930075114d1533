//! Property tests for the matcher and resolver.

use proptest::prelude::*;
use review_match::{IdentityResolver, edit_distance};
use review_model::Identity;

/// Straightforward full-matrix Levenshtein used as an oracle.
fn reference_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }
    matrix[a.len()][b.len()]
}

fn name_strategy() -> impl Strategy<Value = String> {
    // Mix of Latin and Persian letters so multi-byte characters are covered.
    proptest::collection::vec(
        prop_oneof![
            proptest::char::range('a', 'e'),
            proptest::char::range('\u{0627}', '\u{062D}'),
            Just('ی'),
            Just(' '),
        ],
        0..8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn distance_to_self_is_zero(a in name_strategy()) {
        prop_assert_eq!(edit_distance(&a, &a), 0);
    }

    #[test]
    fn distance_from_empty_is_length(b in name_strategy()) {
        prop_assert_eq!(edit_distance("", &b), b.chars().count());
    }

    #[test]
    fn distance_is_symmetric(a in name_strategy(), b in name_strategy()) {
        prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
    }

    #[test]
    fn distance_matches_reference(a in name_strategy(), b in name_strategy()) {
        prop_assert_eq!(edit_distance(&a, &b), reference_distance(&a, &b));
    }

    #[test]
    fn ranked_list_covers_registry_in_order(
        names in proptest::collection::vec(name_strategy(), 0..12),
        extracted in name_strategy(),
    ) {
        let registry: Vec<Identity> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| Identity::new(idx as i64, name.clone()))
            .collect();
        let ranking = IdentityResolver::new(registry.clone()).rank(&extracted);
        let ranked = ranking.ranked_list();

        prop_assert_eq!(ranked.len(), registry.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
            if pair[0].distance == pair[1].distance {
                // Stable: ties stay in registry order.
                prop_assert!(pair[0].identity.id < pair[1].identity.id);
            }
        }
        prop_assert_eq!(ranking.best_match(), ranked.first());
    }
}

#[test]
fn persian_registry_resolves_closest_name() {
    let registry = vec![
        Identity::new(101, "علی رضایی"),
        Identity::new(102, "مریم حسینی"),
        Identity::new(103, "احمد محمدی"),
        Identity::new(104, "فاطمه کریمی"),
        Identity::new(105, "حسین جعفری"),
    ];
    let ranking = IdentityResolver::new(registry).rank("مریم حسيني");
    let best = ranking.best_match().expect("non-empty registry");
    assert_eq!(best.identity.id, 102);
    assert_eq!(best.distance, 2);
}
