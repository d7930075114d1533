//! Property tests for row classification.

use std::sync::Arc;

use proptest::prelude::*;
use review_core::RowClassification;
use review_match::IdentityResolver;
use review_model::{Identity, TypeCatalog};

fn catalog() -> Arc<TypeCatalog> {
    Arc::new(TypeCatalog::new("name", ["name", "quantity", "weight", "price"]).unwrap())
}

proptest! {
    #[test]
    fn payload_length_matches_included_columns(
        columns in proptest::collection::vec(
            ("[a-z]{0,4}", proptest::option::of(0usize..4), any::<bool>()),
            1..8,
        ),
    ) {
        let catalog = catalog();
        let cells: Vec<String> = columns.iter().map(|(text, _, _)| text.clone()).collect();
        let resolver = IdentityResolver::new(vec![Identity::new(1, "ab")]);
        let mut row = RowClassification::initialize(0, &cells, None, Arc::clone(&catalog), resolver);

        for (column, (_, tag, _)) in columns.iter().enumerate() {
            let tag = tag.map(|idx| catalog.tags()[idx].clone());
            // Duplicates are rejected; the property must hold either way.
            let _ = row.set_type(column, tag);
        }
        for (column, (_, _, included)) in columns.iter().enumerate() {
            row.set_inclusion(column, *included).unwrap();
        }

        let payload = row.build_payload();
        let included = columns.iter().filter(|(_, _, included)| *included).count();
        prop_assert_eq!(payload.len(), included);
        prop_assert_eq!(payload.types.len(), included);

        // Set types stay unique.
        let mut seen = std::collections::BTreeSet::new();
        for tag in row.types().iter().flatten() {
            prop_assert!(seen.insert(tag.clone()));
        }
    }
}
