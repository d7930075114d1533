//! Per-row classification state.
//!
//! A [`RowClassification`] lives for exactly one row. It tracks which
//! semantic type each column holds, which columns are submitted, operator
//! corrections to extracted text, and the identity bound to the column typed
//! as a name. Identity resolution is recomputed explicitly by every operation
//! that changes its inputs, so a binding never outlives the text or type it
//! was computed from.

use std::collections::BTreeMap;
use std::sync::Arc;

use review_match::{Candidate, IdentityResolver, Ranking};
use review_model::{Identity, PayloadValue, SavePayload, TypeCatalog, TypeTag, type_wire_name};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClassificationError;

/// Last row's choices, reused as defaults for the next row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMemory {
    pub types: Vec<Option<TypeTag>>,
    pub included: Vec<bool>,
}

impl ClassificationMemory {
    pub fn column_count(&self) -> usize {
        self.types.len()
    }
}

/// How the bound identity was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySelection {
    /// Closest registry entry by edit distance.
    BestMatch,
    /// Picked by the operator from the ranked list.
    Override(i64),
}

/// Identity resolution for the column typed as a name.
#[derive(Debug, Clone)]
pub struct NameBinding {
    column: usize,
    ranking: Ranking,
    selection: IdentitySelection,
}

impl NameBinding {
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn selection(&self) -> IdentitySelection {
        self.selection
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.selection, IdentitySelection::Override(_))
    }

    /// The bound identity; `None` only when the registry is empty.
    pub fn identity(&self) -> Option<&Identity> {
        let candidate = match self.selection {
            IdentitySelection::BestMatch => self.ranking.best_match(),
            IdentitySelection::Override(id) => self.ranking.find(id),
        };
        candidate.map(|c| &c.identity)
    }
}

#[derive(Debug, Clone)]
pub struct RowClassification {
    row_index: usize,
    cells: Vec<String>,
    corrections: BTreeMap<usize, String>,
    types: Vec<Option<TypeTag>>,
    included: Vec<bool>,
    binding: Option<NameBinding>,
    catalog: Arc<TypeCatalog>,
    resolver: IdentityResolver,
}

impl RowClassification {
    /// Seeds a row from the previous row's choices.
    ///
    /// Memory is used only when it covers exactly as many columns as the row;
    /// otherwise every column starts unset and included.
    pub fn initialize(
        row_index: usize,
        cells: &[String],
        memory: Option<&ClassificationMemory>,
        catalog: Arc<TypeCatalog>,
        resolver: IdentityResolver,
    ) -> Self {
        let column_count = cells.len();
        let (types, included) = match memory {
            Some(memory) if memory.column_count() == column_count => {
                (memory.types.clone(), memory.included.clone())
            }
            _ => (vec![None; column_count], vec![true; column_count]),
        };
        let seeded = memory.is_some_and(|m| m.column_count() == column_count);
        debug!(row_index, column_count, seeded, "initialized row classification");

        let mut row = Self {
            row_index,
            cells: cells.to_vec(),
            corrections: BTreeMap::new(),
            types,
            included,
            binding: None,
            catalog,
            resolver,
        };
        row.refresh_identity();
        row
    }

    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn column_count(&self) -> usize {
        self.cells.len()
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Current cell text, including operator corrections.
    pub fn value(&self, column: usize) -> Option<&str> {
        self.corrections
            .get(&column)
            .or_else(|| self.cells.get(column))
            .map(String::as_str)
    }

    /// Text as extracted, ignoring corrections.
    pub fn extracted_value(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn is_corrected(&self, column: usize) -> bool {
        self.corrections.contains_key(&column)
    }

    pub fn type_of(&self, column: usize) -> Option<&TypeTag> {
        self.types.get(column).and_then(Option::as_ref)
    }

    pub fn types(&self) -> &[Option<TypeTag>] {
        &self.types
    }

    pub fn is_included(&self, column: usize) -> bool {
        self.included.get(column).copied().unwrap_or(false)
    }

    /// Excluded columns keep their type but it cannot be changed.
    pub fn is_type_editable(&self, column: usize) -> bool {
        self.is_included(column)
    }

    pub fn included_count(&self) -> usize {
        self.included.iter().filter(|i| **i).count()
    }

    /// Column currently typed as a name, if any.
    pub fn name_column(&self) -> Option<usize> {
        let name = self.catalog.name_tag();
        self.types.iter().position(|t| t.as_ref() == Some(name))
    }

    /// Column other than `column` already holding `tag`.
    pub fn column_with_type(&self, tag: &TypeTag, except: Option<usize>) -> Option<usize> {
        self.types
            .iter()
            .enumerate()
            .find(|(idx, t)| Some(*idx) != except && t.as_ref() == Some(tag))
            .map(|(idx, _)| idx)
    }

    /// Tags a selector for `column` may offer: everything not used elsewhere.
    pub fn available_types(&self, column: usize) -> Vec<&TypeTag> {
        self.catalog
            .tags()
            .iter()
            .filter(|tag| self.column_with_type(tag, Some(column)).is_none())
            .collect()
    }

    pub fn binding(&self) -> Option<&NameBinding> {
        self.binding.as_ref()
    }

    pub fn bound_identity(&self) -> Option<&Identity> {
        self.binding.as_ref().and_then(NameBinding::identity)
    }

    /// Ranked registry for the name column; empty when no column is a name.
    pub fn candidates(&self) -> &[Candidate] {
        self.binding
            .as_ref()
            .map_or(&[], |binding| binding.ranking.ranked_list())
    }

    /// Assigns (or clears, with `None`) the type of one column.
    ///
    /// A tag already held by another column is rejected rather than moved.
    pub fn set_type(
        &mut self,
        column: usize,
        tag: Option<TypeTag>,
    ) -> Result<(), ClassificationError> {
        self.check_column(column)?;
        if !self.is_included(column) {
            return Err(ClassificationError::ColumnExcluded { column });
        }
        if let Some(tag) = &tag {
            if !self.catalog.contains(tag) {
                return Err(review_model::ModelError::UnknownTypeTag(tag.to_string()).into());
            }
            if let Some(other) = self.column_with_type(tag, Some(column)) {
                return Err(ClassificationError::TypeAlreadyAssigned {
                    tag: tag.to_string(),
                    column: other,
                });
            }
        }
        if self.types[column] == tag {
            return Ok(());
        }

        let was_name = self.binding.as_ref().is_some_and(|b| b.column == column);
        let is_name = tag.as_ref().is_some_and(|t| self.catalog.is_name(t));
        debug!(
            row_index = self.row_index,
            column,
            tag = tag.as_ref().map_or("", TypeTag::as_str),
            "set column type"
        );
        self.types[column] = tag;
        if was_name || is_name {
            self.refresh_identity();
        }
        Ok(())
    }

    pub fn set_inclusion(
        &mut self,
        column: usize,
        included: bool,
    ) -> Result<(), ClassificationError> {
        self.check_column(column)?;
        debug!(row_index = self.row_index, column, included, "set column inclusion");
        self.included[column] = included;
        Ok(())
    }

    /// Binds an identity from the ranked list, superseding the best match
    /// until the name text or the name column changes.
    pub fn override_identity(&mut self, id: i64) -> Result<&Identity, ClassificationError> {
        let binding = self
            .binding
            .as_mut()
            .ok_or(ClassificationError::NoNameColumn)?;
        if binding.ranking.find(id).is_none() {
            return Err(ClassificationError::UnknownIdentity { id });
        }
        binding.selection = IdentitySelection::Override(id);
        debug!(row_index = self.row_index, identity_id = id, "identity overridden");
        binding
            .identity()
            .ok_or(ClassificationError::UnknownIdentity { id })
    }

    /// Replaces the extracted text of one cell with an operator correction.
    pub fn edit_cell(
        &mut self,
        column: usize,
        text: impl Into<String>,
    ) -> Result<(), ClassificationError> {
        self.check_column(column)?;
        self.corrections.insert(column, text.into());
        debug!(row_index = self.row_index, column, "cell corrected");
        if self.name_column() == Some(column) {
            self.refresh_identity();
        }
        Ok(())
    }

    /// Drops a correction, restoring the extracted text.
    pub fn revert_cell(&mut self, column: usize) -> Result<(), ClassificationError> {
        self.check_column(column)?;
        if self.corrections.remove(&column).is_some() && self.name_column() == Some(column) {
            self.refresh_identity();
        }
        Ok(())
    }

    /// Values and types of the included columns, in column order.
    ///
    /// The name column carries the bound identity's id, or `null` when no
    /// identity is bound.
    pub fn build_payload(&self) -> SavePayload {
        let name_column = self.name_column();
        let mut payload = SavePayload::default();
        for column in 0..self.column_count() {
            if !self.included[column] {
                continue;
            }
            let value = if name_column == Some(column) {
                self.bound_identity()
                    .map_or(PayloadValue::Null, |identity| {
                        PayloadValue::Identity(identity.id)
                    })
            } else {
                PayloadValue::Text(self.value(column).unwrap_or_default().to_string())
            };
            payload.push(value, type_wire_name(self.types[column].as_ref()));
        }
        payload
    }

    /// Snapshot of the type and inclusion choices for the next row.
    pub fn memory(&self) -> ClassificationMemory {
        ClassificationMemory {
            types: self.types.clone(),
            included: self.included.clone(),
        }
    }

    fn check_column(&self, column: usize) -> Result<(), ClassificationError> {
        if column < self.column_count() {
            Ok(())
        } else {
            Err(ClassificationError::ColumnOutOfRange {
                column,
                column_count: self.column_count(),
            })
        }
    }

    fn refresh_identity(&mut self) {
        self.binding = self.name_column().map(|column| {
            let text = self.value(column).unwrap_or_default();
            let ranking = self.resolver.rank(text);
            debug!(
                row_index = self.row_index,
                column,
                candidate_count = ranking.len(),
                best_distance = ranking.best_match().map(|c| c.distance),
                "resolved name column"
            );
            NameBinding {
                column,
                ranking,
                selection: IdentitySelection::BestMatch,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<TypeCatalog> {
        Arc::new(TypeCatalog::new("name", ["name", "B-type", "weight"]).unwrap())
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(vec![Identity::new(1, "y"), Identity::new(2, "x")])
    }

    fn tag(value: &str) -> TypeTag {
        TypeTag::new(value).unwrap()
    }

    fn row(cells: &[&str]) -> RowClassification {
        let cells: Vec<String> = cells.iter().map(|c| (*c).to_string()).collect();
        RowClassification::initialize(0, &cells, None, catalog(), resolver())
    }

    #[test]
    fn fresh_row_is_unset_and_included() {
        let row = row(&["x", "y"]);
        assert_eq!(row.types(), &[None, None]);
        assert_eq!(row.included_count(), 2);
        assert!(row.binding().is_none());
    }

    #[test]
    fn name_type_triggers_resolution() {
        let mut row = row(&["x", "y"]);
        row.set_type(0, Some(tag("name"))).unwrap();
        assert_eq!(row.bound_identity().map(|i| i.id), Some(2));
        assert_eq!(row.candidates().len(), 2);
    }

    #[test]
    fn clearing_name_type_clears_binding() {
        let mut row = row(&["x", "y"]);
        row.set_type(0, Some(tag("name"))).unwrap();
        row.set_type(0, Some(tag("weight"))).unwrap();
        assert!(row.binding().is_none());
        assert!(row.bound_identity().is_none());
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut row = row(&["x", "y"]);
        row.set_type(0, Some(tag("weight"))).unwrap();
        let err = row.set_type(1, Some(tag("weight"))).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::TypeAlreadyAssigned {
                tag: "weight".to_string(),
                column: 0
            }
        );
        assert_eq!(row.type_of(1), None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut row = row(&["x"]);
        let err = row.set_type(0, Some(tag("colour"))).unwrap_err();
        assert!(matches!(err, ClassificationError::Model(_)));
    }

    #[test]
    fn available_types_exclude_other_columns() {
        let mut row = row(&["x", "y"]);
        row.set_type(0, Some(tag("name"))).unwrap();
        let for_col1: Vec<&str> = row.available_types(1).iter().map(|t| t.as_str()).collect();
        assert_eq!(for_col1, vec!["B-type", "weight"]);
        let for_col0: Vec<&str> = row.available_types(0).iter().map(|t| t.as_str()).collect();
        assert_eq!(for_col0, vec!["name", "B-type", "weight"]);
    }

    #[test]
    fn excluded_column_keeps_type_but_is_locked() {
        let mut row = row(&["x", "y"]);
        row.set_type(1, Some(tag("weight"))).unwrap();
        row.set_inclusion(1, false).unwrap();
        assert_eq!(row.type_of(1).map(TypeTag::as_str), Some("weight"));
        assert!(!row.is_type_editable(1));
        assert_eq!(
            row.set_type(1, None),
            Err(ClassificationError::ColumnExcluded { column: 1 })
        );
    }

    #[test]
    fn override_requires_name_column() {
        let mut row = row(&["x", "y"]);
        assert_eq!(
            row.override_identity(1).unwrap_err(),
            ClassificationError::NoNameColumn
        );
        row.set_type(0, Some(tag("name"))).unwrap();
        assert_eq!(
            row.override_identity(9).unwrap_err(),
            ClassificationError::UnknownIdentity { id: 9 }
        );
        assert_eq!(row.override_identity(1).unwrap().id, 1);
        assert!(row.binding().unwrap().is_overridden());
    }

    #[test]
    fn correcting_name_text_reresolves() {
        let mut row = row(&["x", "y"]);
        row.set_type(0, Some(tag("name"))).unwrap();
        row.override_identity(1).unwrap();
        row.edit_cell(0, "x").unwrap();
        let binding = row.binding().unwrap();
        assert_eq!(binding.selection(), IdentitySelection::BestMatch);
        row.edit_cell(0, "y").unwrap();
        assert_eq!(row.bound_identity().map(|i| i.id), Some(1));
        row.revert_cell(0).unwrap();
        assert_eq!(row.bound_identity().map(|i| i.id), Some(2));
        assert!(!row.is_corrected(0));
    }

    #[test]
    fn payload_substitutes_identity_and_filters_excluded() {
        let mut row = row(&["x", "y", "z"]);
        row.set_type(0, Some(tag("name"))).unwrap();
        row.set_type(1, Some(tag("B-type"))).unwrap();
        row.set_inclusion(2, false).unwrap();
        let payload = row.build_payload();
        assert_eq!(
            payload.values,
            vec![PayloadValue::Identity(2), PayloadValue::Text("y".to_string())]
        );
        assert_eq!(payload.types, vec!["name", "B-type"]);
    }

    #[test]
    fn payload_uses_null_without_registry() {
        let cells = vec!["x".to_string()];
        let mut row =
            RowClassification::initialize(0, &cells, None, catalog(), IdentityResolver::default());
        row.set_type(0, Some(tag("name"))).unwrap();
        assert_eq!(row.build_payload().values, vec![PayloadValue::Null]);
    }

    #[test]
    fn memory_seeds_matching_row_only() {
        let memory = ClassificationMemory {
            types: vec![Some(tag("name")), None],
            included: vec![true, false],
        };
        let cells = vec!["x".to_string(), "y".to_string()];
        let seeded =
            RowClassification::initialize(1, &cells, Some(&memory), catalog(), resolver());
        assert_eq!(seeded.types(), memory.types.as_slice());
        assert!(!seeded.is_included(1));
        assert_eq!(seeded.bound_identity().map(|i| i.id), Some(2));

        let wider = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let fresh = RowClassification::initialize(1, &wider, Some(&memory), catalog(), resolver());
        assert_eq!(fresh.types(), &[None, None, None]);
        assert_eq!(fresh.included_count(), 3);
        assert!(fresh.binding().is_none());
    }

    #[test]
    fn out_of_range_column() {
        let mut row = row(&["x"]);
        assert_eq!(
            row.set_inclusion(3, false),
            Err(ClassificationError::ColumnOutOfRange {
                column: 3,
                column_count: 1
            })
        );
    }
}
