//! Semantic column types.
//!
//! The set of tags an operator may assign is configuration: a [`TypeCatalog`]
//! lists every tag and names the one whose column resolves against the
//! identity registry. "Unset" is modelled as `Option::<TypeTag>::None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Wire value used for a column that has not been classified yet.
pub const UNSET_TYPE: &str = "";

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidTypeTag(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeTag {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders an optional tag the way the persistence collaborator expects it.
pub fn type_wire_name(tag: Option<&TypeTag>) -> String {
    tag.map_or_else(|| UNSET_TYPE.to_string(), |t| t.as_str().to_string())
}

/// Closed, ordered set of semantic types offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct TypeCatalog {
    name: TypeTag,
    tags: Vec<TypeTag>,
}

#[derive(Deserialize)]
struct RawCatalog {
    name: String,
    tags: Vec<String>,
}

impl TryFrom<RawCatalog> for TypeCatalog {
    type Error = ModelError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        TypeCatalog::new(&raw.name, raw.tags)
    }
}

impl TypeCatalog {
    /// Builds a catalog, rejecting blank or duplicate tags.
    ///
    /// `name` must be one of `tags`.
    pub fn new<I, S>(name: &str, tags: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = TypeTag::new(name)?;
        let mut parsed: Vec<TypeTag> = Vec::new();
        for raw in tags {
            let tag = TypeTag::new(raw)?;
            if parsed.contains(&tag) {
                return Err(ModelError::DuplicateTypeTag(tag.0));
            }
            parsed.push(tag);
        }
        if !parsed.contains(&name) {
            return Err(ModelError::MissingNameTag(name.0));
        }
        Ok(Self { name, tags: parsed })
    }

    /// The tag whose column is resolved against the identity registry.
    pub fn name_tag(&self) -> &TypeTag {
        &self.name
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.tags
    }

    pub fn is_name(&self, tag: &TypeTag) -> bool {
        tag == &self.name
    }

    pub fn get(&self, value: &str) -> Option<&TypeTag> {
        let value = value.trim();
        self.tags.iter().find(|t| t.as_str() == value)
    }

    /// Looks up a tag by its text, failing for anything outside the catalog.
    pub fn parse(&self, value: &str) -> Result<TypeTag, ModelError> {
        self.get(value)
            .cloned()
            .ok_or_else(|| ModelError::UnknownTypeTag(value.to_string()))
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.tags.contains(tag)
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        let tags = ["name", "quantity", "weight", "volume", "price"];
        Self {
            name: TypeTag("name".to_string()),
            tags: tags.iter().map(|t| TypeTag((*t).to_string())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_trimmed() {
        let tag = TypeTag::new("  weight ").unwrap();
        assert_eq!(tag.as_str(), "weight");
    }

    #[test]
    fn blank_tag_rejected() {
        assert!(matches!(
            TypeTag::new("   "),
            Err(ModelError::InvalidTypeTag(_))
        ));
    }

    #[test]
    fn catalog_requires_name_tag() {
        let err = TypeCatalog::new("name", ["weight", "count"]).unwrap_err();
        assert_eq!(err, ModelError::MissingNameTag("name".to_string()));
    }

    #[test]
    fn catalog_rejects_duplicates() {
        let err = TypeCatalog::new("name", ["name", "count", " count"]).unwrap_err();
        assert_eq!(err, ModelError::DuplicateTypeTag("count".to_string()));
    }

    #[test]
    fn parse_unknown_tag_fails() {
        let catalog = TypeCatalog::default();
        assert!(catalog.parse("weight").is_ok());
        assert_eq!(
            catalog.parse("colour"),
            Err(ModelError::UnknownTypeTag("colour".to_string()))
        );
    }

    #[test]
    fn unset_wire_name_is_empty() {
        assert_eq!(type_wire_name(None), "");
        let tag = TypeTag::new("price").unwrap();
        assert_eq!(type_wire_name(Some(&tag)), "price");
    }
}
