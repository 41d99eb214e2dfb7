use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parcel::ParcelRecord;

/// Attribute a text search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    OwnerName,
    ParcelId,
    Address,
    LandUse,
    Region,
}

impl SearchField {
    pub const ALL: [SearchField; 5] = [
        SearchField::OwnerName,
        SearchField::ParcelId,
        SearchField::Address,
        SearchField::LandUse,
        SearchField::Region,
    ];

    /// Wire name used in the `field=` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::OwnerName => "owner_name",
            SearchField::ParcelId => "parcel_id",
            SearchField::Address => "address",
            SearchField::LandUse => "land_use",
            SearchField::Region => "region",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchField::OwnerName => "Owner Name",
            SearchField::ParcelId => "Parcel ID",
            SearchField::Address => "Address",
            SearchField::LandUse => "Land Use",
            SearchField::Region => "Region",
        }
    }

    pub fn parse(raw: &str) -> Option<SearchField> {
        Self::ALL.into_iter().find(|f| f.as_str() == raw)
    }

    /// The record attribute this field names, if the record has one.
    pub fn value_of<'a>(&self, record: &'a ParcelRecord) -> Option<&'a str> {
        let p = &record.properties;
        match self {
            SearchField::OwnerName => p.owner_name.as_deref(),
            SearchField::ParcelId => Some(p.parcel_id.as_str()),
            SearchField::Address => p.address.as_deref(),
            SearchField::LandUse => p.land_use.as_deref(),
            SearchField::Region => Some(p.region.as_str()),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSearch {
    #[error("search value is empty")]
    EmptyValue,
    #[error("unknown search field `{0}`")]
    UnknownField(String),
}

/// A validated search: the value is trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    field: SearchField,
    value: String,
}

impl SearchQuery {
    pub fn new(field: SearchField, value: &str) -> Result<Self, InvalidSearch> {
        let value = value.trim();
        if value.is_empty() {
            return Err(InvalidSearch::EmptyValue);
        }
        Ok(Self {
            field,
            value: value.to_string(),
        })
    }

    /// Build from raw wire parameters, as the backend receives them.
    pub fn from_params(field: &str, value: &str) -> Result<Self, InvalidSearch> {
        let field =
            SearchField::parse(field).ok_or_else(|| InvalidSearch::UnknownField(field.into()))?;
        Self::new(field, value)
    }

    pub fn field(&self) -> SearchField {
        self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive substring match on the searched attribute.
    pub fn matches(&self, record: &ParcelRecord) -> bool {
        let needle = self.value.to_lowercase();
        self.field
            .value_of(record)
            .is_some_and(|v| v.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::fixtures::record;

    #[test]
    fn rejects_blank_values() {
        assert_eq!(
            SearchQuery::new(SearchField::OwnerName, "   "),
            Err(InvalidSearch::EmptyValue)
        );
        assert_eq!(
            SearchQuery::new(SearchField::OwnerName, ""),
            Err(InvalidSearch::EmptyValue)
        );
    }

    #[test]
    fn trims_values() {
        let q = SearchQuery::new(SearchField::ParcelId, "  DSM001 ").expect("valid");
        assert_eq!(q.value(), "DSM001");
    }

    #[test]
    fn field_names_roundtrip_through_parse() {
        for field in SearchField::ALL {
            assert_eq!(SearchField::parse(field.as_str()), Some(field));
        }
        assert_eq!(SearchField::parse("valuation"), None);
        assert!(matches!(
            SearchQuery::from_params("valuation", "1"),
            Err(InvalidSearch::UnknownField(_))
        ));
    }

    #[test]
    fn matches_case_insensitive_substring() {
        let mut r = record("DSM001", "Dar es Salaam");
        r.properties.owner_name = Some("John Mwalimu".into());

        let q = SearchQuery::new(SearchField::OwnerName, "mwal").expect("valid");
        assert!(q.matches(&r));
        let q = SearchQuery::new(SearchField::Region, "SALAAM").expect("valid");
        assert!(q.matches(&r));
        let q = SearchQuery::new(SearchField::Address, "msasani").expect("valid");
        assert!(!q.matches(&r), "missing attribute never matches");
    }
}
