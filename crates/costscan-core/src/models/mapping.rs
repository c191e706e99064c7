//! User-configured label mappings for label-anchored extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canonical fields that can carry label mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappedField {
    SupplierName,
    DocumentType,
    SubtotalTaxExcluded,
    TotalAmount,
    Currency,
    IssueDate,
    DueDate,
    DocumentNumber,
    VatRate,
    Description,
}

impl MappedField {
    pub const ALL: [MappedField; 10] = [
        Self::SupplierName,
        Self::DocumentType,
        Self::SubtotalTaxExcluded,
        Self::TotalAmount,
        Self::Currency,
        Self::IssueDate,
        Self::DueDate,
        Self::DocumentNumber,
        Self::VatRate,
        Self::Description,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SupplierName => "supplier_name",
            Self::DocumentType => "document_type",
            Self::SubtotalTaxExcluded => "subtotal_tax_excluded",
            Self::TotalAmount => "total_amount",
            Self::Currency => "currency",
            Self::IssueDate => "issue_date",
            Self::DueDate => "due_date",
            Self::DocumentNumber => "document_number",
            Self::VatRate => "vat_rate",
            Self::Description => "description",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key.trim())
    }
}

/// Per-field ordered label lists, e.g. `total_amount -> ["ukupno", "total"]`.
///
/// Read-only for the duration of a reconciliation; storage belongs to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct FieldMappings {
    labels: BTreeMap<MappedField, Vec<String>>,
}

impl FieldMappings {
    /// Empty mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in label lists for local (BHS) and English documents.
    pub fn standard() -> Self {
        Self::new()
            .with(
                MappedField::SupplierName,
                ["dobavljač", "dobavljac", "prodavac", "izdavalac", "supplier"],
            )
            .with(
                MappedField::SubtotalTaxExcluded,
                [
                    "iznos bez pdv",
                    "ukupno bez pdv",
                    "osnovica",
                    "bez pdv",
                    "subtotal",
                    "net amount",
                ],
            )
            .with(
                MappedField::TotalAmount,
                [
                    "ukupno za platiti",
                    "za platiti",
                    "za naplatu",
                    "ukupno sa pdv",
                    "ukupan iznos",
                    "ukupno",
                    "total",
                    "iznos",
                ],
            )
            .with(
                MappedField::IssueDate,
                ["datum izdavanja", "datum računa", "datum fakture", "invoice date"],
            )
            .with(
                MappedField::DueDate,
                ["datum dospijeća", "datum dospeća", "rok plaćanja", "due date"],
            )
            .with(
                MappedField::DocumentNumber,
                [
                    "broj računa",
                    "broj fakture",
                    "račun br",
                    "faktura br",
                    "broj dokumenta",
                    "invoice no",
                    "invoice number",
                ],
            )
            .with(MappedField::VatRate, ["stopa pdv", "pdv", "vat"])
            .with(MappedField::Description, ["opis", "predmet", "description"])
    }

    /// Replace the labels for one field.
    pub fn with<I, S>(mut self, field: MappedField, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(field, labels);
        self
    }

    pub fn set<I, S>(&mut self, field: MappedField, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(Into::into)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            self.labels.remove(&field);
        } else {
            self.labels.insert(field, labels);
        }
    }

    /// Labels for a field, in priority order.
    pub fn labels(&self, field: MappedField) -> &[String] {
        self.labels.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Parse the host's stored JSON blob. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<BTreeMap<String, Vec<String>>> for FieldMappings {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut mappings = FieldMappings::new();
        for (key, labels) in raw {
            match MappedField::from_key(&key) {
                Some(field) => mappings.set(field, labels),
                None => debug!("Ignoring mapping for unknown field '{}'", key),
            }
        }
        mappings
    }
}

impl From<FieldMappings> for BTreeMap<String, Vec<String>> {
    fn from(mappings: FieldMappings) -> Self {
        mappings
            .labels
            .into_iter()
            .map(|(field, labels)| (field.key().to_string(), labels))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_ignores_unknown_keys() {
        let json = r#"{
            "total_amount": ["Iznos", "Total"],
            "subtotal_tax_excluded": ["Ukupno"],
            "favourite_colour": ["blue"],
            "due_date": []
        }"#;
        let mappings = FieldMappings::from_json(json).unwrap();

        assert_eq!(mappings.labels(MappedField::TotalAmount), ["Iznos", "Total"]);
        assert_eq!(mappings.labels(MappedField::SubtotalTaxExcluded), ["Ukupno"]);
        assert!(mappings.labels(MappedField::DueDate).is_empty());
    }

    #[test]
    fn test_json_keys_are_field_names() {
        let mappings = FieldMappings::new().with(MappedField::DocumentNumber, ["Broj"]);
        let json = mappings.to_json().unwrap();
        assert!(json.contains("\"document_number\""));
        assert_eq!(FieldMappings::from_json(&json).unwrap(), mappings);
    }

    #[test]
    fn test_standard_mappings_cover_amounts() {
        let mappings = FieldMappings::standard();
        assert!(!mappings.labels(MappedField::TotalAmount).is_empty());
        assert!(!mappings.labels(MappedField::SubtotalTaxExcluded).is_empty());
        assert!(mappings.labels(MappedField::DocumentType).is_empty());
    }
}
