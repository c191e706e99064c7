//! Supplier directory and own-company records, read-only inputs to matching.

use serde::{Deserialize, Deserializer, Serialize};

/// Payment terms as stored on a supplier record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentTerms {
    /// Number of days after the issue date.
    Days(i64),
    /// Free-text terms such as "Net 30" or "30 dana".
    Text(String),
}

impl From<i64> for PaymentTerms {
    fn from(days: i64) -> Self {
        Self::Days(days)
    }
}

impl From<&str> for PaymentTerms {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A supplier from the host's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub tax_id: Option<String>,
    pub contact_person: Option<String>,
    pub payment_terms: Option<PaymentTerms>,
}

impl SupplierRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The user's own company, used to keep its letterhead from matching as a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CompanyInfo {
    /// Non-empty identity fields, lowercased and trimmed.
    pub fn identity_values(&self) -> Vec<String> {
        [
            &self.name,
            &self.address,
            &self.city,
            &self.postal_code,
            &self.tax_id,
            &self.email,
            &self.phone,
        ]
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
