//! Defensive parsing of the model's free-form reply.
//!
//! Replies often wrap the JSON in a markdown fence or surround it with prose.
//! Unknown keys are ignored, missing keys stay absent and a value of the wrong
//! type is treated as absent.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::invoice::rules::{parse_amount, parse_date};
use crate::models::{Currency, DocumentType, ExtractedFields, SupplierContact};

/// Alternate names models use for each canonical field.
const SUPPLIER_NAME_KEYS: &[&str] = &["supplier_name", "supplierName", "vendor_name", "vendor", "seller", "issuer"];
const DOCUMENT_TYPE_KEYS: &[&str] = &["document_type", "documentType", "type"];
const SUBTOTAL_KEYS: &[&str] = &[
    "subtotal_tax_excluded",
    "subtotalTaxExcluded",
    "subtotal",
    "net_amount",
    "amount_without_vat",
];
const TOTAL_KEYS: &[&str] = &["total_amount", "totalAmount", "total", "amount_due", "grand_total"];
const CURRENCY_KEYS: &[&str] = &["currency", "currency_code"];
const ISSUE_DATE_KEYS: &[&str] = &["issue_date", "issueDate", "invoice_date", "date"];
const DUE_DATE_KEYS: &[&str] = &["due_date", "dueDate", "payment_due_date"];
const DOCUMENT_NUMBER_KEYS: &[&str] = &["document_number", "documentNumber", "invoice_number", "number"];
const VAT_RATE_KEYS: &[&str] = &["vat_rate", "vatRate", "tax_rate"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary"];
const RAW_TEXT_KEYS: &[&str] = &["raw_text", "rawText", "text"];

/// Locate the JSON object in a reply: a fenced block first, else the span
/// from the first `{` to the last `}`.
pub fn find_json(reply: &str) -> Option<&str> {
    if let Some((_, rest)) = reply.split_once("```json") {
        if let Some(block) = rest.split("```").next().map(str::trim) {
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

fn reply_object(reply: &str) -> Option<Map<String, Value>> {
    let json = find_json(reply)?;
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => {
            debug!("Model reply JSON is not an object");
            None
        }
        Err(e) => {
            let truncated: String = json.chars().take(200).collect();
            warn!("Invalid JSON from model: {} | Raw: {}", e, truncated);
            None
        }
    }
}

/// Parse the structured guess out of a model reply.
///
/// Returns `None` for a reply without a usable JSON object or one that
/// carries none of the canonical fields.
pub fn parse_model_reply(reply: &str) -> Option<ExtractedFields> {
    let object = reply_object(reply)?;
    let nested_supplier = object.get("supplier").and_then(Value::as_object);

    let fields = ExtractedFields {
        supplier_name: text_field(&object, SUPPLIER_NAME_KEYS)
            .or_else(|| object.get("supplier").and_then(as_text))
            .or_else(|| nested_supplier.and_then(|s| text_field(s, &["name"]))),
        document_type: text_field(&object, DOCUMENT_TYPE_KEYS)
            .and_then(|t| DocumentType::parse(&t))
            .unwrap_or_default(),
        subtotal_tax_excluded: amount_field(&object, SUBTOTAL_KEYS),
        total_amount: amount_field(&object, TOTAL_KEYS),
        currency: text_field(&object, CURRENCY_KEYS)
            .and_then(|c| Currency::parse(&c.to_uppercase()))
            .unwrap_or_default(),
        issue_date: text_field(&object, ISSUE_DATE_KEYS).and_then(|d| parse_date(&d)),
        due_date: text_field(&object, DUE_DATE_KEYS).and_then(|d| parse_date(&d)),
        document_number: text_field(&object, DOCUMENT_NUMBER_KEYS)
            .or_else(|| number_as_text(&object, DOCUMENT_NUMBER_KEYS)),
        vat_rate: amount_field(&object, VAT_RATE_KEYS)
            .filter(|r| *r >= Decimal::ZERO && *r <= Decimal::ONE_HUNDRED)
            .unwrap_or_default(),
        description: text_field(&object, DESCRIPTION_KEYS),
        supplier: contact_fields(&object, nested_supplier),
    };

    if fields == ExtractedFields::default() {
        debug!("Model reply carries no canonical fields");
        return None;
    }
    Some(fields)
}

/// The document transcription the model was asked to include, if any.
pub fn reply_transcript(reply: &str) -> Option<String> {
    let object = reply_object(reply)?;
    text_field(&object, RAW_TEXT_KEYS)
}

fn contact_fields(object: &Map<String, Value>, nested: Option<&Map<String, Value>>) -> SupplierContact {
    let field = |flat: &str, inner: &str| -> Option<String> {
        text_field(object, &[flat]).or_else(|| nested.and_then(|s| text_field(s, &[inner])))
    };

    SupplierContact {
        address: field("supplier_address", "address"),
        city: field("supplier_city", "city"),
        country: field("supplier_country", "country"),
        phone: field("supplier_phone", "phone"),
        email: field("supplier_email", "email").map(|e| e.to_lowercase()),
        website: field("supplier_website", "website"),
        tax_id: field("supplier_tax_id", "tax_id"),
    }
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(as_text))
}

fn number_as_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_u64))
        .map(|n| n.to_string())
}

/// Numbers are taken as-is; strings go through locale-aware amount parsing.
fn amount_field(object: &Map<String, Value>, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => parse_amount(s.trim_end_matches('%')),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fenced_reply() {
        let reply = "Here is the data:\n```json\n{\"supplier_name\":\"Acme\",\"total_amount\":\"250,50\"}\n```\nDone.";
        let fields = parse_model_reply(reply).unwrap();

        assert_eq!(fields.supplier_name.as_deref(), Some("Acme"));
        assert_eq!(fields.total_amount, Some(Decimal::from_str("250.50").unwrap()));
    }

    #[test]
    fn test_bare_object_with_prose() {
        let reply = "Sure! {\"document_number\": \"R-17/2024\", \"currency\": \"eur\", \"issue_date\": \"15.03.24\"} Hope this helps.";
        let fields = parse_model_reply(reply).unwrap();

        assert_eq!(fields.document_number.as_deref(), Some("R-17/2024"));
        assert_eq!(fields.currency, Currency::Eur);
        assert_eq!(fields.issue_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_malformed_reply() {
        assert!(parse_model_reply("I could not read this document.").is_none());
        assert!(parse_model_reply("{\"supplier_name\": \"Acme\",").is_none());
        assert!(parse_model_reply("```json\n[1, 2, 3]\n```").is_none());
        assert!(parse_model_reply("{\"unrelated\": true}").is_none());
    }

    #[test]
    fn test_type_mismatch_is_absent() {
        let reply = r#"{
            "supplier_name": 42,
            "total_amount": {"value": 10},
            "subtotal_tax_excluded": 100.5,
            "document_type": "receipt",
            "vat_rate": 170,
            "due_date": "someday",
            "description": null
        }"#;
        let fields = parse_model_reply(reply).unwrap();

        assert_eq!(fields.supplier_name, None);
        assert_eq!(fields.total_amount, None);
        assert_eq!(fields.subtotal_tax_excluded, Some(Decimal::from_str("100.5").unwrap()));
        assert_eq!(fields.document_type, DocumentType::Invoice);
        assert_eq!(fields.vat_rate, Decimal::ZERO);
        assert_eq!(fields.due_date, None);
        assert_eq!(fields.description, None);
    }

    #[test]
    fn test_alternate_keys_and_nested_supplier() {
        let reply = r#"{
            "supplier": {"name": "Elektro Bosna d.o.o.", "city": "Sarajevo", "email": "INFO@EB.BA"},
            "invoiceDate": "ignored",
            "invoice_date": "2024-03-15",
            "total": 1170,
            "vatRate": "17%",
            "type": "Credit Note"
        }"#;
        let fields = parse_model_reply(reply).unwrap();

        assert_eq!(fields.supplier_name.as_deref(), Some("Elektro Bosna d.o.o."));
        assert_eq!(fields.supplier.city.as_deref(), Some("Sarajevo"));
        assert_eq!(fields.supplier.email.as_deref(), Some("info@eb.ba"));
        assert_eq!(fields.issue_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(fields.total_amount, Some(Decimal::from(1170)));
        assert_eq!(fields.vat_rate, Decimal::from(17));
        assert_eq!(fields.document_type, DocumentType::CreditNote);
    }

    #[test]
    fn test_reply_transcript() {
        let reply = "```json\n{\"raw_text\": \"FAKTURA 12/2024\\nUkupno 10,00\", \"total_amount\": 10}\n```";
        assert_eq!(reply_transcript(reply).as_deref(), Some("FAKTURA 12/2024\nUkupno 10,00"));
        assert_eq!(reply_transcript("no json"), None);
    }
}
