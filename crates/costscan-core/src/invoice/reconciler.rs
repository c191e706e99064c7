//! Field reconciler: merges the model's structured guess with pattern extractor
//! candidates into one suggestion per field.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{
    Currency, DocumentType, ExtractedFields, ExtractionConfig, FieldMappings, MappedField,
};

use super::normalize::{normalize, transliterate};
use super::rules::{
    derive_vat_rate, detect_currency, detect_document_type, extract_document_number,
    extract_supplier_contact, extract_supplier_name, extract_vat_rate, label_amounts,
    label_dates, label_percentages, label_text, label_values, offset_date, AmountExtractor,
    DateExtractor, ExtractionMatch, FieldExtractor,
};

/// Output of a reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciledFields {
    /// The suggestion set; every field is present.
    pub fields: ExtractedFields,
    /// The due date was computed from the issue date.
    pub due_synthesized: bool,
    /// Human-readable notes about fields that could not be extracted.
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

/// Combines extractor candidates per field under fixed precedence rules.
///
/// The model's guess wins wherever it has a value. Amounts are paired by the
/// regional VAT ratio, dates follow the earliest/second-earliest rule and label
/// mappings fill whatever is still missing.
pub struct FieldReconciler {
    vat_ratio: Decimal,
    ratio_tolerance: Decimal,
    default_due_days: i64,
    max_amount: Decimal,
    default_currency: Currency,
}

impl FieldReconciler {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            vat_ratio: config.vat_ratio,
            ratio_tolerance: config.vat_ratio_tolerance,
            default_due_days: config.default_due_days,
            max_amount: config.max_amount,
            default_currency: config.default_currency,
        }
    }

    /// Set the expected total/subtotal ratio and its relative tolerance.
    pub fn with_vat_ratio(mut self, ratio: Decimal, tolerance: Decimal) -> Self {
        self.vat_ratio = ratio;
        self.ratio_tolerance = tolerance;
        self
    }

    pub fn with_default_due_days(mut self, days: i64) -> Self {
        self.default_due_days = days;
        self
    }

    /// Reconcile raw recognized text, label mappings and an optional model guess.
    pub fn reconcile(
        &self,
        raw_text: &str,
        mappings: &FieldMappings,
        guess: Option<&ExtractedFields>,
    ) -> ReconciledFields {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!("Reconciling {} characters of text", raw_text.len());

        let text = normalize(raw_text);
        let mut fields = guess.cloned().unwrap_or_default();
        if guess.is_some() {
            debug!("Seeded from structured guess: missing {:?}", fields.missing_fields());
        }

        self.reconcile_amounts(&text, mappings, &mut fields);
        self.reconcile_vat_rate(&text, mappings, &mut fields);
        let due_synthesized = self.reconcile_dates(&text, mappings, &mut fields);

        if fields.document_number.is_none() {
            fields.document_number =
                extract_document_number(&text, mappings.labels(MappedField::DocumentNumber));
        }

        if fields.currency == Currency::default() {
            fields.currency = first_value(&text, mappings, MappedField::Currency, Currency::parse)
                .or_else(|| detect_currency(&text))
                .unwrap_or(self.default_currency);
        }

        if fields.document_type == DocumentType::default() {
            fields.document_type = first_value(&text, mappings, MappedField::DocumentType, |v| {
                DocumentType::parse(v).or_else(|| detect_document_type(v))
            })
            .or_else(|| detect_document_type(&text))
            .unwrap_or_default();
        }

        if fields.supplier_name.is_none() {
            fields.supplier_name = first_text(&text, mappings, MappedField::SupplierName)
                .or_else(|| extract_supplier_name(&text));
        }

        // Contact details keep their original spacing (emails, phone groups)
        fields.supplier.fill_from(extract_supplier_contact(&transliterate(raw_text)));

        if fields.description.is_none() {
            fields.description = first_text(&text, mappings, MappedField::Description);
        }

        for missing in fields.missing_fields() {
            warnings.push(format!("Could not extract {}", missing.replace('_', " ")));
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Reconciled fields in {}ms ({} warnings)",
            processing_time_ms,
            warnings.len()
        );

        ReconciledFields {
            fields,
            due_synthesized,
            warnings,
            processing_time_ms,
        }
    }

    fn reconcile_amounts(&self, text: &str, mappings: &FieldMappings, fields: &mut ExtractedFields) {
        if fields.subtotal_tax_excluded.is_none() || fields.total_amount.is_none() {
            let mut subtotals = label_amounts(text, mappings.labels(MappedField::SubtotalTaxExcluded));
            let mut totals = label_amounts(text, mappings.labels(MappedField::TotalAmount));
            resolve_label_collisions(&mut subtotals, &mut totals);

            let (subtotal, total) = self.pick_amount_pair(&subtotals, &totals);
            fields.subtotal_tax_excluded = fields.subtotal_tax_excluded.or(subtotal);
            fields.total_amount = fields.total_amount.or(total);
        }

        if fields.total_amount.is_none() {
            fields.total_amount = AmountExtractor::new()
                .with_max_amount(self.max_amount)
                .extract(text)
                .map(|m| m.value);
        }

        if let (Some(subtotal), Some(total)) = (fields.subtotal_tax_excluded, fields.total_amount) {
            if total < subtotal {
                debug!("Swapping subtotal {} and total {}", subtotal, total);
                fields.subtotal_tax_excluded = Some(total);
                fields.total_amount = Some(subtotal);
            }
        }
    }

    /// Pick a (subtotal, total) pair: first one matching the VAT ratio, then any
    /// pair with total > subtotal, then the first candidate of each field.
    fn pick_amount_pair(
        &self,
        subtotals: &[ExtractionMatch<Decimal>],
        totals: &[ExtractionMatch<Decimal>],
    ) -> (Option<Decimal>, Option<Decimal>) {
        let pairs = || {
            subtotals
                .iter()
                .flat_map(|s| totals.iter().map(move |t| (s.value, t.value)))
        };

        if let Some((subtotal, total)) = pairs().find(|(s, t)| t > s && self.matches_vat_ratio(*s, *t)) {
            debug!("Amount pair {} / {} matches the VAT ratio", subtotal, total);
            return (Some(subtotal), Some(total));
        }
        if let Some((subtotal, total)) = pairs().find(|(s, t)| t > s) {
            debug!("Amount pair {} / {} without ratio match", subtotal, total);
            return (Some(subtotal), Some(total));
        }

        (
            subtotals.first().map(|m| m.value),
            totals.first().map(|m| m.value),
        )
    }

    fn matches_vat_ratio(&self, subtotal: Decimal, total: Decimal) -> bool {
        let expected = subtotal * self.vat_ratio;
        (total - expected).abs() <= expected * self.ratio_tolerance
    }

    fn reconcile_vat_rate(&self, text: &str, mappings: &FieldMappings, fields: &mut ExtractedFields) {
        if !fields.vat_rate.is_zero() {
            return;
        }

        let rate = label_percentages(text, mappings.labels(MappedField::VatRate))
            .into_iter()
            .map(|m| m.value)
            .next()
            .or_else(|| extract_vat_rate(text))
            .or_else(|| match (fields.subtotal_tax_excluded, fields.total_amount) {
                (Some(subtotal), Some(total)) => derive_vat_rate(subtotal, total),
                _ => None,
            });

        if let Some(rate) = rate {
            fields.vat_rate = rate;
        }
    }

    /// Model dates first, then extracted dates, then label mappings.
    ///
    /// Returns whether the due date was synthesized.
    fn reconcile_dates(&self, text: &str, mappings: &FieldMappings, fields: &mut ExtractedFields) -> bool {
        let resolution = DateExtractor::new()
            .with_default_due_days(self.default_due_days)
            .extract(text);

        let first_label_date = |field: MappedField| -> Option<NaiveDate> {
            label_dates(text, mappings.labels(field))
                .into_iter()
                .map(|m| m.value)
                .next()
        };

        if fields.issue_date.is_none() {
            fields.issue_date = resolution
                .issue_date
                .as_ref()
                .map(|m| m.value)
                .or_else(|| first_label_date(MappedField::IssueDate));
        }

        if fields.due_date.is_some() {
            return false;
        }

        if !resolution.due_synthesized {
            if let Some(due) = &resolution.due_date {
                fields.due_date = Some(due.value);
                return false;
            }
        }

        if resolution.issue_date.is_none() {
            if let Some(due) = first_label_date(MappedField::DueDate) {
                fields.due_date = Some(due);
                return false;
            }
        }

        match fields.issue_date.and_then(|issue| offset_date(issue, self.default_due_days)) {
            Some(due) => {
                fields.due_date = Some(due);
                true
            }
            None => false,
        }
    }
}

impl Default for FieldReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// An amount claimed by both a subtotal and a total label goes to the longer
/// (more specific) label, e.g. "ukupno bez pdv" over "ukupno".
fn resolve_label_collisions(
    subtotals: &mut Vec<ExtractionMatch<Decimal>>,
    totals: &mut Vec<ExtractionMatch<Decimal>>,
) {
    let subtotal_claims: Vec<((usize, usize), usize)> = subtotals
        .iter()
        .filter_map(|m| m.position.map(|p| (p, m.source.chars().count())))
        .collect();

    let mut lost_by_subtotal = Vec::new();
    totals.retain(|t| {
        let Some(position) = t.position else { return true };
        match subtotal_claims.iter().find(|(p, _)| *p == position) {
            Some((_, label_len)) if *label_len >= t.source.chars().count() => false,
            Some(_) => {
                lost_by_subtotal.push(position);
                true
            }
            None => true,
        }
    });
    subtotals.retain(|s| !s.position.is_some_and(|p| lost_by_subtotal.contains(&p)));
}

fn first_value<T>(
    text: &str,
    mappings: &FieldMappings,
    field: MappedField,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    label_values(text, mappings.labels(field))
        .iter()
        .find_map(|m| parse(&m.value))
}

fn first_text(text: &str, mappings: &FieldMappings, field: MappedField) -> Option<String> {
    label_text(text, mappings.labels(field))
        .into_iter()
        .map(|m| m.value)
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount_mappings(subtotal: &str, total: &str) -> FieldMappings {
        FieldMappings::new()
            .with(MappedField::SubtotalTaxExcluded, [subtotal])
            .with(MappedField::TotalAmount, [total])
    }

    #[test]
    fn test_round_amount_reconciliation() {
        let text = "Ukupno: 1000.00\nIznos: 1170.00";
        let result = FieldReconciler::new().reconcile(text, &amount_mappings("Ukupno", "Iznos"), None);

        assert_eq!(result.fields.subtotal_tax_excluded, Some(dec("1000.00")));
        assert_eq!(result.fields.total_amount, Some(dec("1170.00")));
        assert_eq!(result.fields.vat_rate, Decimal::from(17));
    }

    #[test]
    fn test_ratio_pair_preferred_over_first_candidates() {
        let text = "Osnovica: 50,00\nOsnovica: 200,00\nZa platiti: 90,00\nZa platiti: 234,00";
        let result =
            FieldReconciler::new().reconcile(text, &amount_mappings("Osnovica", "Za platiti"), None);

        assert_eq!(result.fields.subtotal_tax_excluded, Some(dec("200.00")));
        assert_eq!(result.fields.total_amount, Some(dec("234.00")));
    }

    #[test]
    fn test_pair_without_ratio() {
        let text = "Osnovica: 100,00\nZa platiti: 150,00";
        let result =
            FieldReconciler::new().reconcile(text, &amount_mappings("Osnovica", "Za platiti"), None);

        assert_eq!(result.fields.subtotal_tax_excluded, Some(dec("100.00")));
        assert_eq!(result.fields.total_amount, Some(dec("150.00")));
    }

    #[test]
    fn test_total_never_below_subtotal() {
        let texts = [
            "Osnovica: 500,00\nZa platiti: 100,00",
            "Za platiti: 10,00\nOsnovica: 10,50",
            "Osnovica 1.170,00 Za platiti 1.000,00 KM",
            "Ukupno bez PDV: 85,47\nUkupno: 100,00",
            "Bez PDV 999.999,99\nUkupno 1,00",
        ];
        let mappings = FieldMappings::new()
            .with(MappedField::SubtotalTaxExcluded, ["osnovica", "ukupno bez pdv", "bez pdv"])
            .with(MappedField::TotalAmount, ["za platiti", "ukupno"]);
        for text in texts {
            let fields = FieldReconciler::new().reconcile(text, &mappings, None).fields;
            if let (Some(subtotal), Some(total)) = (fields.subtotal_tax_excluded, fields.total_amount) {
                assert!(total >= subtotal, "{} < {} for {:?}", total, subtotal, text);
            }
        }
    }

    #[test]
    fn test_guess_with_swapped_amounts_is_fixed() {
        let guess = ExtractedFields {
            subtotal_tax_excluded: Some(dec("117.00")),
            total_amount: Some(dec("100.00")),
            ..Default::default()
        };
        let fields = FieldReconciler::new()
            .reconcile("", &FieldMappings::new(), Some(&guess))
            .fields;

        assert_eq!(fields.subtotal_tax_excluded, Some(dec("100.00")));
        assert_eq!(fields.total_amount, Some(dec("117.00")));
    }

    #[test]
    fn test_specific_label_wins_collision() {
        let text = "Ukupno bez PDV: 85,47\nUkupno: 100,00";
        let fields = FieldReconciler::new()
            .reconcile(text, &FieldMappings::standard(), None)
            .fields;

        assert_eq!(fields.subtotal_tax_excluded, Some(dec("85.47")));
        assert_eq!(fields.total_amount, Some(dec("100.00")));
        assert_eq!(fields.vat_rate, Decimal::from(17));
    }

    #[test]
    fn test_date_ordering() {
        for text in ["Rok 30.03.2024\nIzdato 15.03.2024", "15.03.2024 do 30.03.2024"] {
            let result = FieldReconciler::new().reconcile(text, &FieldMappings::new(), None);
            assert_eq!(result.fields.issue_date, Some(date(2024, 3, 15)));
            assert_eq!(result.fields.due_date, Some(date(2024, 3, 30)));
            assert!(!result.due_synthesized);
        }
    }

    #[test]
    fn test_single_date_fallback() {
        let result = FieldReconciler::new().reconcile("Datum 01.06.2024", &FieldMappings::new(), None);

        assert_eq!(result.fields.issue_date, Some(date(2024, 6, 1)));
        assert_eq!(result.fields.due_date, Some(date(2024, 6, 16)));
        assert!(result.due_synthesized);
    }

    #[test]
    fn test_due_offset_past_calendar_end() {
        let reconciler = FieldReconciler::new().with_default_due_days(i64::MAX);
        let result = reconciler.reconcile("Datum 01.06.2024", &FieldMappings::new(), None);
        assert_eq!(result.fields.issue_date, Some(date(2024, 6, 1)));
        assert_eq!(result.fields.due_date, None);
        assert!(!result.due_synthesized);

        let guess = ExtractedFields {
            issue_date: Some(date(2024, 5, 2)),
            ..Default::default()
        };
        let result = reconciler.reconcile("", &FieldMappings::new(), Some(&guess));
        assert_eq!(result.fields.due_date, None);
    }

    #[test]
    fn test_delivery_date_exclusion() {
        let result =
            FieldReconciler::new().reconcile("Datum isporuke: 10.01.2024", &FieldMappings::standard(), None);

        assert_eq!(result.fields.issue_date, None);
        assert_eq!(result.fields.due_date, None);
    }

    #[test]
    fn test_model_dates_take_precedence() {
        let guess = ExtractedFields {
            issue_date: Some(date(2024, 5, 2)),
            ..Default::default()
        };
        let result = FieldReconciler::new().reconcile(
            "Račun 10.05.2024",
            &FieldMappings::new(),
            Some(&guess),
        );

        assert_eq!(result.fields.issue_date, Some(date(2024, 5, 2)));
        assert_eq!(result.fields.due_date, Some(date(2024, 5, 17)));
        assert!(result.due_synthesized);
    }

    #[test]
    fn test_currency_default() {
        let result = FieldReconciler::new().reconcile("Ukupno: 100,00", &FieldMappings::standard(), None);
        assert_eq!(result.fields.currency, Currency::Bam);
    }

    #[test]
    fn test_currency_from_label_then_text() {
        let mappings = FieldMappings::new().with(MappedField::Currency, ["valuta"]);
        let fields = FieldReconciler::new()
            .reconcile("Valuta: EUR\nIznos 10,00 USD", &mappings, None)
            .fields;
        assert_eq!(fields.currency, Currency::Eur);

        let fields = FieldReconciler::new()
            .reconcile("Iznos 10,00 USD", &FieldMappings::new(), None)
            .fields;
        assert_eq!(fields.currency, Currency::Usd);
    }

    #[test]
    fn test_document_number_never_a_date() {
        let mappings = FieldMappings::new().with(MappedField::DocumentNumber, ["broj"]);
        let fields = FieldReconciler::new()
            .reconcile("Broj: 15.03.2024", &mappings, None)
            .fields;
        assert_eq!(fields.document_number, None);
    }

    #[test]
    fn test_document_number_after_broj_heading() {
        let fields = FieldReconciler::new()
            .reconcile("Faktura broj: 2024-001\nUkupno 10,00", &FieldMappings::standard(), None)
            .fields;
        assert_eq!(fields.document_number.as_deref(), Some("2024-001"));

        let fields = FieldReconciler::new()
            .reconcile("ID broj: 4200123450009\nFaktura br. 117", &FieldMappings::standard(), None)
            .fields;
        assert_eq!(fields.document_number.as_deref(), Some("117"));
    }

    #[test]
    fn test_full_document() {
        let text = "\
Elektro Bosna d.o.o.
Zmaja od Bosne 12, 71000 Sarajevo, BiH
E-mail: info@elektrobosna.ba
FAKTURA br. EB-2024/117
Datum računa: 15.03.2024
Datum isporuke: 12.03.2024
Rok plaćanja: 30.03.2024
Opis: Servis klima uređaja
Iznos bez PDV: 1.000,00
PDV 17%: 170,00
Ukupno za platiti: 1.170,00 KM";
        let result = FieldReconciler::new().reconcile(text, &FieldMappings::standard(), None);
        let fields = result.fields;

        assert_eq!(fields.supplier_name.as_deref(), Some("Elektro Bosna d.o.o."));
        assert_eq!(fields.document_type, DocumentType::Invoice);
        assert_eq!(fields.document_number.as_deref(), Some("EB-2024/117"));
        assert_eq!(fields.issue_date, Some(date(2024, 3, 15)));
        assert_eq!(fields.due_date, Some(date(2024, 3, 30)));
        assert_eq!(fields.subtotal_tax_excluded, Some(dec("1000.00")));
        assert_eq!(fields.total_amount, Some(dec("1170.00")));
        assert_eq!(fields.vat_rate, Decimal::from(17));
        assert_eq!(fields.currency, Currency::Bam);
        assert_eq!(fields.description.as_deref(), Some("Servis klima uređaja"));
        assert_eq!(fields.supplier.email.as_deref(), Some("info@elektrobosna.ba"));
        assert_eq!(fields.supplier.city.as_deref(), Some("Sarajevo"));
        assert!(result.warnings.is_empty());
    }
}
