//! Due dates from supplier payment terms.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::invoice::rules::{offset_date, parse_date};
use crate::models::PaymentTerms;

lazy_static! {
    static ref FIRST_INTEGER: Regex = Regex::new(r"\d+").unwrap();
}

/// Day count carried by the terms: the number itself, or the first integer in
/// free text ("Net 30" gives 30).
pub fn payment_days(terms: &PaymentTerms) -> Option<i64> {
    match terms {
        PaymentTerms::Days(days) => Some(*days),
        PaymentTerms::Text(text) => FIRST_INTEGER
            .find(text)
            .and_then(|m| m.as_str().parse().ok()),
    }
}

/// Issue date plus the payment days. Terms of zero or fewer days, or so many
/// that the date leaves the calendar, yield nothing.
pub fn due_date_from(terms: &PaymentTerms, issue_date: NaiveDate) -> Option<NaiveDate> {
    let days = payment_days(terms).filter(|d| *d > 0)?;
    offset_date(issue_date, days)
}

/// Like [`due_date_from`], with the issue date given as text in any supported format.
pub fn compute_due_date(terms: &PaymentTerms, issue_date: &str) -> Option<NaiveDate> {
    due_date_from(terms, parse_date(issue_date)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_terms() {
        assert_eq!(
            compute_due_date(&PaymentTerms::Days(30), "2024-03-01"),
            Some(date(2024, 3, 31))
        );
    }

    #[test]
    fn test_text_terms() {
        assert_eq!(
            compute_due_date(&"Net 30".into(), "15.03.2024"),
            Some(date(2024, 4, 14))
        );
        assert_eq!(
            due_date_from(&"Plaćanje u roku od 8 dana".into(), date(2024, 12, 28)),
            Some(date(2025, 1, 5))
        );
    }

    #[test]
    fn test_unusable_terms() {
        assert_eq!(compute_due_date(&"odmah".into(), "15.03.2024"), None);
        assert_eq!(compute_due_date(&PaymentTerms::Days(0), "15.03.2024"), None);
        assert_eq!(compute_due_date(&PaymentTerms::Days(-5), "15.03.2024"), None);
        assert_eq!(compute_due_date(&PaymentTerms::Days(30), "not a date"), None);
    }

    #[test]
    fn test_out_of_range_terms() {
        let issue = date(2024, 1, 1);
        assert_eq!(due_date_from(&"Net 999999999999999".into(), issue), None);
        assert_eq!(due_date_from(&"Net 99999999999999999999999".into(), issue), None);
        assert_eq!(due_date_from(&PaymentTerms::Days(i64::MAX), issue), None);
        assert_eq!(due_date_from(&PaymentTerms::Days(100_000_000), issue), None);
    }
}
