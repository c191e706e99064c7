//! Date extraction and issue/due resolution.
//!
//! Dates are collected in up to three passes:
//!
//! 1. Labeled: tokens following delivery, issue and due labels. Delivery dates
//!    are set aside and never used.
//! 2. Standalone: every date-shaped token in the text, except tokens near a
//!    delivery keyword or already captured by the labeled pass.
//! 3. Aggressive: only when pass 2 found nothing. Relaxed separators and bare
//!    8-digit runs, each validated against the calendar.
//!
//! The surviving dates are sorted; the earliest is the issue date and the
//! second earliest the due date.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use regex::{Captures, Regex};
use tracing::debug;

use super::patterns::{
    DATE_COMPACT, DATE_DMY_LONG, DATE_DMY_SHORT, DATE_ISO, DATE_MONTH_NAME, DATE_RELAXED,
    DATE_SLASHED, DELIVERY_DATE, DELIVERY_KEYWORD, DUE_DATE, ISSUE_DATE,
};
use super::ExtractionMatch;

/// Characters on each side of a date searched for delivery keywords.
const DELIVERY_WINDOW: usize = 50;

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy)]
enum DateShape {
    DayMonthYear,
    YearMonthDay,
    MonthName,
    Compact,
}

/// Dates found under explicit labels.
#[derive(Debug, Clone, Default)]
pub struct LabeledDates {
    pub issue: Vec<ExtractionMatch<NaiveDate>>,
    pub due: Vec<ExtractionMatch<NaiveDate>>,
    /// Delivery dates; excluded from issue/due resolution.
    pub delivery: Vec<ExtractionMatch<NaiveDate>>,
}

impl LabeledDates {
    fn all(&self) -> impl Iterator<Item = &ExtractionMatch<NaiveDate>> {
        self.issue.iter().chain(&self.due).chain(&self.delivery)
    }
}

/// Issue and due dates resolved from document text.
#[derive(Debug, Clone, Default)]
pub struct DateResolution {
    pub issue_date: Option<ExtractionMatch<NaiveDate>>,
    pub due_date: Option<ExtractionMatch<NaiveDate>>,
    /// The due date was computed from the issue date, not read from the text.
    pub due_synthesized: bool,
    /// Valid, non-excluded dates in ascending order.
    pub candidates: Vec<ExtractionMatch<NaiveDate>>,
    /// Delivery dates that were set aside.
    pub excluded: Vec<ExtractionMatch<NaiveDate>>,
}

/// Date extractor.
pub struct DateExtractor {
    default_due_days: i64,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self {
            default_due_days: 15,
        }
    }

    /// Days added to a lone issue date to synthesize the due date.
    pub fn with_default_due_days(mut self, days: i64) -> Self {
        self.default_due_days = days;
        self
    }

    /// Resolve issue and due dates from text.
    pub fn extract(&self, text: &str) -> DateResolution {
        let labeled = self.extract_labeled(text);
        let mut candidates = labeled.issue.clone();
        candidates.extend(labeled.due.iter().cloned());
        candidates.extend(self.extract_unlabeled(text, &labeled));

        candidates.sort_by_key(|m| m.value);
        candidates.dedup_by_key(|m| m.value);

        let mut resolution = DateResolution {
            excluded: labeled.delivery,
            ..Default::default()
        };

        let mut sorted = candidates.iter();
        resolution.issue_date = sorted.next().cloned();
        resolution.due_date = sorted.next().cloned();

        if resolution.due_date.is_none() {
            let synthesized = resolution
                .issue_date
                .as_ref()
                .and_then(|issue| offset_date(issue.value, self.default_due_days));
            if let Some(due) = synthesized {
                resolution.due_date = Some(ExtractionMatch::new(due, 0.5, "synthesized"));
                resolution.due_synthesized = true;
            }
        }

        debug!(
            "Resolved dates: issue={:?} due={:?} (synthesized: {}, {} candidates, {} excluded)",
            resolution.issue_date.as_ref().map(|m| m.value),
            resolution.due_date.as_ref().map(|m| m.value),
            resolution.due_synthesized,
            candidates.len(),
            resolution.excluded.len()
        );

        resolution.candidates = candidates;
        resolution
    }

    /// All valid, non-excluded dates in ascending order.
    pub fn extract_all(&self, text: &str) -> Vec<ExtractionMatch<NaiveDate>> {
        self.extract(text).candidates
    }

    /// Pass 1: dates under delivery, due and issue labels.
    pub fn extract_labeled(&self, text: &str) -> LabeledDates {
        let mut labeled = LabeledDates {
            delivery: labeled_matches(&DELIVERY_DATE, text),
            ..Default::default()
        };

        let claimed: Vec<(usize, usize)> =
            labeled.delivery.iter().filter_map(|m| m.position).collect();
        labeled.due = labeled_matches(&DUE_DATE, text)
            .into_iter()
            .filter(|m| !m.position.is_some_and(|p| claimed.contains(&p)))
            .collect();

        // The bare "datum"/"date" issue label also precedes delivery and due dates
        let claimed: Vec<(usize, usize)> = labeled
            .delivery
            .iter()
            .chain(&labeled.due)
            .filter_map(|m| m.position)
            .collect();
        labeled.issue = labeled_matches(&ISSUE_DATE, text)
            .into_iter()
            .filter(|m| !m.position.is_some_and(|p| claimed.contains(&p)))
            .collect();

        labeled
    }

    /// Passes 2 and 3.
    fn extract_unlabeled(&self, text: &str, labeled: &LabeledDates) -> Vec<ExtractionMatch<NaiveDate>> {
        let seen: HashSet<String> = labeled.all().map(|m| strip_whitespace(&m.source)).collect();

        let standalone = scan(
            text,
            &[
                (&*DATE_ISO, DateShape::YearMonthDay),
                (&*DATE_DMY_LONG, DateShape::DayMonthYear),
                (&*DATE_DMY_SHORT, DateShape::DayMonthYear),
                (&*DATE_SLASHED, DateShape::DayMonthYear),
                (&*DATE_MONTH_NAME, DateShape::MonthName),
            ],
            &seen,
            0.85,
        );
        if !standalone.is_empty() {
            return standalone;
        }

        debug!("No standalone dates, trying relaxed date patterns");
        scan(
            text,
            &[
                (&*DATE_RELAXED, DateShape::DayMonthYear),
                (&*DATE_COMPACT, DateShape::Compact),
            ],
            &seen,
            0.5,
        )
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn labeled_matches(pattern: &Regex, text: &str) -> Vec<ExtractionMatch<NaiveDate>> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let token = caps.get(1)?;
            let date = parse_date(token.as_str())?;
            Some(
                ExtractionMatch::new(date, 0.95, token.as_str())
                    .with_position(token.start(), token.end()),
            )
        })
        .collect()
}

fn scan(
    text: &str,
    patterns: &[(&Regex, DateShape)],
    seen: &HashSet<String>,
    confidence: f32,
) -> Vec<ExtractionMatch<NaiveDate>> {
    let mut results: Vec<ExtractionMatch<NaiveDate>> = Vec::new();

    for (pattern, shape) in patterns {
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let (start, end) = (whole.start(), whole.end());

            let overlaps = results
                .iter()
                .filter_map(|m| m.position)
                .any(|(s, e)| start < e && s < end);
            if overlaps || seen.contains(&strip_whitespace(whole.as_str())) {
                continue;
            }
            if near_delivery_keyword(text, start, end) {
                debug!("Skipping date '{}' near a delivery label", whole.as_str());
                continue;
            }

            if let Some(date) = build_date(*shape, &caps) {
                results.push(
                    ExtractionMatch::new(date, confidence, whole.as_str()).with_position(start, end),
                );
            }
        }
    }

    results
}

fn build_date(shape: DateShape, caps: &Captures<'_>) -> Option<NaiveDate> {
    match shape {
        DateShape::DayMonthYear => date_from_parts(&caps[3], &caps[2], &caps[1]),
        DateShape::YearMonthDay => date_from_parts(&caps[1], &caps[2], &caps[3]),
        DateShape::MonthName => {
            let month = month_from_name(&caps[2])?;
            date_from_parts(&caps[3], &month.to_string(), &caps[1])
        }
        DateShape::Compact => parse_compact(&caps[1]),
    }
}

/// Interpret an 8-digit run as YYYYMMDD, then DDMMYYYY.
fn parse_compact(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 8 || !digits.is_ascii() {
        return None;
    }
    date_from_parts(&digits[0..4], &digits[4..6], &digits[6..8])
        .or_else(|| date_from_parts(&digits[4..8], &digits[2..4], &digits[0..2]))
}

fn date_from_parts(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year = parse_year(year)?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).filter(|_| (MIN_YEAR..=MAX_YEAR).contains(&year))
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    let year: i32 = s.parse().ok()?;
    if s.len() <= 2 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 {
            Some(2000 + year)
        } else {
            Some(1900 + year)
        }
    } else {
        Some(year)
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "maj" | "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" | "avg" => 8,
        "sep" => 9,
        "okt" | "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn near_delivery_keyword(text: &str, start: usize, end: usize) -> bool {
    let window_start = text[..start]
        .char_indices()
        .rev()
        .take(DELIVERY_WINDOW)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let window_end = text[end..]
        .char_indices()
        .nth(DELIVERY_WINDOW)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    DELIVERY_KEYWORD.is_match(&text[window_start..window_end])
}

/// `date + days`, or `None` when the result is not a representable date.
pub fn offset_date(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// Parse a single date string in any supported format.
///
/// Accepts `DD.MM.YYYY` (optionally spaced), `DD.MM.YY`, slash and dash
/// variants, ISO `YYYY-MM-DD` (with or without a time part), month names in
/// BHS or English, and 8-digit runs.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Drop the time part of an ISO timestamp
    let s = match s.split_once('T') {
        Some((day, _)) if day.len() == 10 && day.chars().all(|c| c.is_ascii_digit() || c == '-') => day,
        _ => s,
    };
    let shapes: [(&Regex, DateShape); 5] = [
        (&*DATE_ISO, DateShape::YearMonthDay),
        (&*DATE_DMY_LONG, DateShape::DayMonthYear),
        (&*DATE_DMY_SHORT, DateShape::DayMonthYear),
        (&*DATE_SLASHED, DateShape::DayMonthYear),
        (&*DATE_MONTH_NAME, DateShape::MonthName),
    ];

    shapes
        .iter()
        .find_map(|(pattern, shape)| {
            pattern
                .captures(s)
                .and_then(|caps| build_date(*shape, &caps))
        })
        .or_else(|| {
            DATE_COMPACT
                .captures(s)
                .and_then(|caps| build_date(DateShape::Compact, &caps))
        })
}

/// Resolve issue and due dates with the default 15-day offset.
pub fn extract_dates(text: &str) -> DateResolution {
    DateExtractor::new().extract(text)
}
