//! Common regex patterns for cost document extraction.
//!
//! Patterns target BHS (Bosnian/Croatian/Serbian) documents in Latin and
//! Cyrillic script, plus English.

use lazy_static::lazy_static;
use regex::Regex;

/// Decimal amount with exactly two decimals and optional thousand separators.
pub const AMOUNT: &str = r"(\d{1,3}(?:[.,\u{00a0} ]?\d{3})*)[,.](\d{2})\b";

/// Date token in any of the labeled-date separator styles.
pub const DATE_TOKEN: &str =
    r"(\d{1,2}\.\s*\d{1,2}\.\s*\d{2,4}|\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}-\d{1,2}-\d{1,2})";

const DELIVERY_KEYWORDS: &str = r"datum\s+isporuke|datum\s+prometa|datum\s+otpreme|isporu[čc]eno|delivery\s+date|date\s+of\s+delivery|датум\s+испоруке|датум\s+промета";

const ISSUE_KEYWORDS: &str = r"datum\s+izdavanja|datum\s+ra[čc]una|datum\s+fakture|datum\s+dokumenta|invoice\s+date|issue\s+date|date\s+of\s+issue|датум\s+издавања|датум\s+рачуна|datum|датум|date";

const DUE_KEYWORDS: &str = r"datum\s+dospije[ćc]a|datum\s+dospe[ćc]a|dospije[ćc]e|dospe[ćc]e|rok\s+pla[ćc]anja|valuta\s+pla[ćc]anja|due\s+date|payment\s+due|датум\s+доспијећа|датум\s+доспећа|рок\s+плаћања";

fn labeled_date(keywords: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})[^\d\n]{{0,20}}?{}", keywords, DATE_TOKEN)).unwrap()
}

lazy_static! {
    // Amounts
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(AMOUNT).unwrap();

    pub static ref AMOUNT_WITH_CURRENCY: Regex = Regex::new(&format!(
        r"{}\s*(?:(?i:KM|BAM|EUR|USD|RSD|din\.?)\b|€|\$)",
        AMOUNT
    )).unwrap();

    pub static ref CURRENCY_BEFORE_AMOUNT: Regex = Regex::new(&format!(
        r"(?:€|\$|\b(?i:EUR|USD|BAM|KM))\s*{}",
        AMOUNT
    )).unwrap();

    pub static ref TOTAL_LABELED: Regex = Regex::new(&format!(
        r"(?i)\b(?:za\s+platiti|za\s+naplatu|ukupno|total|iznos)\b[^\d\n]{{0,30}}?{}",
        AMOUNT
    )).unwrap();

    // Currency
    pub static ref CURRENCY_AFTER_AMOUNT: Regex = Regex::new(
        r"\d[,.]\d{2}\s*(?i:(EUR|USD|BAM|RSD))\b"
    ).unwrap();

    pub static ref CURRENCY_TOKEN: Regex = Regex::new(
        r"\b(?i:(EUR|USD|BAM|RSD))\b"
    ).unwrap();

    // Dates
    pub static ref DATE_DMY_LONG: Regex = Regex::new(
        r"\b(\d{1,2})\.\s?(\d{1,2})\.\s?(\d{4})\b"
    ).unwrap();

    pub static ref DATE_DMY_SHORT: Regex = Regex::new(
        r"\b(\d{1,2})\.(\d{1,2})\.(\d{2})\b"
    ).unwrap();

    pub static ref DATE_SLASHED: Regex = Regex::new(
        r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"\b(\d{4})[\-/](\d{1,2})[\-/](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_NAME: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\.?\s+(jan|feb|mar|apr|maj|may|jun|jul|aug|avg|sep|okt|oct|nov|dec)\p{L}*\.?,?\s+(\d{4})\b"
    ).unwrap();

    pub static ref DATE_RELAXED: Regex = Regex::new(
        r"\b(\d{1,2})\s*[.,/\-\s]\s*(\d{1,2})\s*[.,/\-\s]\s*(\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_COMPACT: Regex = Regex::new(
        r"\b(\d{8})\b"
    ).unwrap();

    pub static ref DELIVERY_KEYWORD: Regex = Regex::new(
        &format!("(?i){}", DELIVERY_KEYWORDS)
    ).unwrap();

    pub static ref DELIVERY_DATE: Regex = labeled_date(DELIVERY_KEYWORDS);
    pub static ref ISSUE_DATE: Regex = labeled_date(ISSUE_KEYWORDS);
    pub static ref DUE_DATE: Regex = labeled_date(DUE_KEYWORDS);

    pub static ref DATE_SHAPED: Regex = Regex::new(
        r"^(?:\d{1,2}[./\-]\s*\d{1,2}[./\-]\s*\d{2,4}\.?|\d{4}[./\-]\d{1,2}[./\-]\d{1,2}\.?)$"
    ).unwrap();

    // Document numbers
    pub static ref DOCUMENT_NUMBER: Regex = Regex::new(
        r"(?i)(?:broj\s+(?:ra[čc]una|fakture|dokumenta|ponude)|(?:ra[čc]un|faktura|ponuda|otpremnica)\s*(?:broj|br\.?|nr\.?)|invoice\s*(?:no\.?|number|#)|document\s*(?:no\.?|number)|бр\.|broj|br\.)[^\S\n]*[:#]?[^\S\n]*\b([A-Za-z0-9][A-Za-z0-9/\-_.]*[A-Za-z0-9])"
    ).unwrap();

    // VAT
    pub static ref VAT_PERCENT: Regex = Regex::new(
        r"(?i)(?:pdv|vat|porez)[^\d\n%]{0,20}?(\d{1,2}(?:[.,]\d{1,2})?)\s*%"
    ).unwrap();

    // Contact details
    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    pub static ref PHONE_LABELED: Regex = Regex::new(
        r"(?i)(?:tel(?:efon)?|phone|mob(?:itel)?|fax|gsm)\.?\s*[:/]?\s*(\+?\(?\d{1,4}\)?(?:[\s\-/.]?\d{1,4}){2,5})"
    ).unwrap();

    pub static ref PHONE: Regex = Regex::new(
        r"(\+\d{3}[\s\-/]?\d{2}[\s\-/]?\d{3}[\s\-/]?\d{3,4}|\b0\d{2}[\s\-/]\d{3}[\s\-/]?\d{3,4}\b)"
    ).unwrap();

    pub static ref WEBSITE: Regex = Regex::new(
        r"(?i)\b((?:https?://|www\.)[a-z0-9.\-]+\.[a-z]{2,}(?:/[^\s]*)?)"
    ).unwrap();

    pub static ref WEBSITE_LABELED: Regex = Regex::new(
        r"(?i)(?:web(?:site)?|internet)\s*:\s*([a-z0-9.\-]+\.[a-z]{2,}(?:/[^\s]*)?)"
    ).unwrap();

    pub static ref TAX_ID: Regex = Regex::new(
        r"(?i)\b(?:pdv\s*broj|pdv\s*br\.?|id\s*broj|jib|pib|idb|oib|vat\s*id|tax\s*id)\b[\s:.]*([A-Z0-9][A-Z0-9\-]{4,20})"
    ).unwrap();

    pub static ref ADDRESS_LINE: Regex = Regex::new(
        r"(?i)(?:\b(?:ul\.|ulica|adresa|address|bb\b|trg|bulevar|put)|\b\p{L}{3,}\s+(?:\d{1,4}[a-z]?|bb)\b(?:\s*,|\s*$))"
    ).unwrap();

    pub static ref POSTAL_CODE: Regex = Regex::new(
        r"\b(\d{5})\b"
    ).unwrap();
}
