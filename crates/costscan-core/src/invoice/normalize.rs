//! Cosmetic repair of recognized text ahead of pattern extraction.
//!
//! Cyrillic letters are transliterated to their Latin counterparts, horizontal
//! whitespace runs are collapsed, digits glued to letters are separated and
//! repeated `.`/`,` runs are squeezed. Unlike a plain whitespace collapse,
//! newlines are not folded into spaces: line structure is preserved so that
//! line-oriented extractors keep working. Only runs of three or more newlines
//! shrink to a single blank line.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[^\S\n]+").unwrap();
    static ref DIGIT_LETTER: Regex = Regex::new(r"(\d)(\p{L})").unwrap();
    static ref REPEATED_DOTS: Regex = Regex::new(r"\.{2,}").unwrap();
    static ref REPEATED_COMMAS: Regex = Regex::new(r",{2,}").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Serbian Cyrillic to Latin (gajica), one code point at a time.
const CYRILLIC_TO_LATIN: &[(char, &str)] = &[
    ('А', "A"), ('а', "a"),
    ('Б', "B"), ('б', "b"),
    ('В', "V"), ('в', "v"),
    ('Г', "G"), ('г', "g"),
    ('Д', "D"), ('д', "d"),
    ('Ђ', "Đ"), ('ђ', "đ"),
    ('Е', "E"), ('е', "e"),
    ('Ж', "Ž"), ('ж', "ž"),
    ('З', "Z"), ('з', "z"),
    ('И', "I"), ('и', "i"),
    ('Ј', "J"), ('ј', "j"),
    ('К', "K"), ('к', "k"),
    ('Л', "L"), ('л', "l"),
    ('Љ', "Lj"), ('љ', "lj"),
    ('М', "M"), ('м', "m"),
    ('Н', "N"), ('н', "n"),
    ('Њ', "Nj"), ('њ', "nj"),
    ('О', "O"), ('о', "o"),
    ('П', "P"), ('п', "p"),
    ('Р', "R"), ('р', "r"),
    ('С', "S"), ('с', "s"),
    ('Т', "T"), ('т', "t"),
    ('Ћ', "Ć"), ('ћ', "ć"),
    ('У', "U"), ('у', "u"),
    ('Ф', "F"), ('ф', "f"),
    ('Х', "H"), ('х', "h"),
    ('Ц', "C"), ('ц', "c"),
    ('Ч', "Č"), ('ч', "č"),
    ('Џ', "Dž"), ('џ', "dž"),
    ('Ш', "Š"), ('ш', "š"),
];

fn latin_for(c: char) -> Option<&'static str> {
    CYRILLIC_TO_LATIN
        .iter()
        .find(|(cyr, _)| *cyr == c)
        .map(|(_, latin)| *latin)
}

/// Transliterate Cyrillic characters, leaving everything else untouched.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match latin_for(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Normalize recognized text for downstream matching.
///
/// Never fails: every step operates on plain strings.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = transliterate(text).replace("\r\n", "\n").replace('\r', "\n");
    let text = REPEATED_DOTS.replace_all(&text, ".");
    let text = REPEATED_COMMAS.replace_all(&text, ",");
    let text = DIGIT_LETTER.replace_all(&text, "$1 $2");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");

    let joined = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINES.replace_all(joined.trim(), "\n\n").into_owned()
}
