//! Fuzzy string similarity on a 0-100 scale.

/// Edit distance between two strings, counted in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Case-insensitive similarity percentage derived from the edit distance.
///
/// Identical strings score 100; two strings with nothing in common score 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 100.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }

    let distance = levenshtein(&a, &b);
    100.0 * (1.0 - distance as f64 / longest as f64)
}

/// Best similarity of `needle` against any line of `haystack`, or any run of
/// consecutive words in a line with the same word count as the needle.
pub fn best_similarity(needle: &str, haystack: &str) -> f64 {
    let needle = needle.trim();
    if needle.is_empty() {
        return 0.0;
    }
    let width = needle.split_whitespace().count();

    let mut best: f64 = 0.0;
    for line in haystack.lines().map(str::trim).filter(|l| !l.is_empty()) {
        best = best.max(similarity(needle, line));

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() > width {
            for window in words.windows(width) {
                best = best.max(similarity(needle, &window.join(" ")));
            }
        }
        if best >= 100.0 {
            break;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("šuma", "suma"), 1);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("Acme", "ACME "), 100.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);

        let close = similarity("Elektro Bosna", "Elektro Bsna");
        assert!(close > 90.0 && close < 100.0);
    }

    #[test]
    fn test_best_similarity_uses_word_windows() {
        let text = "Faktura br. 12\nIzdao: Elektr0 Bosna d.o.o. Sarajevo\nUkupno 10,00";
        let score = best_similarity("Elektro Bosna d.o.o.", text);
        assert!(score > 90.0, "score was {}", score);

        assert_eq!(best_similarity("", text), 0.0);
        assert!(best_similarity("Telekom Srpske", text) < 60.0);
    }
}
