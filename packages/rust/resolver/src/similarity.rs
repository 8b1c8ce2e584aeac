//! String similarity primitives: Jaro, Jaro-Winkler, and name normalization.
//!
//! All functions operate on Unicode scalar values, not bytes.

/// Longest shared prefix that earns the Winkler boost.
const MAX_PREFIX: usize = 4;

/// Default Winkler prefix scale.
pub const DEFAULT_PREFIX_SCALE: f64 = 0.1;

/// Jaro similarity in `[0, 1]`.
pub fn jaro(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Walk matched characters in order on both sides.
    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count();

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity with the default prefix scale of `0.1`.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    jaro_winkler_with_scale(a, b, DEFAULT_PREFIX_SCALE)
}

/// Jaro similarity boosted by a shared prefix of up to four characters.
pub fn jaro_winkler_with_scale(a: &str, b: &str, prefix_scale: f64) -> f64 {
    let jaro = jaro(a, b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();
    jaro + prefix as f64 * prefix_scale * (1.0 - jaro)
}

/// Normalize a name for lookup keys and fuzzy comparison.
///
/// Lowercases, straightens curly quotes, drops everything except word
/// characters, whitespace, apostrophes and hyphens, then collapses whitespace
/// runs and trims. Idempotent.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let kept: String = lowered
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '\'' | '-'))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn jaro_reference_values() {
        assert!(close(jaro("martha", "marhta"), 0.944));
        assert!(close(jaro("dixon", "dicksonx"), 0.767));
        assert!(close(jaro("jellyfish", "smellyfish"), 0.896));
    }

    #[test]
    fn jaro_winkler_reference_values() {
        assert!(close(jaro_winkler("martha", "marhta"), 0.961));
        assert!(close(jaro_winkler("dixon", "dicksonx"), 0.813));
    }

    #[test]
    fn jaro_edge_cases() {
        assert_eq!(jaro("", ""), 1.0);
        assert_eq!(jaro("abc", ""), 0.0);
        assert_eq!(jaro("", "abc"), 0.0);
        assert_eq!(jaro("a", "b"), 0.0);
        assert_eq!(jaro("abc", "xyz"), 0.0);
    }

    #[test]
    fn typo_scores_above_person_threshold() {
        let score = jaro_winkler(&normalize("Clare Atwell"), &normalize("Clare Attwell"));
        assert!(score >= 0.90, "score={score}");
    }

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize("  Clare   ATTWELL "), "clare attwell");
        assert_eq!(normalize("O\u{2019}Brien"), "o'brien");
        assert_eq!(normalize("Acme, Inc."), "acme inc");
        assert_eq!(normalize("\u{201C}Quoted\u{201D} name"), "quoted name");
        assert_eq!(normalize("Jean-Luc\tPicard"), "jean-luc picard");
        assert_eq!(normalize("a ."), "a");
    }

    proptest! {
        #[test]
        fn jaro_identity(s in "\\PC{0,24}") {
            prop_assert_eq!(jaro(&s, &s), 1.0);
        }

        #[test]
        fn jaro_against_empty(s in "\\PC{1,24}") {
            prop_assert_eq!(jaro(&s, ""), 0.0);
        }

        #[test]
        fn jaro_in_unit_interval(a in "[a-z ]{0,16}", b in "[a-z ]{0,16}") {
            let score = jaro_winkler(&a, &b);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&score));
        }

        #[test]
        fn shared_prefix_never_lowers_score(
            prefix in "[a-z]{1,4}",
            a in "[a-z]{0,10}",
            b in "[a-z]{0,10}",
        ) {
            let a = format!("{prefix}{a}");
            let b = format!("{prefix}{b}");
            prop_assert!(jaro_winkler(&a, &b) >= jaro(&a, &b));
        }

        #[test]
        fn normalize_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
