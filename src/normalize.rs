//! Headword extraction for noisy dictionary terms.
//!
//! A bilingual dictionary term is often a whole phrase ("in die Schule
//! gehen", "sich freuen \[ugs.\]") while the index wants a single lookup
//! token. Denoising runs a fixed sequence of stages over the ascii-folded,
//! lowercased key; each stage is an ordered list of pattern rules. A stage
//! that would erase the string entirely is rolled back wholesale, so a
//! non-empty term always keeps at least its pre-stage content, leftover
//! noise included. The headword is the longest whitespace-delimited token
//! of whatever survives.

use lazy_static::lazy_static;
use regex::Regex;

// All patterns match the ascii-folded key, not raw input: "fürs" arrives as
// "furs", "während" as "wahrend".
const PREPS: &str = r"\b(?:mit|an|furs?|ubers?|als|i(?:ns?|m)?|zu[rm]?|vo[nm]|aufs?|bis|durch|gegen|ohne|um|aus|auser|beim?|gegenuber|nach|seit|entlang|hinter|neben|unter|vorm?|zwischen|(?:an)?statt|trotz|wahrend|wegen|auserhalb|innerhalb|oberhalb|unterhalb|diesseits|jenseits|beiderseits)\b";
const WORD: &str = r"[\w\.]+";
const PLACEHOLDERS: &str = r"\b(?:selbst|sich|etwas|jede[rnms]|etw|jd[rnms]?)\b";

lazy_static! {
    // {gender}, [type], (clarifying object) annotations
    static ref EXTRAS: Regex = Regex::new(r"(?:\{[^}]+\}|\[[^\]]*\]|\([^)]+\))").unwrap();

    // runs of anything that is neither a word character nor a hyphen
    static ref NON_WORD: Regex = Regex::new(r"[^\w-]+").unwrap();

    // definite and indefinite articles
    static ref ARTICLES: Regex = Regex::new(r"\b(?:d(?:e[rnms]|as|ie)|k?ein(?:e[rnms]?)?)\b").unwrap();

    // a pronoun placeholder, or a preposition together with its object word
    static ref NOISE_PHRASE: Regex = Regex::new(&format!(
        r"\b(?:{placeholders}|{preps}\s+{word})\b",
        placeholders = PLACEHOLDERS,
        preps = PREPS,
        word = WORD,
    ))
    .unwrap();

    // any preposition still standing on its own
    static ref LONE_PREP: Regex = Regex::new(PREPS).unwrap();

    static ref SPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
}

/// Apply one stage's rules in order, trimming after each.
///
/// A rule that empties the working string aborts the stage and discards its
/// whole partial effect; the caller continues from the pre-stage string.
fn apply_stage(input: &str, rules: &[(&Regex, &str)]) -> String {
    let mut current = input.to_string();
    for (pattern, replacement) in rules {
        let next = pattern.replace_all(&current, *replacement).trim().to_string();
        if next.is_empty() {
            return input.to_string();
        }
        current = next;
    }
    current
}

/// Strip grammatical noise from an ascii-folded, lowercased key.
///
/// Bracketed annotations must go before the phrase rules run; a preposition
/// hidden inside a bracket would otherwise never be seen at a word boundary.
pub fn denoise(key: &str) -> String {
    let stage_one: [(&Regex, &str); 4] = [
        (&EXTRAS, ""),
        (&NON_WORD, " "),
        (&ARTICLES, ""),
        (&NOISE_PHRASE, ""),
    ];
    let stage_two: [(&Regex, &str); 1] = [(&LONE_PREP, "")];
    let stage_three: [(&Regex, &str); 1] = [(&SPACE_RUNS, " ")];

    let mut current = apply_stage(key.trim(), &stage_one);
    current = apply_stage(&current, &stage_two);
    apply_stage(&current, &stage_three)
}

/// Denoise `key` and pick its headword: the longest whitespace-delimited
/// token, first occurrence winning ties. `None` when nothing survives, which
/// only happens for input with no word content at all.
pub fn headword(key: &str) -> Option<String> {
    let denoised = denoise(key);
    let mut best: Option<&str> = None;
    for token in denoised.split_whitespace() {
        let longer = match best {
            Some(b) => token.chars().count() > b.chars().count(),
            None => true,
        };
        if longer {
            best = Some(token);
        }
    }
    best.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────
    // Headword selection
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn single_word_unchanged() {
        assert_eq!(headword("laufen"), Some("laufen".to_string()));
    }

    #[test]
    fn longest_token_wins() {
        assert_eq!(headword("to run"), Some("run".to_string()));
        assert_eq!(headword("sehr langsam"), Some("langsam".to_string()));
    }

    #[test]
    fn equal_length_first_occurrence_wins() {
        assert_eq!(headword("foo bar"), Some("foo".to_string()));
    }

    #[test]
    fn empty_input_has_no_headword() {
        assert_eq!(headword(""), None);
        assert_eq!(headword("   "), None);
    }

    #[test]
    fn punctuation_only_input_survives_via_rollback() {
        // The non-word collapse would erase it, so stage one rolls back.
        assert_eq!(headword("?!"), Some("?!".to_string()));
    }

    // ─────────────────────────────────────────────────────────────
    // Noise stripping
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn articles_stripped() {
        assert_eq!(headword("die schule"), Some("schule".to_string()));
        assert_eq!(headword("ein haus"), Some("haus".to_string()));
    }

    #[test]
    fn bracketed_annotations_stripped() {
        assert_eq!(headword("laufen {n}"), Some("laufen".to_string()));
        assert_eq!(headword("begriff [ugs.]"), Some("begriff".to_string()));
        assert_eq!(headword("geben (etwas)"), Some("geben".to_string()));
    }

    #[test]
    fn placeholder_pronouns_stripped() {
        assert_eq!(headword("sich erinnern"), Some("erinnern".to_string()));
        assert_eq!(headword("etwas sagen"), Some("sagen".to_string()));
    }

    #[test]
    fn preposition_with_object_stripped() {
        assert_eq!(
            headword("in die schule gehen"),
            Some("gehen".to_string())
        );
    }

    #[test]
    fn punctuation_collapses_to_spaces() {
        assert_eq!(headword("geben, aufgeben"), Some("aufgeben".to_string()));
    }

    #[test]
    fn hyphens_survive() {
        // "e-mail" and "senden" tie at six characters; the first one wins.
        assert_eq!(headword("e-mail senden"), Some("e-mail".to_string()));
    }

    // ─────────────────────────────────────────────────────────────
    // Rollback
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn all_noise_term_keeps_pre_stage_content() {
        // Entirely a placeholder: stripping it would erase the term, so the
        // stage rolls back and the word survives as its own headword.
        assert_eq!(headword("sich"), Some("sich".to_string()));
    }

    #[test]
    fn lone_preposition_survives_stage_two() {
        assert_eq!(headword("in die"), Some("in".to_string()));
    }

    #[test]
    fn denoise_never_empties_word_content() {
        for term in ["sich", "in die", "etwas", "die", "zu"] {
            assert!(!denoise(term).is_empty(), "denoise emptied {:?}", term);
        }
    }
}
