//! Sound-folding: collapsing similar-sounding spellings.
//!
//! A language's SAL rules rewrite a case-folded word into a phonetic
//! skeleton, so that "phone" and "fone" fold to the same string. The engine
//! only needs the folding primitive; rule files and their full condition
//! syntax are a dictionary-compilation concern.
//!
//! Rules are ordered `from -> to` rewrites applied left to right: at each
//! position the first matching rule fires, consumes its pattern and emits
//! its replacement. Unmatched word characters pass through uppercased,
//! non-word characters are dropped, and adjacent duplicates in the output
//! collapse. A word starting with a vowel is marked with a leading `*`,
//! which the sound-alike scorer treats as a cheap-to-edit pseudo character.

use crate::case::is_word_char;

/// One ordered rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundRule {
    /// Pattern matched against the case-folded word.
    pub from: String,
    /// Replacement emitted into the phonetic string.
    pub to: String,
}

/// An ordered SAL-style rule set.
#[derive(Debug, Clone, Default)]
pub struct SoundRules {
    rules: Vec<SoundRule>,
}

impl SoundRules {
    /// Build a rule set; application order is the given order.
    pub fn new<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        SoundRules {
            rules: pairs
                .into_iter()
                .map(|(from, to)| SoundRule {
                    from: from.into(),
                    to: to.into(),
                })
                .collect(),
        }
    }

    /// True when the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold `word` (already case-folded) into its phonetic form.
    pub fn sound_fold(&self, word: &str) -> String {
        let mut out = String::with_capacity(word.len() + 1);
        if word
            .chars()
            .find(|c| is_word_char(*c))
            .is_some_and(is_vowel)
        {
            out.push('*');
        }

        let mut rest = word;
        'outer: while !rest.is_empty() {
            for rule in &self.rules {
                if !rule.from.is_empty() && rest.starts_with(rule.from.as_str()) {
                    push_collapsed(&mut out, rule.to.chars());
                    rest = &rest[rule.from.len()..];
                    continue 'outer;
                }
            }
            let c = rest.chars().next().unwrap();
            if is_word_char(c) {
                push_collapsed(&mut out, c.to_uppercase());
            }
            rest = &rest[c.len_utf8()..];
        }
        out
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

fn push_collapsed<I: IntoIterator<Item = char>>(out: &mut String, chars: I) {
    for c in chars {
        if out.chars().last() != Some(c) {
            out.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SoundRules {
        SoundRules::new([("ph", "F"), ("ough", "UF"), ("gh", "F"), ("sch", "SK"), ("th", "T")])
    }

    #[test]
    fn rules_apply_in_order() {
        let r = rules();
        assert_eq!(r.sound_fold("phone"), "FONE");
        assert_eq!(r.sound_fold("fone"), "FONE");
        assert_eq!(r.sound_fold("school"), "SKOL");
    }

    #[test]
    fn leading_vowel_marker() {
        let r = rules();
        assert!(r.sound_fold("apple").starts_with('*'));
        assert!(!r.sound_fold("phone").starts_with('*'));
    }

    #[test]
    fn duplicates_collapse_and_nonword_drops() {
        let r = rules();
        assert_eq!(r.sound_fold("hello"), "HELO");
        assert_eq!(r.sound_fold("he-llo"), "HELO");
    }

    #[test]
    fn identical_sounding_words_fold_together() {
        let r = rules();
        assert_eq!(r.sound_fold("tough"), r.sound_fold("tuf"));
    }
}
