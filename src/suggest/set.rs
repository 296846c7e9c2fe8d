//! The suggestion collection: deduplicating, bounded and score-ordered.

/// One spelling suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Suggestion {
    /// The suggested replacement text.
    pub word: String,
    /// How many bytes of the bad word this replaces. The same spelling with
    /// a different replaced length is a distinct suggestion.
    pub orglen: usize,
    /// Primary score; lower is better.
    pub score: i32,
    /// Secondary score used when primary scores compare equal.
    pub altscore: i32,
    /// True when `score` ranks sound-alike similarity (`double` mode).
    pub sal_score: bool,
    /// The sound-alike bonus is already folded into `score`.
    pub(crate) had_bonus: bool,
    /// Index of the language that produced the suggestion.
    pub(crate) lang: Option<usize>,
}

/// Score-ordered, deduplicated collection of suggestions.
///
/// Insertion keeps the lower score for duplicate `(word, orglen)` keys;
/// [`cleanup`](SuggestionSet::cleanup) sorts, truncates and reports the new
/// effective score ceiling.
#[derive(Debug, Clone, Default)]
pub struct SuggestionSet {
    pub(crate) entries: Vec<Suggestion>,
}

impl SuggestionSet {
    /// Number of suggestions held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no suggestions are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry with this dedup key, if present.
    pub(crate) fn position(&self, word: &str, orglen: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|s| s.orglen == orglen && s.word == word)
    }

    /// Sort by `(score, altscore, caseless word)`.
    pub(crate) fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| a.altscore.cmp(&b.altscore))
                .then_with(|| {
                    a.word
                        .to_lowercase()
                        .cmp(&b.word.to_lowercase())
                })
        });
    }

    /// Sort, truncate to `keep` entries, and return the updated score
    /// ceiling: the score of the last kept entry, or `maxscore` unchanged
    /// when nothing was dropped.
    pub(crate) fn cleanup(&mut self, maxscore: i32, keep: usize) -> i32 {
        if self.entries.is_empty() {
            return maxscore;
        }
        self.sort();
        if self.entries.len() > keep {
            self.entries.truncate(keep);
            if keep >= 1 {
                return self.entries[keep - 1].score;
            }
        }
        maxscore
    }

    /// Drain into the final vector.
    pub(crate) fn into_vec(self) -> Vec<Suggestion> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sug(word: &str, score: i32, alt: i32) -> Suggestion {
        Suggestion {
            word: word.to_string(),
            orglen: 4,
            score,
            altscore: alt,
            sal_score: false,
            had_bonus: false,
            lang: None,
        }
    }

    #[test]
    fn sort_orders_by_score_then_alt_then_word() {
        let mut set = SuggestionSet::default();
        set.entries.push(sug("zebra", 10, 0));
        set.entries.push(sug("apple", 10, 0));
        set.entries.push(sug("mango", 5, 3));
        set.entries.push(sug("melon", 5, 1));
        set.sort();
        let words: Vec<_> = set.entries.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["melon", "mango", "apple", "zebra"]);
    }

    #[test]
    fn cleanup_returns_new_ceiling() {
        let mut set = SuggestionSet::default();
        for i in 0..10 {
            set.entries.push(sug(&format!("w{i}"), i * 10, 0));
        }
        let ceiling = set.cleanup(999, 5);
        assert_eq!(set.len(), 5);
        assert_eq!(ceiling, 40);
        // Nothing dropped: ceiling unchanged.
        let ceiling = set.cleanup(999, 50);
        assert_eq!(ceiling, 999);
    }

    #[test]
    fn position_uses_word_and_orglen() {
        let mut set = SuggestionSet::default();
        set.entries.push(sug("word", 1, 0));
        let mut other = sug("word", 2, 0);
        other.orglen = 7;
        set.entries.push(other);
        assert_eq!(set.position("word", 4), Some(0));
        assert_eq!(set.position("word", 7), Some(1));
        assert_eq!(set.position("word", 5), None);
    }
}
