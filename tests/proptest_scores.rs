//! Property-based tests for the scorers and the suggestion pipeline.

use proptest::prelude::*;

use spellsift::distance::{edit_score, edit_score_limit, soundalike_score};
use spellsift::prelude::*;
use spellsift::score::{SCORE_LIMITMAX, SCORE_MAXMAX};

proptest! {
    #[test]
    fn edit_score_identity(word in "[a-zA-Z]{0,12}") {
        prop_assert_eq!(edit_score(None, &word, &word), 0);
    }

    #[test]
    fn edit_score_is_positive_for_different_words(
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}",
    ) {
        let score = edit_score(None, &a, &b);
        if a == b {
            prop_assert_eq!(score, 0);
        } else {
            prop_assert!(score > 0);
        }
    }

    #[test]
    fn limited_scorer_agrees_with_matrix(
        a in "[a-z]{0,7}",
        b in "[a-z]{0,7}",
    ) {
        let full = edit_score(None, &a, &b);
        let limited = edit_score_limit(None, &a, &b, SCORE_LIMITMAX);
        if full <= SCORE_LIMITMAX {
            prop_assert_eq!(limited, full, "{} vs {}", a, b);
        } else {
            prop_assert_eq!(limited, SCORE_MAXMAX, "{} vs {}", a, b);
        }
    }

    #[test]
    fn limit_zero_is_an_equality_test(
        a in "[a-z]{0,6}",
        b in "[a-z]{0,6}",
    ) {
        let score = edit_score_limit(None, &a, &b, 0);
        if a == b {
            prop_assert_eq!(score, 0);
        } else {
            prop_assert_eq!(score, SCORE_MAXMAX);
        }
    }

    #[test]
    fn soundalike_identity_and_symmetry(
        a in "[A-Z*]{0,8}",
        b in "[A-Z*]{0,8}",
    ) {
        prop_assert_eq!(soundalike_score(a.as_bytes(), a.as_bytes()), 0);
        prop_assert_eq!(
            soundalike_score(a.as_bytes(), b.as_bytes()),
            soundalike_score(b.as_bytes(), a.as_bytes()),
            "{} vs {}", a, b
        );
    }

    #[test]
    fn suggestions_are_sorted_unique_and_bounded(
        bad in "[a-z]{2,7}",
        limit in 1usize..20,
    ) {
        let langs = [LangDict::from_words([
            "apple", "apply", "ample", "angle", "ankle", "amble",
            "table", "cable", "fable", "gable", "ladle", "maple",
        ])];
        let opts = SuggestOptions::parse(&format!("best,{limit}")).unwrap();
        let suggestor = Suggestor::new(&langs).options(opts);
        let sugs = suggestor.suggest(&bad);

        prop_assert!(sugs.len() <= limit);
        for pair in sugs.windows(2) {
            prop_assert!(
                (pair[0].score, pair[0].altscore) <= (pair[1].score, pair[1].altscore)
            );
            prop_assert!(
                !(pair[0].word == pair[1].word && pair[0].orglen == pair[1].orglen)
            );
        }
    }

    #[test]
    fn banned_words_never_surface(bad in "[a-z]{3,6}") {
        let langs = [LangDict::builder()
            .word("crate")
            .entry(WordEntry::new("crete").banned())
            .build()];
        let suggestor = Suggestor::new(&langs);
        for s in suggestor.suggest(&bad) {
            let tail = bad.get(s.orglen..).unwrap_or("");
            prop_assert_ne!(format!("{}{}", s.word, tail), "crete");
        }
    }

    #[test]
    fn every_suggestion_is_reachable_by_editing(bad in "[a-z]{2,6}") {
        let words = ["stone", "store", "stove", "shore", "snore", "spore"];
        let langs = [LangDict::from_words(words)];
        let suggestor = Suggestor::new(&langs);
        for s in suggestor.suggest(&bad) {
            let tail = bad.get(s.orglen..).unwrap_or("");
            let replacement = format!("{}{}", s.word, tail);
            // The bad word itself may come back capitalized when it is a
            // valid word, so compare case-insensitively.
            let first = replacement
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_lowercase();
            prop_assert!(
                words.contains(&first.as_str()),
                "suggested {:?} which is not in the dictionary",
                replacement
            );
        }
    }
}
