//! End-to-end suggestion scenarios over small hand-built dictionaries.

use spellsift::prelude::*;
use spellsift::score::{
    SCORE_ICASE, SCORE_INSDUP, SCORE_REP, SCORE_SPLIT, SCORE_SWAP,
};
use spellsift::suggest::Suggestion;

/// The stored suggestion replaces only the differing prefix of the bad
/// word; the full replacement appends the unchanged tail.
fn full(s: &Suggestion, badword: &str) -> String {
    format!("{}{}", s.word, badword.get(s.orglen..).unwrap_or(""))
}

fn full_words(suggestions: &[Suggestion], badword: &str) -> Vec<String> {
    suggestions.iter().map(|s| full(s, badword)).collect()
}

#[test]
fn transposed_word_scores_a_swap() {
    let langs = [LangDict::from_words(["the"])];
    let suggestor = Suggestor::new(&langs);

    for bad in ["hte", "teh"] {
        let sugs = suggestor.suggest(bad);
        assert!(!sugs.is_empty(), "no suggestions for {bad}");
        assert_eq!(full(&sugs[0], bad), "the");
        assert_eq!(sugs[0].score, SCORE_SWAP, "swap score for {bad}");
    }
}

#[test]
fn missing_double_letter_is_cheap() {
    let langs = [LangDict::from_words(["hello"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("helo");
    assert_eq!(full(&sugs[0], "helo"), "hello");
    assert!(
        sugs[0].score <= SCORE_INSDUP,
        "doubling a letter should cost at most {SCORE_INSDUP}, got {}",
        sugs[0].score
    );
}

#[test]
fn long_word_with_missing_double_letter() {
    let langs = [LangDict::from_words(["accommodate"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("acommodate");
    let words = full_words(&sugs, "acommodate");
    assert!(words.contains(&"accommodate".to_string()));
    let s = &sugs[words.iter().position(|w| w == "accommodate").unwrap()];
    assert!(s.score <= SCORE_INSDUP);
}

#[test]
fn duplicated_insert_beats_plain_insert() {
    let langs = [LangDict::from_words(["book"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("bok");
    assert_eq!(full(&sugs[0], "bok"), "book");
    assert!(sugs[0].score <= SCORE_INSDUP);
}

#[test]
fn case_only_fix_costs_icase() {
    let langs = [LangDict::from_words(["Monday"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("monday");
    assert_eq!(full(&sugs[0], "monday"), "Monday");
    assert!(sugs[0].score <= SCORE_ICASE);
}

#[test]
fn banned_word_never_appears() {
    let langs = [LangDict::builder()
        .entry(WordEntry::new("Monday").keepcap())
        .entry(WordEntry::new("monday").banned())
        .build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("monday");
    let words = full_words(&sugs, "monday");
    assert!(words.contains(&"Monday".to_string()), "got {words:?}");
    assert!(!words.contains(&"monday".to_string()));
}

#[test]
fn replacement_table_rule_applies() {
    let langs = [LangDict::builder().word("fone").rep("ph", "f").build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("phone");
    let words = full_words(&sugs, "phone");
    let pos = words.iter().position(|w| w == "fone").expect("fone missing");
    assert_eq!(sugs[pos].score, SCORE_REP);
}

#[test]
fn doubled_word_collapses() {
    let langs = [LangDict::from_words(["the"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("the the");
    assert!(!sugs.is_empty());
    assert_eq!(full(&sugs[0], "the the"), "the");
    // Scored like one REP change with a sound-alike score of zero.
    assert_eq!(sugs[0].score, (3 * SCORE_REP) / 4);
    // The doubled word itself must not come back.
    assert!(full_words(&sugs, "the the")
        .iter()
        .all(|w| w != "the the"));
}

#[test]
fn doubled_word_keeps_caps() {
    let langs = [LangDict::from_words(["The", "the"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("The the");
    assert!(!sugs.is_empty());
    assert_eq!(full(&sugs[0], "The the"), "The");
}

#[test]
fn split_suggestion_for_joined_words() {
    let langs = [LangDict::from_words(["foo", "bar"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("foobar");
    let words = full_words(&sugs, "foobar");
    let pos = words.iter().position(|w| w == "foo bar").expect("no split");
    assert_eq!(sugs[pos].score, SCORE_SPLIT);
}

#[test]
fn compound_suggestion_joins_pieces() {
    let info = CompoundInfo {
        start_flags: vec![b'a'],
        all_flags: vec![b'b'],
        min_len: 1,
        ..CompoundInfo::default()
    };
    let langs = [LangDict::builder()
        .entry(WordEntry::new("foo").compound_flag(b'a'))
        .entry(WordEntry::new("bar").compound_flag(b'b'))
        .compound(info)
        .build()];
    let suggestor = Suggestor::new(&langs);
    // "fobar": doubling the "o" makes "foo" + "bar", a legal compound.
    let sugs = suggestor.suggest("fobar");
    let words = full_words(&sugs, "fobar");
    assert!(words.contains(&"foobar".to_string()), "got {words:?}");
    let pos = words.iter().position(|w| w == "foobar").unwrap();
    // Compounding itself carries no penalty; only the doubled insert is
    // charged, so the compound beats the split variant.
    assert_eq!(sugs[pos].score, SCORE_INSDUP);
    assert_eq!(pos, 0);
}

#[test]
fn empty_bad_word_yields_nothing() {
    let langs = [LangDict::from_words(["word"])];
    let suggestor = Suggestor::new(&langs);
    assert!(suggestor.suggest("").is_empty());
}

#[test]
fn fast_mode_with_limit() {
    let dict = LangDict::builder()
        .words(["hell", "hello", "help", "helm", "helot", "halo", "hilt", "held"])
        .sal(SoundRules::new([("ll", "L")]))
        .build();
    let langs = [dict];
    let suggestor =
        Suggestor::new(&langs).options(SuggestOptions::parse("fast,5").unwrap());
    let sugs = suggestor.suggest("helo");
    assert!(sugs.len() <= 5);
    assert!(!sugs.is_empty());
}

#[test]
fn sound_alike_stage_finds_phonetic_matches() {
    let dict = LangDict::builder()
        .word("phone")
        .sal(SoundRules::new([("ph", "F"), ("oa", "O")]))
        .build();
    let langs = [dict];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("fone");
    let words = full_words(&sugs, "fone");
    assert!(words.contains(&"phone".to_string()), "got {words:?}");
}

#[test]
fn word_count_bonus_prefers_common_words() {
    let langs = [LangDict::builder()
        .entry(WordEntry::new("rate"))
        .entry(WordEntry::new("late").count(500))
        .build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("gate");
    let words = full_words(&sugs, "gate");
    let late = words.iter().position(|w| w == "late").unwrap();
    let rate = words.iter().position(|w| w == "rate").unwrap();
    assert!(
        sugs[late].score < sugs[rate].score,
        "common word should score better: {sugs:?}"
    );
}

#[test]
fn output_is_sorted_and_unique() {
    let langs = [LangDict::from_words([
        "tale", "tile", "tilt", "till", "toll", "tall", "teal", "tell",
    ])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("tull");
    for pair in sugs.windows(2) {
        assert!(
            (pair[0].score, pair[0].altscore) <= (pair[1].score, pair[1].altscore),
            "not sorted: {sugs:?}"
        );
        assert!(
            !(pair[0].word == pair[1].word && pair[0].orglen == pair[1].orglen),
            "duplicate entry: {sugs:?}"
        );
    }
}

#[test]
fn timeout_returns_quickly_without_panicking() {
    let words: Vec<String> = (0..2000)
        .map(|i| format!("w{:04}x{:02}", i, i % 97))
        .collect();
    let dict = LangDict::builder().words(words).build();
    let langs = [dict];
    let suggestor =
        Suggestor::new(&langs).options(SuggestOptions::parse("timeout:1,best").unwrap());
    let start = std::time::Instant::now();
    let _ = suggestor.suggest("w0000x00y");
    assert!(
        start.elapsed() < std::time::Duration::from_secs(2),
        "timeout was not honored"
    );
}

#[test]
fn file_source_contributes_suggestions() {
    use std::io::Write;
    let path = std::env::temp_dir().join("spellsift_scenario_sug.txt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "teh\tthe").unwrap();
    drop(f);

    let langs = [LangDict::from_words(["the"])];
    let opts = SuggestOptions::parse(&format!("file:{},best", path.display())).unwrap();
    let suggestor = Suggestor::new(&langs).options(opts);
    let sugs = suggestor.suggest("teh");
    assert_eq!(full(&sugs[0], "teh"), "the");
    // The file entry scores 30, better than the swap the walker finds.
    assert!(sugs[0].score < SCORE_SWAP);

    std::fs::remove_file(&path).ok();
}

#[test]
fn expr_provider_is_consulted() {
    struct Fixed;
    impl ExprSuggestions for Fixed {
        fn suggest(&self, _badword: &str, _expr: &str) -> Vec<(String, i32)> {
            vec![("their".to_string(), 10), ("junk".to_string(), -1)]
        }
    }
    let langs = [LangDict::from_words(["their"])];
    let provider = Fixed;
    let opts = SuggestOptions::parse("expr:MySuggest(),best").unwrap();
    let suggestor = Suggestor::new(&langs).options(opts).expr_provider(&provider);
    let sugs = suggestor.suggest("thier");
    let words = full_words(&sugs, "thier");
    assert!(words.contains(&"their".to_string()));
    // Negative scores are dropped.
    assert!(!words.contains(&"junk".to_string()));
}

#[test]
fn needcomp_word_is_not_suggested_alone() {
    let info = CompoundInfo {
        start_flags: vec![b'a'],
        all_flags: vec![b'b'],
        min_len: 1,
        ..CompoundInfo::default()
    };
    let langs = [LangDict::builder()
        .entry(WordEntry::new("bahn").compound_flag(b'b').needcomp())
        .entry(WordEntry::new("auto").compound_flag(b'a'))
        .compound(info)
        .build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("bahm");
    let words = full_words(&sugs, "bahm");
    assert!(
        !words.contains(&"bahn".to_string()),
        "compound-only word suggested alone: {words:?}"
    );
}

#[test]
fn no_split_sugs_raises_the_split_penalty() {
    let plain = [LangDict::from_words(["foo", "bar"])];
    let info = CompoundInfo {
        no_split_sugs: true,
        ..CompoundInfo::default()
    };
    let nosplit = [LangDict::builder()
        .words(["foo", "bar"])
        .compound(info)
        .build()];

    let cheap = Suggestor::new(&plain).suggest("foobar");
    let dear = Suggestor::new(&nosplit).suggest("foobar");
    let score_of = |sugs: &[Suggestion], bad: &str| {
        sugs.iter()
            .find(|s| full(s, bad) == "foo bar")
            .map(|s| s.score)
    };
    let cheap_score = score_of(&cheap, "foobar").expect("split missing");
    let dear_score = score_of(&dear, "foobar").expect("split missing");
    assert!(cheap_score < dear_score);
}

#[test]
fn postponed_prefix_completes_a_stem() {
    let langs = [LangDict::builder()
        .entry(WordEntry::new("happy").prefix_group(1))
        .prefix("un", 1, false)
        .build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("unhapy");
    let words = full_words(&sugs, "unhapy");
    let pos = words
        .iter()
        .position(|w| w == "unhappy")
        .expect("prefixed word missing");
    assert!(sugs[pos].score <= SCORE_INSDUP);
    assert_eq!(pos, 0);
}

#[test]
fn rare_prefix_penalizes_the_word() {
    let common = [LangDict::builder()
        .entry(WordEntry::new("happy").prefix_group(1))
        .prefix("un", 1, false)
        .build()];
    let rare = [LangDict::builder()
        .entry(WordEntry::new("happy").prefix_group(1))
        .prefix("un", 1, true)
        .build()];
    let score_of = |langs: &[LangDict; 1]| {
        let sugs = Suggestor::new(langs).suggest("unhapy");
        sugs.iter()
            .find(|s| full(s, "unhapy") == "unhappy")
            .map(|s| s.score)
            .expect("prefixed word missing")
    };
    assert!(score_of(&common) < score_of(&rare));
}

#[test]
fn nobreak_language_validates_continuations() {
    let info = CompoundInfo {
        start_flags: vec![b'a'],
        all_flags: vec![b'b'],
        min_len: 1,
        nobreak: true,
        ..CompoundInfo::default()
    };
    let langs = [LangDict::builder()
        .entry(WordEntry::new("abc").compound_flag(b'a'))
        .entry(WordEntry::new("def").compound_flag(b'b'))
        .compound(info)
        .build()];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest("abcdxf");
    let words = full_words(&sugs, "abcdxf");
    assert!(words.contains(&"abcdef".to_string()), "got {words:?}");
    // Splitting is pointless in a language without word breaks.
    assert!(words.iter().all(|w| !w.contains(' ')), "got {words:?}");
}

#[test]
fn double_mode_interleaves_both_rankings() {
    let dict = LangDict::builder()
        .words(["phone", "prone", "plane"])
        .sal(SoundRules::new([("ph", "F"), ("pl", "PL"), ("pr", "PR")]))
        .build();
    let langs = [dict];
    let suggestor =
        Suggestor::new(&langs).options(SuggestOptions::parse("double,9").unwrap());
    let sugs = suggestor.suggest("fone");
    let words = full_words(&sugs, "fone");
    assert!(words.contains(&"phone".to_string()), "got {words:?}");
    assert!(sugs.len() <= 9);
    // Both rankings contribute; duplicates are merged away.
    let mut seen = std::collections::HashSet::new();
    for w in &words {
        assert!(seen.insert(w.clone()), "duplicate {w} in {words:?}");
    }
}

#[test]
fn need_cap_forces_capitalized_suggestions() {
    let langs = [LangDict::from_words(["london", "London"])];
    let suggestor = Suggestor::new(&langs);
    let sugs = suggestor.suggest_with("lundon", true);
    assert!(!sugs.is_empty());
    let first = full(&sugs[0], "lundon");
    assert!(
        first.starts_with('L'),
        "expected a capitalized suggestion, got {first:?}"
    );
}
