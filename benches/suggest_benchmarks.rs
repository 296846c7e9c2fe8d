//! Benchmarks for the suggestion pipeline and the scorers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spellsift::distance::{edit_score, edit_score_limit};
use spellsift::prelude::*;
use spellsift::score::SCORE_LIMITMAX;

fn sample_words() -> Vec<String> {
    // A small synthetic vocabulary with plenty of shared prefixes, which
    // is what keeps the trie walk honest.
    let stems = [
        "stat", "strat", "spell", "spill", "still", "stall", "steel", "steal",
        "find", "fond", "fund", "fend", "grand", "grind", "ground", "green",
    ];
    let suffixes = ["", "s", "ed", "ing", "er", "ers", "ion", "ions"];
    let mut words = Vec::new();
    for stem in stems {
        for suffix in suffixes {
            words.push(format!("{stem}{suffix}"));
        }
    }
    words
}

fn bench_suggest(c: &mut Criterion) {
    let dict = LangDict::builder()
        .words(sample_words())
        .rep("ph", "f")
        .sal(SoundRules::new([("ph", "F"), ("ee", "E"), ("ea", "E")]))
        .build();
    let langs = [dict];

    c.bench_function("suggest_best", |b| {
        let suggestor = Suggestor::new(&langs);
        b.iter(|| black_box(suggestor.suggest(black_box("stelling"))));
    });

    c.bench_function("suggest_fast", |b| {
        let suggestor =
            Suggestor::new(&langs).options(SuggestOptions::parse("fast,9").unwrap());
        b.iter(|| black_box(suggestor.suggest(black_box("stelling"))));
    });
}

fn bench_distance(c: &mut Criterion) {
    c.bench_function("edit_score_matrix", |b| {
        b.iter(|| {
            black_box(edit_score(
                None,
                black_box("acommodate"),
                black_box("accommodate"),
            ))
        });
    });

    c.bench_function("edit_score_limit", |b| {
        b.iter(|| {
            black_box(edit_score_limit(
                None,
                black_box("acommodate"),
                black_box("accommodate"),
                SCORE_LIMITMAX,
            ))
        });
    });
}

criterion_group!(benches, bench_suggest, bench_distance);
criterion_main!(benches);
