//! Sound-alike search: walking the sound-folded trie and expanding
//! phonetic matches back to original words.
//!
//! The walker runs over the sound trie with the REPSAL table and the
//! sound-folded bad word. A match there is a *phonetic* word; every
//! original word with that pronunciation is a candidate. The mapping goes
//! through the suggestion buffer: the phonetic word's ordinal selects a
//! line of delta-encoded original-word ordinals, and each ordinal is
//! resolved to its spelling by walking the fold-case trie counting
//! terminal words.
//!
//! Expanding is slow, so a per-request table remembers each phonetic word
//! with the best score seen; a repeat with a worse score is skipped.

use tracing::error;

use crate::case::{fold_char, MAXWLEN};
use crate::dictionary::flags::{WordFlags, WF_ALLCAP, WF_KEEPCAP, WF_ONECAP};
use crate::dictionary::trie::ByteTrie;
use crate::dictionary::LangDict;
use crate::distance::{edit_score, edit_score_limit};
use crate::score::{
    max_word_score, rescore, SCORE_ICASE, SCORE_LIMITMAX, SCORE_MAXMAX, SCORE_REGION,
};
use crate::suggest::walker::{trie_walk, FWORD_BUF};
use crate::suggest::{Method, SuggestState, Which};

/// Run the sound-folded trie walk for every language with sound data.
pub(crate) fn try_soundalike(su: &mut SuggestState<'_>, langs: &[LangDict]) {
    for li in 0..langs.len() {
        let lang = &langs[li];
        if !lang.has_sound_data() {
            continue;
        }
        let folded =
            String::from_utf8_lossy(&su.fbadword[..su.fbadword.len() - 1]).into_owned();
        let salword = lang.sal.as_ref().map(|s| s.sound_fold(&folded)).unwrap_or_default();
        if salword.is_empty() {
            continue;
        }
        let mut fword = [0u8; FWORD_BUF];
        let n = salword.len().min(MAXWLEN - 1);
        fword[..n].copy_from_slice(&salword.as_bytes()[..n]);
        trie_walk(su, langs, li, &mut fword, true);
    }
}

/// Drop the phonetic dedup tables; they are request-scoped.
pub(crate) fn soundalike_finish(su: &mut SuggestState<'_>) {
    for table in &mut su.sounddone {
        table.clear();
    }
}

/// A sound-folded word matched: add the original word(s) producing it.
pub(crate) fn add_sound_suggest(
    su: &mut SuggestState<'_>,
    langs: &[LangDict],
    lang_idx: usize,
    goodword: &[u8],
    score: i32,
) {
    let lang = &langs[lang_idx];

    // The same phonetic word often comes up with several scores; only
    // expand again when the score improved.
    match su.sounddone[lang_idx].entry(goodword.to_vec()) {
        std::collections::hash_map::Entry::Occupied(mut e) => {
            if score >= *e.get() {
                return;
            }
            *e.get_mut() = score;
        }
        std::collections::hash_map::Entry::Vacant(e) => {
            e.insert(score);
        }
    }

    // Find the ordinal of the phonetic word in the sound trie.
    let Some(sfwordnr) = soundfold_ordinal(&lang.sound, goodword) else {
        // The walker produced this word from the trie, so it has to be
        // findable; a miss means the word counts are inconsistent.
        if !su.drift_logged {
            error!(
                lang = %lang.name,
                phonetic = %String::from_utf8_lossy(goodword),
                "sound-folded word not found in its own trie; skipping expansion"
            );
            su.drift_logged = true;
        }
        return;
    };
    let Some(ordinals) = lang.sugbuf.ordinals(sfwordnr as usize) else {
        if !su.drift_logged {
            error!(
                lang = %lang.name,
                line = sfwordnr,
                "suggestion buffer is shorter than the sound trie; skipping expansion"
            );
            su.drift_logged = true;
        }
        return;
    };

    let ordinals: Vec<u32> = ordinals.collect();
    for orgnr in ordinals {
        // Resolve the ordinal to a spelling in the fold-case trie.
        let Some((theword, node)) = word_for_ordinal(&lang.fold, orgnr) else {
            if !su.drift_logged {
                error!(
                    lang = %lang.name,
                    ordinal = orgnr,
                    "word count mismatch while expanding a phonetic match"
                );
                su.drift_logged = true;
            }
            continue;
        };

        // Go over the flag/region variants of the word.
        let len = lang.fold.byte(node) as usize;
        for i in 1..=len {
            if lang.fold.byte(node + i) != 0 {
                break;
            }
            let mut flags = WordFlags::new(lang.fold.idx(node + i));
            if flags.is_nosuggest() {
                continue;
            }

            let word: String = if flags.is_keepcap() {
                // Must come from the keep-case tree.
                match lang.find_keepcap_word(&with_nul(&theword)) {
                    Some(kw) => String::from_utf8_lossy(&kw).into_owned(),
                    None => continue,
                }
            } else {
                flags = flags.union(su.badflags);
                let text = String::from_utf8_lossy(&theword).into_owned();
                if flags.has(WF_ONECAP | WF_ALLCAP | WF_KEEPCAP) {
                    crate::case::make_case_word(&text, flags)
                } else {
                    text
                }
            };

            if su.method == Method::Double {
                // Keep a separate list with the sound score.
                if score <= su.maxscore {
                    let badlen = su.badlen;
                    su.add_suggestion(
                        langs,
                        Which::Sound,
                        &word,
                        badlen,
                        score,
                        0,
                        false,
                        Some(lang_idx),
                        false,
                    );
                }
                continue;
            }

            let mut goodscore = 0i32;
            if flags.region_mask() != 0 && (flags.region_mask() & lang.region) == 0 {
                goodscore = SCORE_REGION;
            }

            // "tath" -> "Kath" is less likely than "tath" -> "path": a
            // small penalty for introducing a capital, unless the letter
            // itself matches.
            let gc = word.chars().next().unwrap_or('\0');
            if gc.is_uppercase() {
                let bc = su.badword.chars().next().unwrap_or('\0');
                if !bc.is_uppercase() && fold_char(bc) != fold_char(gc) {
                    goodscore += SCORE_ICASE / 2;
                }
            }

            // Compute the edit score for the candidate. A low limit makes
            // the iterative scorer fast; past SCORE_LIMITMAX the matrix is
            // quicker.
            let limit = max_word_score(su.sfmaxscore - goodscore, score);
            let map = if lang.map.has_map() {
                Some(&lang.map)
            } else {
                None
            };
            goodscore += if limit > SCORE_LIMITMAX {
                edit_score(map, &su.badword, &word)
            } else {
                edit_score_limit(map, &su.badword, &word, limit)
            };

            if goodscore < SCORE_MAXMAX {
                goodscore = lang.wordcount_adjust(goodscore, word.as_bytes(), false);
                goodscore = rescore(goodscore, score);
                if goodscore <= su.sfmaxscore {
                    let badlen = su.badlen;
                    su.add_suggestion(
                        langs,
                        Which::Words,
                        &word,
                        badlen,
                        goodscore,
                        score,
                        true,
                        Some(lang_idx),
                        true,
                    );
                }
            }
        }
    }
}

fn with_nul(word: &[u8]) -> Vec<u8> {
    let mut v = word.to_vec();
    v.push(0);
    v
}

/// Find `word` in the sound trie and return its ordinal: the number of
/// words that come before it in the trie.
///
/// A TAB in the checked word counts as a space, and one space may stand
/// for several.
pub(crate) fn soundfold_ordinal(trie: &ByteTrie, word: &[u8]) -> Option<u32> {
    let byte_at = |i: usize| word.get(i).copied().unwrap_or(0);
    let mut arridx = 0usize;
    let mut wlen = 0usize;
    let mut wordnr = 0u32;

    loop {
        let mut len = trie.byte(arridx) as usize;
        arridx += 1;
        if len == 0 {
            return None;
        }
        let mut c = byte_at(wlen);

        if trie.byte(arridx) == 0 {
            // The word could end here.
            if c == 0 {
                return Some(wordnr);
            }
            // Skip over the NULs, there can be several variants.
            while len > 0 && trie.byte(arridx) == 0 {
                arridx += 1;
                len -= 1;
            }
            if len == 0 {
                // No children, the word should have ended here.
                return None;
            }
            wordnr += 1;
        }

        if c == 0 {
            return None;
        }
        if c == b'\t' {
            c = b' ';
        }
        while trie.byte(arridx) < c {
            // Words under the skipped siblings come first.
            wordnr += trie.word_count(trie.idx(arridx) as usize);
            arridx += 1;
            len -= 1;
            if len == 0 {
                return None;
            }
        }
        if trie.byte(arridx) != c {
            return None;
        }

        arridx = trie.idx(arridx) as usize;
        wlen += 1;

        // One space in the stored word may match a run of whitespace.
        if c == b' ' {
            while byte_at(wlen) == b' ' || byte_at(wlen) == b'\t' {
                wlen += 1;
            }
        }
    }
}

/// Inverse of [`soundfold_ordinal`] on the fold-case trie: reconstruct the
/// spelling of word number `orgnr` by descending through the per-node word
/// counts. Returns the word bytes and the final node index, whose NUL
/// children hold the flag variants.
///
/// Returns `None` when the counts do not add up; the caller logs and skips
/// the ordinal rather than emitting a marker word.
pub(crate) fn word_for_ordinal(trie: &ByteTrie, orgnr: u32) -> Option<(Vec<u8>, usize)> {
    let mut n = 0usize;
    let mut wordcount = 0u32;
    let mut theword = Vec::new();

    for _ in 0..MAXWLEN - 3 {
        let len = trie.byte(n) as usize;
        if len == 0 {
            return None;
        }
        let has_nul = trie.byte(n + 1) == 0;
        if wordcount == orgnr && has_nul {
            return Some((theword, n));
        }
        if has_nul {
            wordcount += 1;
        }

        // Skip the NUL bytes.
        let mut i = 1usize;
        while i <= len && trie.byte(n + i) == 0 {
            i += 1;
        }
        if i > len {
            return None;
        }

        // One of the siblings holds the word.
        while i < len {
            let wc = trie.word_count(trie.idx(n + i) as usize);
            if wordcount + wc > orgnr {
                break;
            }
            wordcount += wc;
            i += 1;
        }

        theword.push(trie.byte(n + i));
        n = trie.idx(n + i) as usize;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound_trie() -> ByteTrie {
        ByteTrie::from_words(["FON", "KAT", "KOT"])
    }

    #[test]
    fn ordinals_follow_trie_order() {
        let trie = sound_trie();
        assert_eq!(soundfold_ordinal(&trie, b"FON"), Some(0));
        assert_eq!(soundfold_ordinal(&trie, b"KAT"), Some(1));
        assert_eq!(soundfold_ordinal(&trie, b"KOT"), Some(2));
        assert_eq!(soundfold_ordinal(&trie, b"MIS"), None);
        assert_eq!(soundfold_ordinal(&trie, b"KA"), None);
    }

    #[test]
    fn word_for_ordinal_inverts_ordinal() {
        let trie = ByteTrie::from_words(["ab", "ac", "b", "ba"]);
        for (word, nr) in [("ab", 0u32), ("ac", 1), ("b", 2), ("ba", 3)] {
            let found = soundfold_ordinal(&trie, word.as_bytes()).unwrap();
            assert_eq!(found, nr, "ordinal of {word}");
            let (bytes, _) = word_for_ordinal(&trie, nr).unwrap();
            assert_eq!(bytes, word.as_bytes(), "word for ordinal {nr}");
        }
        assert!(word_for_ordinal(&trie, 4).is_none());
    }

    #[test]
    fn spaces_match_whitespace_runs() {
        let trie = ByteTrie::from_words(["A B"]);
        assert_eq!(soundfold_ordinal(&trie, b"A B"), Some(0));
        assert_eq!(soundfold_ordinal(&trie, b"A  \tB"), Some(0));
    }
}
