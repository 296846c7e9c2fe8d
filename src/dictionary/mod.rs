//! Loaded dictionaries and their lookup tables.
//!
//! A [`LangDict`] bundles everything the suggestion engine needs for one
//! language: the packed byte tries (fold-case for lookup, keep-case for
//! exact-case words, prefix for postponed prefixes, sound for phonetic
//! search), the affix-derived REP/REPSAL replacement tables, MAP similarity
//! classes, compound constraints, SAL sound-folding rules, and the observed
//! word-count table.
//!
//! Dictionary *files* are out of scope; a [`LangBuilder`] constructs all of
//! this from in-memory word lists, which is what tests and embedders use.

pub mod compound;
pub mod flags;
pub mod rep;
pub mod sugbuf;
pub mod trie;

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::case::{allcap_copy, captype, case_fold, char_len, cstr_len, MAXWLEN};
use crate::phonetic::SoundRules;
use crate::score::{SCORE_COMMON1, SCORE_COMMON2, SCORE_COMMON3, SCORE_THRES2, SCORE_THRES3};
use compound::CompoundInfo;
use flags::{WordFlags, WF_BANNED, WF_KEEPCAP, WF_NEEDCOMP, WF_RARE};
use rep::RepTable;
use sugbuf::SugBuffer;
use trie::ByteTrie;

/// MAP similarity classes: characters declared similar attract the reduced
/// substitute cost.
///
/// Single-byte characters index a flat array; wider characters go through a
/// hash map. Class ids start at 1 so 0 means "in no class".
#[derive(Debug, Clone, Default)]
pub struct SimilarMap {
    ascii: Vec<u32>,
    multi: FxHashMap<char, u32>,
    classes: u32,
}

impl SimilarMap {
    /// An empty map.
    pub fn new() -> Self {
        SimilarMap {
            ascii: vec![0; 256],
            multi: FxHashMap::default(),
            classes: 0,
        }
    }

    /// Declare the characters of `class` similar to each other.
    pub fn add_class(&mut self, class: &str) {
        self.classes += 1;
        let id = self.classes;
        for c in class.chars() {
            let cp = c as u32;
            if cp < 256 {
                self.ascii[cp as usize] = id;
            } else {
                self.multi.insert(c, id);
            }
        }
    }

    /// True when at least one class is defined.
    #[inline]
    pub fn has_map(&self) -> bool {
        self.classes > 0
    }

    fn class_of(&self, c: char) -> u32 {
        let cp = c as u32;
        if cp < 256 {
            self.ascii.get(cp as usize).copied().unwrap_or(0)
        } else {
            self.multi.get(&c).copied().unwrap_or(0)
        }
    }

    /// Are `c1` and `c2` in the same class?
    pub fn similar(&self, c1: char, c2: char) -> bool {
        let m1 = self.class_of(c1);
        m1 != 0 && m1 == self.class_of(c2)
    }
}

/// One word for the [`LangBuilder`], with its dictionary properties.
#[derive(Debug, Clone)]
pub struct WordEntry {
    word: String,
    region: u8,
    compound_flag: u8,
    rare: bool,
    banned: bool,
    nosuggest: bool,
    needcomp: bool,
    keepcap: bool,
    prefix_group: u8,
    count: u32,
}

impl WordEntry {
    /// A plain word with no special properties.
    pub fn new(word: impl Into<String>) -> Self {
        WordEntry {
            word: word.into(),
            region: 0,
            compound_flag: 0,
            rare: false,
            banned: false,
            nosuggest: false,
            needcomp: false,
            keepcap: false,
            prefix_group: 0,
            count: 0,
        }
    }

    /// Restrict the word to the regions in `mask`.
    #[must_use]
    pub fn region(mut self, mask: u8) -> Self {
        self.region = mask;
        self
    }

    /// Give the word a compound flag byte.
    #[must_use]
    pub fn compound_flag(mut self, flag: u8) -> Self {
        self.compound_flag = flag;
        self
    }

    /// Mark the word rare.
    #[must_use]
    pub fn rare(mut self) -> Self {
        self.rare = true;
        self
    }

    /// Mark the word banned (a known-wrong form).
    #[must_use]
    pub fn banned(mut self) -> Self {
        self.banned = true;
        self
    }

    /// Valid word that must never be suggested.
    #[must_use]
    pub fn nosuggest(mut self) -> Self {
        self.nosuggest = true;
        self
    }

    /// Word only valid inside a compound.
    #[must_use]
    pub fn needcomp(mut self) -> Self {
        self.needcomp = true;
        self
    }

    /// Force exact-case matching even when [`captype`] would not require it.
    #[must_use]
    pub fn keepcap(mut self) -> Self {
        self.keepcap = true;
        self
    }

    /// Accept postponed prefixes of this group.
    #[must_use]
    pub fn prefix_group(mut self, group: u8) -> Self {
        self.prefix_group = group;
        self
    }

    /// Observed frequency for the common-word bonus.
    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// One loaded language, shared read-only between suggestion requests.
#[derive(Debug, Clone, Default)]
pub struct LangDict {
    /// Language name, only used in diagnostics.
    pub name: String,
    pub(crate) fold: ByteTrie,
    pub(crate) keep: ByteTrie,
    pub(crate) prefix: ByteTrie,
    pub(crate) sound: ByteTrie,
    pub(crate) sugbuf: SugBuffer,
    pub(crate) rep: RepTable,
    pub(crate) repsal: RepTable,
    pub(crate) map: SimilarMap,
    pub(crate) compound: CompoundInfo,
    pub(crate) sal: Option<SoundRules>,
    pub(crate) word_counts: FxHashMap<String, u32>,
    pub(crate) region: u8,
}

impl LangDict {
    /// Start building a language dictionary.
    pub fn builder() -> LangBuilder {
        LangBuilder::default()
    }

    /// Shorthand: a dictionary holding just these words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut b = LangDict::builder();
        for w in words {
            b = b.word(w);
        }
        b.build()
    }

    /// The language's sound folder, when SAL rules are loaded.
    pub fn sound_fold(&self, word: &str) -> Option<String> {
        self.sal.as_ref().map(|sal| sal.sound_fold(word))
    }

    /// True when the sound-folded trie and its suggestion buffer are
    /// available, enabling the sound-alike search stage.
    pub fn has_sound_data(&self) -> bool {
        self.sal.is_some() && !self.sound.is_empty()
    }

    /// Compound metadata for this language.
    pub fn compound(&self) -> &CompoundInfo {
        &self.compound
    }

    /// Observed frequency of `word`, when recorded.
    pub fn word_count(&self, word: &str) -> Option<u32> {
        self.word_counts.get(word).copied()
    }

    /// Subtract the common-word bonus from `score`.
    ///
    /// The bonus is tiered by frequency and halved for a word that came out
    /// of a split, so a split never collects the full bonus twice.
    pub(crate) fn wordcount_adjust(&self, score: i32, word: &[u8], split: bool) -> i32 {
        let Ok(word) = std::str::from_utf8(word) else {
            return score;
        };
        let Some(&count) = self.word_counts.get(word) else {
            return score;
        };
        let bonus = if count < SCORE_THRES2 {
            SCORE_COMMON1
        } else if count < SCORE_THRES3 {
            SCORE_COMMON2
        } else {
            SCORE_COMMON3
        };
        let newscore = if split {
            score - bonus / 2
        } else {
            score - bonus
        };
        newscore.max(0)
    }

    /// Does the stem accept this postponed prefix?
    pub(crate) fn prefix_accepted(stem: WordFlags, prefix: WordFlags) -> bool {
        stem.prefix_group() != 0 && stem.prefix_group() == prefix.prefix_group()
    }

    /// Find the keep-case word matching the case-folded `fword`.
    ///
    /// Each character is tried both case-folded and upper-case, because
    /// changing case may change byte lengths. There could in theory be
    /// several keep-case words folding to the same string; the first found
    /// wins.
    pub(crate) fn find_keepcap_word(&self, fword: &[u8]) -> Option<Vec<u8>> {
        if self.keep.is_empty() {
            return None;
        }
        let flen_total = cstr_len(fword);
        let ftext = String::from_utf8_lossy(&fword[..flen_total]).into_owned();
        let uword_s = allcap_copy(&ftext);
        let mut uword = uword_s.into_bytes();
        uword.push(0);

        let mut kword = vec![0u8; MAXWLEN + 1];
        let mut arridx = [0usize; MAXWLEN];
        let mut round = [0u8; MAXWLEN];
        let mut fwordidx = [0usize; MAXWLEN];
        let mut uwordidx = [0usize; MAXWLEN];
        let mut kwordlen = [0usize; MAXWLEN];

        let trie = &self.keep;
        let mut depth = 0isize;
        while depth >= 0 {
            let d = depth as usize;
            if fword[fwordidx[d]] == 0 {
                // At the end of fword: a NUL child here means a match.
                if trie.byte(arridx[d]) > 0 && trie.byte(arridx[d] + 1) == 0 {
                    kword.truncate(kwordlen[d]);
                    return Some(kword);
                }
                depth -= 1;
            } else if round[d] >= 2 {
                // Tried both folded and upper-case, go back up.
                depth -= 1;
            } else {
                round[d] += 1;
                let (src, src_idx, l) = if round[d] == 1 {
                    let l = char_len(fword, fwordidx[d]);
                    (fword, fwordidx[d], l)
                } else {
                    let l = char_len(&uword, uwordidx[d]);
                    (&uword[..], uwordidx[d], l)
                };

                // Walk the bytes of this character through the trie.
                let mut tryidx = arridx[d];
                let mut matched = true;
                for k in 0..l {
                    match trie.find_child(tryidx, src[src_idx + k]) {
                        Some(pos) => tryidx = trie.idx(pos) as usize,
                        None => {
                            matched = false;
                            break;
                        }
                    }
                }

                if matched {
                    let flen = char_len(fword, fwordidx[d]);
                    let ulen = char_len(&uword, uwordidx[d]);
                    if kwordlen[d] + l >= kword.len() || d + 1 >= MAXWLEN {
                        return None;
                    }
                    kword[kwordlen[d]..kwordlen[d] + l]
                        .copy_from_slice(&src[src_idx..src_idx + l]);
                    kwordlen[d + 1] = kwordlen[d] + l;
                    fwordidx[d + 1] = fwordidx[d] + flen;
                    uwordidx[d + 1] = uwordidx[d] + ulen;
                    depth += 1;
                    arridx[d + 1] = tryidx;
                    round[d + 1] = 0;
                }
            }
        }
        None
    }

    /// Is `word` an acceptable spelling in this language?
    ///
    /// Used for validating suggestions and for the "maybe it only needs a
    /// capital" special case. Checks the fold-case trie with case
    /// validation, the keep-case trie for KEEPCAP entries, and rejects
    /// banned and compound-only entries. NOSUGGEST words are acceptable
    /// here: they are correctly spelled, just never offered.
    pub fn word_ok(&self, word: &str) -> bool {
        let folded = case_fold(word);
        let wcaps = captype(word);
        for entry in self.fold.lookup(folded.as_bytes()) {
            if entry.is_banned() || entry.is_needcomp() {
                continue;
            }
            if entry.is_keepcap() {
                if self.keep.contains(word.as_bytes()) {
                    return true;
                }
                continue;
            }
            // An all-caps word matches any entry; otherwise the word may
            // not use less case than the entry requires, and irregular
            // case only matches through the keep-case trie above.
            let ok = if wcaps.is_allcap() {
                true
            } else if wcaps.is_keepcap() || entry.is_allcap() {
                false
            } else if entry.is_onecap() {
                wcaps.is_onecap()
            } else {
                true
            };
            if ok {
                return true;
            }
        }
        false
    }

    /// Does any flag variant of the case-folded `word` carry BANNED?
    pub(crate) fn word_banned(&self, folded: &[u8]) -> bool {
        let variants = self.fold.lookup(folded);
        !variants.is_empty() && variants.iter().all(|f| f.is_banned())
    }
}

/// Is `word` acceptable in any of the given languages?
pub fn any_word_ok(langs: &[LangDict], word: &str) -> bool {
    langs.iter().any(|l| l.word_ok(word))
}

/// Builder for a [`LangDict`]; see the module docs.
#[derive(Debug, Default)]
pub struct LangBuilder {
    name: String,
    entries: Vec<WordEntry>,
    prefixes: Vec<(String, u8, bool)>,
    rep: Vec<(String, String)>,
    repsal: Vec<(String, String)>,
    map_classes: Vec<String>,
    compound: CompoundInfo,
    sal: Option<SoundRules>,
    region: u8,
}

impl LangBuilder {
    /// Name the language.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a plain word.
    #[must_use]
    pub fn word(mut self, word: impl Into<String>) -> Self {
        self.entries.push(WordEntry::new(word));
        self
    }

    /// Add several plain words.
    #[must_use]
    pub fn words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.extend(words.into_iter().map(WordEntry::new));
        self
    }

    /// Add a word with explicit properties.
    #[must_use]
    pub fn entry(mut self, entry: WordEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add a postponed prefix in `group`, optionally rare.
    #[must_use]
    pub fn prefix(mut self, text: impl Into<String>, group: u8, rare: bool) -> Self {
        self.prefixes.push((text.into(), group, rare));
        self
    }

    /// Add a REP replacement pair.
    #[must_use]
    pub fn rep(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rep.push((from.into(), to.into()));
        self
    }

    /// Add a REPSAL pair (applied to sound-folded words).
    #[must_use]
    pub fn repsal(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.repsal.push((from.into(), to.into()));
        self
    }

    /// Declare a MAP similarity class.
    #[must_use]
    pub fn map_class(mut self, class: impl Into<String>) -> Self {
        self.map_classes.push(class.into());
        self
    }

    /// Set the compound constraints.
    #[must_use]
    pub fn compound(mut self, info: CompoundInfo) -> Self {
        self.compound = info;
        self
    }

    /// Install SAL sound-folding rules, enabling the sound-alike stage.
    #[must_use]
    pub fn sal(mut self, rules: SoundRules) -> Self {
        self.sal = Some(rules);
        self
    }

    /// Set the active region mask for this language.
    #[must_use]
    pub fn region(mut self, mask: u8) -> Self {
        self.region = mask;
        self
    }

    /// Build the packed dictionary.
    pub fn build(self) -> LangDict {
        let mut fold_entries: Vec<(Vec<u8>, Vec<WordFlags>)> = Vec::new();
        let mut keep_entries: Vec<(Vec<u8>, Vec<WordFlags>)> = Vec::new();
        let mut word_counts = FxHashMap::default();

        for e in &self.entries {
            let folded = case_fold(&e.word);
            let wcaps = captype(&e.word);
            let keepcap = e.keepcap || wcaps.is_keepcap();

            let mut f = WordFlags::empty();
            if keepcap {
                f = f.with(WF_KEEPCAP);
            } else {
                f = f.union(wcaps);
            }
            if e.rare {
                f = f.with(WF_RARE);
            }
            if e.banned {
                f = f.with(WF_BANNED);
            }
            if e.nosuggest {
                f = f.with(flags::WF_NOSUGGEST);
            }
            if e.needcomp {
                f = f.with(WF_NEEDCOMP);
            }
            f = f
                .with_region(e.region)
                .with_compound_flag(e.compound_flag)
                .with_prefix_group(e.prefix_group);

            fold_entries.push((folded.into_bytes(), vec![f]));
            if keepcap {
                keep_entries.push((e.word.clone().into_bytes(), vec![f]));
            }
            if e.count > 0 {
                word_counts.insert(e.word.clone(), e.count);
            }
        }

        let fold = ByteTrie::build(fold_entries);
        let keep = if keep_entries.is_empty() {
            ByteTrie::empty()
        } else {
            ByteTrie::build(keep_entries)
        };

        let prefix = if self.prefixes.is_empty() {
            ByteTrie::empty()
        } else {
            ByteTrie::build(self.prefixes.iter().map(|(text, group, rare)| {
                let mut f = WordFlags::empty().with_prefix_group(*group);
                if *rare {
                    f = f.with(WF_RARE);
                }
                (case_fold(text).into_bytes(), vec![f])
            }))
        };

        // Sound-folded trie and suggestion buffer: word ordinals follow the
        // fold trie's lexicographic order.
        let (sound, sugbuf) = if let Some(sal) = &self.sal {
            let mut folded_words: Vec<Vec<u8>> = self
                .entries
                .iter()
                .map(|e| case_fold(&e.word).into_bytes())
                .collect();
            folded_words.sort();
            folded_words.dedup();

            let mut by_phonetic: BTreeMap<Vec<u8>, Vec<u32>> = BTreeMap::new();
            for (ordinal, w) in folded_words.iter().enumerate() {
                let text = String::from_utf8_lossy(w);
                let phonetic = sal.sound_fold(&text).into_bytes();
                by_phonetic.entry(phonetic).or_default().push(ordinal as u32);
            }
            let sound = ByteTrie::build(
                by_phonetic
                    .keys()
                    .map(|p| (p.clone(), vec![WordFlags::empty()])),
            );
            let sugbuf = SugBuffer::new(by_phonetic.into_values());
            (sound, sugbuf)
        } else {
            (ByteTrie::empty(), SugBuffer::default())
        };

        LangDict {
            name: self.name,
            fold,
            keep,
            prefix,
            sound,
            sugbuf,
            rep: RepTable::new(self.rep),
            repsal: RepTable::new(self.repsal),
            map: {
                let mut m = SimilarMap::new();
                for c in &self.map_classes {
                    m.add_class(c);
                }
                m
            },
            compound: self.compound,
            sal: self.sal,
            word_counts,
            region: self.region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_case_flags() {
        let dict = LangDict::builder().words(["word", "Monday", "NASA"]).build();
        let plain = dict.fold.lookup(b"word");
        assert_eq!(plain.len(), 1);
        assert!(plain[0].is_empty());
        let onecap = dict.fold.lookup(b"monday");
        assert!(onecap[0].is_onecap());
        let allcap = dict.fold.lookup(b"nasa");
        assert!(allcap[0].is_allcap());
    }

    #[test]
    fn keepcap_goes_to_keep_trie() {
        let dict = LangDict::builder().word("McDonald").build();
        let folded = dict.fold.lookup(b"mcdonald");
        assert!(folded[0].is_keepcap());
        assert!(dict.keep.contains(b"McDonald"));
        let kword = dict.find_keepcap_word(b"mcdonald\0").unwrap();
        assert_eq!(kword, b"McDonald");
    }

    #[test]
    fn word_ok_validates_case() {
        let dict = LangDict::builder().words(["word", "Monday"]).build();
        assert!(dict.word_ok("word"));
        assert!(dict.word_ok("Word"));
        assert!(dict.word_ok("WORD"));
        assert!(dict.word_ok("Monday"));
        assert!(!dict.word_ok("monday"));
        assert!(!dict.word_ok("nothere"));
    }

    #[test]
    fn banned_words_are_not_ok() {
        let dict = LangDict::builder()
            .entry(WordEntry::new("monday").banned())
            .build();
        assert!(!dict.word_ok("monday"));
        assert!(dict.word_banned(b"monday"));
    }

    #[test]
    fn wordcount_bonus_tiers() {
        let dict = LangDict::builder()
            .entry(WordEntry::new("rarely").count(1))
            .entry(WordEntry::new("often").count(50))
            .entry(WordEntry::new("always").count(500))
            .build();
        assert_eq!(dict.wordcount_adjust(100, b"rarely", false), 70);
        assert_eq!(dict.wordcount_adjust(100, b"often", false), 60);
        assert_eq!(dict.wordcount_adjust(100, b"always", false), 50);
        assert_eq!(dict.wordcount_adjust(100, b"always", true), 75);
        assert_eq!(dict.wordcount_adjust(100, b"missing", false), 100);
        assert_eq!(dict.wordcount_adjust(10, b"always", false), 0);
    }

    #[test]
    fn sound_data_built_from_sal() {
        let dict = LangDict::builder()
            .words(["phone", "fone"])
            .sal(SoundRules::new([("ph", "F")]))
            .build();
        assert!(dict.has_sound_data());
        // Both words fold to "FONE": one phonetic word, one line with two
        // ordinals.
        assert!(dict.sound.contains(b"FONE"));
        assert_eq!(dict.sugbuf.len(), 1);
        let ords: Vec<u32> = dict.sugbuf.ordinals(0).unwrap().collect();
        assert_eq!(ords, vec![0, 1]);
    }
}
