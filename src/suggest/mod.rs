//! The suggestion engine: orchestration of all search stages.
//!
//! A request flows through: trivial special cases (doubled words, missing
//! capital), the error-tolerant trie walk per language, and the
//! sound-alike stage; everything lands in one deduplicating
//! [`SuggestionSet`], is rescored, sorted and truncated.
//!
//! # Example
//!
//! ```rust
//! use spellsift::prelude::*;
//!
//! let dict = LangDict::from_words(["the", "there", "their"]);
//! let langs = [dict];
//! let suggestor = Suggestor::new(&langs);
//! let words = suggestor.suggest_strings("hte");
//! assert_eq!(words[0], "the");
//! ```

mod set;
mod soundfold;
mod source;
mod walker;

pub use set::{Suggestion, SuggestionSet};
pub use source::{ExprSuggestions, WordChecker};

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::case::{badword_captype, case_fold, make_case_word, MAXWLEN};
use crate::dictionary::flags::{WordFlags, WF_ONECAP};
use crate::dictionary::LangDict;
use crate::distance::{edit_score, soundalike_score};
use crate::score::{
    rescore, SCORE_BIG, SCORE_FILE, SCORE_ICASE, SCORE_MAXINIT, SCORE_MAXMAX, SCORE_REP,
    SCORE_SFMAX1, SCORE_SFMAX2, SCORE_SFMAX3,
};
use walker::{trie_walk, FWORD_BUF};

/// Scoring strategy selected in the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Edit-distance search plus sound-alike rescoring. The default.
    #[default]
    Best,
    /// Edit-distance search only; the sound-alike stage is skipped.
    Fast,
    /// Keep edit-distance and sound-alike lists separate, rescore each
    /// with the other metric and interleave them.
    ///
    /// For a language without sound-folding data this degrades silently to
    /// plain edit-distance ranking, like [`Method::Best`].
    Double,
}

/// One entry of the parsed option list, in written order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SpsEntry {
    /// A method flag or a bare count: run the internal search here.
    Intern,
    /// Ask the expression provider.
    Expr(String),
    /// Read a suggestion file.
    File(PathBuf),
    /// Set the search deadline in milliseconds.
    Timeout(i64),
}

/// Invalid `'spellsuggest'`-style option string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionParseError {
    /// A value was not recognized.
    #[error("unknown suggestion option value: {0:?}")]
    UnknownValue(String),
    /// More than one of `best`, `fast`, `double` was given.
    #[error("only one method may be given in the suggestion options")]
    DuplicateMethod,
}

/// Parsed suggestion options.
///
/// The grammar is a comma-separated list: `best` | `fast` | `double` (at
/// most one), `expr:<expression>`, `file:<path>`, `timeout:<msec>`, or a
/// bare number limiting how many suggestions are produced. Parse failure
/// leaves the caller on [`SuggestOptions::default`] (method `best`, limit
/// 9999).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuggestOptions {
    /// Scoring strategy.
    pub method: Method,
    /// Maximum number of suggestions returned.
    pub limit: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) entries: Vec<SpsEntry>,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        SuggestOptions {
            method: Method::Best,
            limit: 9999,
            entries: vec![SpsEntry::Intern],
        }
    }
}

impl SuggestOptions {
    /// Parse a comma-separated option string.
    pub fn parse(s: &str) -> Result<Self, OptionParseError> {
        let mut method = None;
        let mut limit = 9999usize;
        let mut entries = Vec::new();

        for part in s.split(',') {
            if part.is_empty() {
                continue;
            }
            if part.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
                if !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(OptionParseError::UnknownValue(part.to_string()));
                }
                limit = part.parse().unwrap_or(9999);
                entries.push(SpsEntry::Intern);
            } else if let Some(m) = match part {
                "best" => Some(Method::Best),
                "fast" => Some(Method::Fast),
                "double" => Some(Method::Double),
                _ => None,
            } {
                if method.is_some() {
                    return Err(OptionParseError::DuplicateMethod);
                }
                method = Some(m);
                entries.push(SpsEntry::Intern);
            } else if let Some(e) = part.strip_prefix("expr:") {
                entries.push(SpsEntry::Expr(e.to_string()));
            } else if let Some(f) = part.strip_prefix("file:") {
                entries.push(SpsEntry::File(PathBuf::from(f)));
            } else if let Some(t) = part.strip_prefix("timeout:") {
                let ok = t.strip_prefix('-').unwrap_or(t);
                if ok.is_empty() || !ok.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(OptionParseError::UnknownValue(part.to_string()));
                }
                entries.push(SpsEntry::Timeout(t.parse().unwrap_or(0)));
            } else {
                return Err(OptionParseError::UnknownValue(part.to_string()));
            }
        }

        Ok(SuggestOptions {
            method: method.unwrap_or_default(),
            limit,
            entries,
        })
    }
}

impl FromStr for SuggestOptions {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SuggestOptions::parse(s)
    }
}

/// Which suggestion list an insertion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Which {
    /// The main list, ranked by word score.
    Words,
    /// The sound-alike list kept separately in `double` mode.
    Sound,
}

/// Default wall-clock budget for the trie walk, in milliseconds.
const DEFAULT_TIMEOUT_MS: i64 = 5000;

/// Number of suggestions kept when the set overflows. More than the
/// display count, because rescoring may reorder them later.
fn sug_clean_count(maxcount: usize) -> usize {
    if maxcount < 130 {
        150
    } else {
        maxcount + 20
    }
}

/// Threshold for sorting and shrinking the set during the search.
fn sug_max_count(maxcount: usize) -> usize {
    sug_clean_count(maxcount) + 50
}

/// All mutable state of one suggestion request.
pub(crate) struct SuggestState<'a> {
    /// The bad word as given (possibly truncated to the maximum length).
    pub(crate) badword: String,
    /// Byte length of the bad word.
    pub(crate) badlen: usize,
    /// Case-folded bad word, NUL-terminated.
    pub(crate) fbadword: Vec<u8>,
    /// Sound-folded bad word in the default sound-folding language.
    pub(crate) sal_badword: Vec<u8>,
    /// Caps flags of the bad word; mutated across prefix and split
    /// transitions, with the previous value saved in the search frame.
    pub(crate) badflags: WordFlags,
    pub(crate) maxcount: usize,
    /// Score ceiling for the main list; tightens as the set fills.
    pub(crate) maxscore: i32,
    /// Score ceiling for rescored sound-alike candidates.
    pub(crate) sfmaxscore: i32,
    pub(crate) words: SuggestionSet,
    pub(crate) sound_words: SuggestionSet,
    banned: FxHashSet<String>,
    /// First language with sound-folding support.
    pub(crate) sallang: Option<usize>,
    pub(crate) method: Method,
    checker: Option<&'a dyn WordChecker>,
    deadline: Option<Instant>,
    interrupt: Option<&'a AtomicBool>,
    /// Set when the deadline passed or an interrupt was seen; the search
    /// unwinds cooperatively and partial results remain valid.
    pub(crate) stopped: bool,
    breakcount: u32,
    /// Per-language phonetic dedup: best score seen per sound-folded word.
    pub(crate) sounddone: Vec<FxHashMap<Vec<u8>, i32>>,
    /// An expansion inconsistency was already reported for this request.
    pub(crate) drift_logged: bool,
}

impl<'a> SuggestState<'a> {
    fn new(
        badword: &str,
        langs: &[LangDict],
        method: Method,
        maxcount: usize,
        need_cap: bool,
        checker: Option<&'a dyn WordChecker>,
        interrupt: Option<&'a AtomicBool>,
    ) -> Self {
        let folded = case_fold(badword);
        let mut fbadword = folded.into_bytes();
        fbadword.push(0);

        let mut badflags = badword_captype(badword);
        if need_cap {
            badflags = badflags.with(WF_ONECAP);
        }

        let sallang = langs.iter().position(|l| l.sal.is_some());
        let sal_badword = sallang
            .and_then(|li| {
                let folded = String::from_utf8_lossy(&fbadword[..fbadword.len() - 1]);
                langs[li].sound_fold(&folded)
            })
            .map(String::into_bytes)
            .unwrap_or_default();

        SuggestState {
            badword: badword.to_string(),
            badlen: badword.len(),
            fbadword,
            sal_badword,
            badflags,
            maxcount,
            maxscore: SCORE_MAXINIT,
            sfmaxscore: 0,
            words: SuggestionSet::default(),
            sound_words: SuggestionSet::default(),
            banned: FxHashSet::default(),
            sallang,
            method,
            checker,
            deadline: None,
            interrupt,
            stopped: false,
            breakcount: 1000,
            sounddone: vec![FxHashMap::default(); langs.len()],
            drift_logged: false,
        }
    }

    /// Periodic deadline and interrupt check; called once per popped
    /// search frame, but only acting every 1000 calls.
    pub(crate) fn breakcheck(&mut self) {
        self.breakcount -= 1;
        if self.breakcount > 0 {
            return;
        }
        self.breakcount = 1000;
        if let Some(flag) = self.interrupt {
            if flag.load(Ordering::Relaxed) {
                self.stopped = true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                tracing::debug!("suggestion search deadline reached");
                self.stopped = true;
            }
        }
    }

    /// Remember a word that must never appear in the output.
    pub(crate) fn add_banned(&mut self, word: &str) {
        self.banned.insert(word.to_string());
    }

    /// Was this word banned for the current request?
    pub(crate) fn was_banned(&self, word: &str) -> bool {
        self.banned.contains(word)
    }

    fn list_mut(&mut self, which: Which) -> &mut SuggestionSet {
        match which {
            Which::Words => &mut self.words,
            Which::Sound => &mut self.sound_words,
        }
    }

    /// The part of the bad word after `orglen` replaced bytes.
    fn bad_tail(&self, orglen: usize) -> &str {
        self.badword.get(orglen..).unwrap_or("")
    }

    /// Sound-alike score of one suggestion against the bad word.
    ///
    /// When the suggestion replaces less than the whole bad word the
    /// remainder is appended before sound-folding, so that what replaces
    /// the bad word is compared, not just the suggestion.
    fn sal_score_of(
        &self,
        lang: &LangDict,
        badsound: &[u8],
        sug_word: &str,
        sug_orglen: usize,
    ) -> i32 {
        let Some(sal) = &lang.sal else {
            return SCORE_MAXMAX;
        };
        let lendiff = self.badlen as i64 - sug_orglen as i64;
        let pbad: Vec<u8> = if lendiff >= 0 {
            badsound.to_vec()
        } else {
            let head = self.badword.get(..sug_orglen).unwrap_or(&self.badword);
            sal.sound_fold(&case_fold(head)).into_bytes()
        };
        let pgood: String = if lendiff > 0 && sug_word.len() + (lendiff as usize) < MAXWLEN {
            format!("{}{}", sug_word, self.bad_tail(sug_orglen))
        } else {
            sug_word.to_string()
        };
        let goodsound = sal.sound_fold(&case_fold(&pgood)).into_bytes();
        soundalike_score(&goodsound, &pbad)
    }

    /// The sound-alike alt-score for a candidate, or `None` when the
    /// producing language has no sound folding.
    fn compute_altscore(
        &self,
        langs: &[LangDict],
        lang: Option<usize>,
        word: &str,
        orglen: usize,
    ) -> Option<i32> {
        let li = lang?;
        let dict = langs.get(li)?;
        dict.sal.as_ref()?;
        let badsound: Vec<u8> = if Some(li) == self.sallang {
            self.sal_badword.clone()
        } else {
            let folded = String::from_utf8_lossy(&self.fbadword[..self.fbadword.len() - 1]);
            dict.sound_fold(&folded)?.into_bytes()
        };
        let alt = self.sal_score_of(dict, &badsound, word, orglen);
        Some(if alt == SCORE_MAXMAX { SCORE_BIG } else { alt })
    }

    /// Fold the sound-alike score into one suggestion's primary score.
    fn rescore_one(&mut self, langs: &[LangDict], idx: usize) {
        let (word, orglen, lang, had_bonus) = {
            let s = &self.words.entries[idx];
            (s.word.clone(), s.orglen, s.lang, s.had_bonus)
        };
        if had_bonus {
            return;
        }
        if let Some(alt) = self.compute_altscore(langs, lang.or(self.sallang), &word, orglen) {
            let s = &mut self.words.entries[idx];
            s.altscore = alt;
            s.score = rescore(s.score, alt);
            s.had_bonus = true;
        }
    }

    /// Recompute scores with sound-alike similarity for the whole list.
    /// Slow, so only done on final results.
    fn rescore_suggestions(&mut self, langs: &[LangDict]) {
        if self.sallang.is_some() {
            for i in 0..self.words.entries.len() {
                self.rescore_one(langs, i);
            }
        }
    }

    /// Add one suggestion, deduplicating on `(word, orglen)`.
    ///
    /// `maxsf` selects which ceiling an overflow cleanup tightens: the
    /// sound-fold ceiling or the regular one.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_suggestion(
        &mut self,
        langs: &[LangDict],
        which: Which,
        goodword: &str,
        badlenarg: usize,
        score: i32,
        altscore: i32,
        had_bonus: bool,
        lang: Option<usize>,
        maxsf: bool,
    ) {
        // Minimize the replaced length: strip the common tail, so that
        // changing "the the" to "thee the" is the same suggestion as
        // changing the first "the" to "thee".
        let bad = self.badword.get(..badlenarg.min(self.badword.len())).unwrap_or("");
        let mut goodlen = goodword.len();
        let mut badlen = bad.len();
        loop {
            if goodlen == 0 || badlen == 0 {
                break;
            }
            let gc = goodword[..goodlen].chars().next_back().unwrap();
            let bc = bad[..badlen].chars().next_back().unwrap();
            if gc != bc {
                break;
            }
            goodlen -= gc.len_utf8();
            badlen -= bc.len_utf8();
        }
        if goodlen == 0 && badlen == 0 {
            // The suggestion changes nothing.
            return;
        }
        let goodword = &goodword[..goodlen];

        if let Some(pos) = self.list_mut(which).position(goodword, badlen) {
            // Already there: remember the lower score. When only one side
            // has the sound-alike bonus folded in the scores are not
            // comparable; compute the missing one first.
            let (e_word, e_orglen, e_lang, e_bonus) = {
                let e = &self.list_mut(which).entries[pos];
                (e.word.clone(), e.orglen, e.lang, e.had_bonus)
            };
            let mut new_score = score;
            let mut new_alt = altscore;
            let mut new_bonus = had_bonus;
            if e_bonus != had_bonus {
                if had_bonus {
                    if let Some(alt) =
                        self.compute_altscore(langs, e_lang.or(self.sallang), &e_word, e_orglen)
                    {
                        let e = &mut self.list_mut(which).entries[pos];
                        e.altscore = alt;
                        e.score = rescore(e.score, alt);
                        e.had_bonus = true;
                    }
                } else if let Some(alt) =
                    self.compute_altscore(langs, lang.or(self.sallang), goodword, badlen)
                {
                    new_alt = alt;
                    new_score = rescore(new_score, alt);
                    new_bonus = true;
                }
            }
            let e = &mut self.list_mut(which).entries[pos];
            if e.lang.is_none() {
                e.lang = lang;
            }
            if e.score > new_score {
                e.score = new_score;
                e.altscore = new_alt;
                e.had_bonus = new_bonus;
            }
            return;
        }

        self.list_mut(which).entries.push(Suggestion {
            word: goodword.to_string(),
            orglen: badlen,
            score,
            altscore,
            sal_score: false,
            had_bonus,
            lang,
        });

        // Too many suggestions: sort and keep the best, and tighten the
        // matching ceiling so the search stops collecting hopeless ones.
        let keep = sug_clean_count(self.maxcount);
        let cap = sug_max_count(self.maxcount);
        if self.list_mut(which).len() > cap {
            if maxsf {
                let ceiling = self.sfmaxscore;
                self.sfmaxscore = self.list_mut(which).cleanup(ceiling, keep);
            } else {
                let ceiling = self.maxscore;
                self.maxscore = self.list_mut(which).cleanup(ceiling, keep);
            }
        }
    }

    /// Remove suggestions that are errors themselves, such as banned
    /// words. The leading word of the suggestion plus the unreplaced rest
    /// of the bad word is what gets judged.
    fn check_suggestions(&mut self, langs: &[LangDict], which: Which) {
        let banned_in_dict = |word: &str| {
            let folded = case_fold(word);
            langs.iter().any(|l| l.word_banned(folded.as_bytes()))
        };
        let mut remove = Vec::new();
        {
            let entries = match which {
                Which::Words => &self.words.entries,
                Which::Sound => &self.sound_words.entries,
            };
            for (i, s) in entries.iter().enumerate() {
                let longword = format!("{}{}", s.word, self.bad_tail(s.orglen));
                let Some(first) = longword.split_whitespace().next() else {
                    remove.push(i);
                    continue;
                };
                let bad = match self.checker {
                    Some(chk) => !chk.is_valid(first),
                    None => banned_in_dict(first),
                };
                if bad {
                    remove.push(i);
                }
            }
        }
        let entries = match which {
            Which::Words => &mut self.words.entries,
            Which::Sound => &mut self.sound_words.entries,
        };
        for &i in remove.iter().rev() {
            entries.remove(i);
        }
    }
}

/// The suggestion engine front end.
///
/// Holds the loaded languages plus per-instance configuration and produces
/// ranked corrections for one bad word at a time. The engine is a pure
/// function of its inputs: nothing persists between calls except the
/// dictionaries themselves.
///
/// # Example
///
/// ```rust
/// use spellsift::prelude::*;
///
/// let dict = LangDict::from_words(["hello", "help", "hold"]);
/// let langs = [dict];
/// let suggestor = Suggestor::new(&langs)
///     .options(SuggestOptions::parse("best,8").unwrap());
/// let words = suggestor.suggest_strings("helo");
/// assert!(words.contains(&"hello".to_string()));
/// ```
pub struct Suggestor<'a> {
    langs: &'a [LangDict],
    options: SuggestOptions,
    checker: Option<&'a dyn WordChecker>,
    expr: Option<&'a dyn ExprSuggestions>,
    interrupt: Option<&'a AtomicBool>,
    ban_bad_word: bool,
}

impl<'a> Suggestor<'a> {
    /// Create an engine over the given languages with default options.
    pub fn new(langs: &'a [LangDict]) -> Self {
        Suggestor {
            langs,
            options: SuggestOptions::default(),
            checker: None,
            expr: None,
            interrupt: None,
            ban_bad_word: true,
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn options(mut self, options: SuggestOptions) -> Self {
        self.options = options;
        self
    }

    /// Install a spelling checker used for validating suggestions and the
    /// capitalization special case. Without one, a trie-backed check over
    /// the loaded languages is used.
    #[must_use]
    pub fn checker(mut self, checker: &'a dyn WordChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Install the provider backing `expr:` option entries.
    #[must_use]
    pub fn expr_provider(mut self, expr: &'a dyn ExprSuggestions) -> Self {
        self.expr = Some(expr);
        self
    }

    /// Observe this flag at the walker's check interval and stop early
    /// when it is set. Partial results are returned.
    #[must_use]
    pub fn interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Whether the bad word itself is banned from the output (on by
    /// default; it may exist in the dictionary for another region).
    #[must_use]
    pub fn ban_bad_word(mut self, ban: bool) -> Self {
        self.ban_bad_word = ban;
        self
    }

    /// Produce ranked suggestions for `badword`.
    pub fn suggest(&self, badword: &str) -> Vec<Suggestion> {
        self.suggest_with(badword, false)
    }

    /// Like [`suggest`](Self::suggest), with `need_cap` forcing
    /// capitalized suggestions (the bad word starts a sentence).
    pub fn suggest_with(&self, badword: &str, need_cap: bool) -> Vec<Suggestion> {
        if badword.is_empty() {
            return Vec::new();
        }
        let badword = truncate_word(badword);

        let mut su = SuggestState::new(
            badword,
            self.langs,
            self.options.method,
            self.options.limit,
            need_cap,
            self.checker,
            self.interrupt,
        );

        // A lowercase word the checker accepts may just need its capital.
        let first_upper = badword.chars().next().is_some_and(|c| c.is_uppercase());
        if !first_upper && self.is_valid_word(badword) {
            let cap = make_case_word(badword, WordFlags::new(WF_ONECAP));
            let badlen = su.badlen;
            let sallang = su.sallang;
            su.add_suggestion(
                self.langs,
                Which::Words,
                &cap,
                badlen,
                SCORE_ICASE,
                0,
                true,
                sallang,
                false,
            );
        }

        // The bad word itself may exist for another region; never offer
        // it back.
        if self.ban_bad_word {
            su.add_banned(badword);
        }

        let mut timeout_ms = DEFAULT_TIMEOUT_MS;
        let mut did_intern = false;
        let mut do_combine = false;
        for entry in &self.options.entries {
            match entry {
                SpsEntry::Expr(expr) => {
                    if let Some(provider) = self.expr {
                        for (word, score) in provider.suggest(badword, expr) {
                            if score >= 0 && score <= su.maxscore {
                                let badlen = su.badlen;
                                let sallang = su.sallang;
                                su.add_suggestion(
                                    self.langs,
                                    Which::Words,
                                    &word,
                                    badlen,
                                    score,
                                    0,
                                    true,
                                    sallang,
                                    false,
                                );
                            }
                        }
                        su.check_suggestions(self.langs, Which::Words);
                        su.words.cleanup(su.maxscore, su.maxcount);
                    }
                }
                SpsEntry::File(path) => {
                    for word in source::file_suggestions(path, badword, su.badflags) {
                        let badlen = su.badlen;
                        let sallang = su.sallang;
                        su.add_suggestion(
                            self.langs,
                            Which::Words,
                            &word,
                            badlen,
                            SCORE_FILE,
                            0,
                            true,
                            sallang,
                            false,
                        );
                    }
                    su.check_suggestions(self.langs, Which::Words);
                    su.words.cleanup(su.maxscore, su.maxcount);
                }
                SpsEntry::Timeout(ms) => timeout_ms = *ms,
                SpsEntry::Intern => {
                    if !did_intern {
                        su.deadline = (timeout_ms > 0).then(|| {
                            Instant::now() + Duration::from_millis(timeout_ms as u64)
                        });
                        self.suggest_intern(&mut su);
                        if self.options.method == Method::Double {
                            do_combine = true;
                        }
                        did_intern = true;
                    }
                }
            }
        }

        if do_combine {
            // Combining must come last: sorting would change the
            // interleaved order again.
            self.score_combine(&mut su);
        } else {
            su.words.cleanup(su.maxscore, su.maxcount);
        }
        su.words.into_vec()
    }

    /// Like [`suggest`](Self::suggest), returning the full replacement
    /// strings (the suggestion plus any unreplaced rest of the bad word).
    pub fn suggest_strings(&self, badword: &str) -> Vec<String> {
        self.suggest(badword)
            .into_iter()
            .map(|s| {
                let tail = badword.get(s.orglen..).unwrap_or("");
                format!("{}{}", s.word, tail)
            })
            .collect()
    }

    fn is_valid_word(&self, word: &str) -> bool {
        match self.checker {
            Some(chk) => chk.is_valid(word),
            None => crate::dictionary::any_word_ok(self.langs, word),
        }
    }

    /// The internal method: special cases, the trie walk, then the
    /// sound-alike stage.
    fn suggest_intern(&self, su: &mut SuggestState<'_>) {
        // 1. Specific situations first, like a repeated word.
        self.try_special(su);

        // 2. Insert/delete/swap/substitute letters, apply REP entries and
        //    insert spaces (split the word).
        self.try_change(su);

        if self.options.method == Method::Double {
            self.score_comp_sal(su);
        }

        // 3. Sound-alike words, skipped in fast mode.
        if self.options.method != Method::Fast {
            if self.options.method == Method::Best {
                su.rescore_suggestions(self.langs);
            }

            // During the sound-fold walk `maxscore` bounds the changes
            // tried on the phonetic word and `sfmaxscore` the rescored
            // result. Small edit distances first: that is much faster and
            // often already finds the top suggestions.
            su.maxscore = SCORE_SFMAX1;
            su.sfmaxscore = SCORE_MAXINIT * 3;
            soundfold::try_soundalike(su, self.langs);
            if su.words.len() < sug_clean_count(su.maxcount) {
                su.maxscore = SCORE_SFMAX2;
                soundfold::try_soundalike(su, self.langs);
                if su.words.len() < sug_clean_count(su.maxcount) {
                    su.maxscore = SCORE_SFMAX3;
                    soundfold::try_soundalike(su, self.langs);
                }
            }
            su.maxscore = su.sfmaxscore;
            soundfold::soundalike_finish(su);
        }

        if self.options.method != Method::Double && !su.words.is_empty() {
            if self.options.method == Method::Best {
                su.rescore_suggestions(self.langs);
            }
            su.check_suggestions(self.langs, Which::Words);
            su.maxscore = su.words.cleanup(su.maxscore, su.maxcount);
        }
    }

    /// Recognize specific situations, currently a repeated word:
    /// "the the" -> "the".
    fn try_special(&self, su: &mut SuggestState<'_>) {
        let folded = String::from_utf8_lossy(&su.fbadword[..su.fbadword.len() - 1]).into_owned();
        let Some(space) = folded.find(char::is_whitespace) else {
            return;
        };
        let first = &folded[..space];
        let rest = folded[space..].trim_start();
        if !first.is_empty() && rest == first {
            // Include the bad word's caps: "The the" -> "The".
            let word = make_case_word(first, su.badflags);
            let badlen = su.badlen;
            let sallang = su.sallang;
            // Sound-alike score 0; the word score is like one REP change.
            su.add_suggestion(
                self.langs,
                Which::Words,
                &word,
                badlen,
                rescore(SCORE_REP, 0),
                0,
                true,
                sallang,
                false,
            );
        }
    }

    /// Run the trie walk over every language.
    fn try_change(&self, su: &mut SuggestState<'_>) {
        for li in 0..self.langs.len() {
            if self.langs[li].fold.is_empty() {
                continue;
            }
            let mut fword = [0u8; FWORD_BUF];
            let n = (su.fbadword.len() - 1).min(MAXWLEN - 1);
            fword[..n].copy_from_slice(&su.fbadword[..n]);
            trie_walk(su, self.langs, li, &mut fword, false);
        }
    }

    /// Compute sound-alike scores for the main list into the separate
    /// sound list (`double` mode).
    fn score_comp_sal(&self, su: &mut SuggestState<'_>) {
        let Some(li) = self.langs.iter().position(|l| l.sal.is_some()) else {
            return;
        };
        let lang = &self.langs[li];
        let folded = String::from_utf8_lossy(&su.fbadword[..su.fbadword.len() - 1]).into_owned();
        let badsound = lang
            .sound_fold(&folded)
            .map(String::into_bytes)
            .unwrap_or_default();

        let mut sound_entries = Vec::new();
        for s in &su.words.entries {
            let score = su.sal_score_of(lang, &badsound, &s.word, s.orglen);
            if score < SCORE_MAXMAX {
                sound_entries.push(Suggestion {
                    word: s.word.clone(),
                    orglen: s.orglen,
                    score,
                    altscore: 0,
                    sal_score: false,
                    had_bonus: false,
                    lang: Some(li),
                });
            }
        }
        su.sound_words.entries.extend(sound_entries);
    }

    /// Combine the word-score and sound-alike lists (`double` mode): give
    /// each entry the other metric as alt-score, then interleave.
    fn score_combine(&self, su: &mut SuggestState<'_>) {
        let Some(li) = self.langs.iter().position(|l| l.sal.is_some()) else {
            // "double" without sound folding: plain cleanup.
            su.maxscore = su.words.cleanup(su.maxscore, su.maxcount);
            return;
        };
        let lang = &self.langs[li];
        let folded = String::from_utf8_lossy(&su.fbadword[..su.fbadword.len() - 1]).into_owned();
        let badsound = lang
            .sound_fold(&folded)
            .map(String::into_bytes)
            .unwrap_or_default();

        for i in 0..su.words.entries.len() {
            let (word, orglen) = {
                let s = &su.words.entries[i];
                (s.word.clone(), s.orglen)
            };
            let alt = su.sal_score_of(lang, &badsound, &word, orglen);
            let s = &mut su.words.entries[i];
            s.altscore = alt;
            if alt == SCORE_MAXMAX {
                s.score = (s.score * 3 + SCORE_BIG) / 4;
            } else {
                s.score = (s.score * 3 + alt) / 4;
            }
            s.sal_score = false;
        }

        let map = if lang.map.has_map() {
            Some(&lang.map)
        } else {
            None
        };
        for s in &mut su.sound_words.entries {
            s.altscore = edit_score(map, &su.badword, &s.word);
            if s.score == SCORE_MAXMAX {
                s.score = (SCORE_BIG * 7 + s.altscore) / 8;
            } else {
                s.score = (s.score * 7 + s.altscore) / 8;
            }
            s.sal_score = true;
        }

        su.check_suggestions(self.langs, Which::Words);
        su.words.cleanup(su.maxscore, su.maxcount);
        su.check_suggestions(self.langs, Which::Sound);
        su.sound_words.cleanup(su.maxscore, su.maxcount);

        // Interleave the two lists, skipping duplicates.
        let words = std::mem::take(&mut su.words.entries);
        let sounds = std::mem::take(&mut su.sound_words.entries);
        let mut merged: Vec<Suggestion> = Vec::with_capacity(words.len() + sounds.len());
        let mut iters = [words.into_iter(), sounds.into_iter()];
        loop {
            let mut any = false;
            for it in iters.iter_mut() {
                if let Some(s) = it.next() {
                    any = true;
                    if !merged.iter().any(|m| m.word == s.word) {
                        merged.push(s);
                    }
                }
            }
            if !any {
                break;
            }
        }
        merged.truncate(su.maxcount);
        su.words.entries = merged;
    }
}

/// Clamp a word to the engine's maximum length on a character boundary.
fn truncate_word(word: &str) -> &str {
    if word.len() < MAXWLEN {
        return word;
    }
    let mut end = MAXWLEN - 1;
    while end > 0 && !word.is_char_boundary(end) {
        end -= 1;
    }
    &word[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_methods_and_limit() {
        let o = SuggestOptions::parse("best,5").unwrap();
        assert_eq!(o.method, Method::Best);
        assert_eq!(o.limit, 5);
        let o = SuggestOptions::parse("fast").unwrap();
        assert_eq!(o.method, Method::Fast);
        let o = SuggestOptions::parse("double,20").unwrap();
        assert_eq!(o.method, Method::Double);
        assert_eq!(o.limit, 20);
    }

    #[test]
    fn options_parse_sources_and_timeout() {
        let o = SuggestOptions::parse("file:/tmp/sug.txt,timeout:100,9").unwrap();
        assert_eq!(
            o.entries,
            vec![
                SpsEntry::File(PathBuf::from("/tmp/sug.txt")),
                SpsEntry::Timeout(100),
                SpsEntry::Intern,
            ]
        );
        let o = SuggestOptions::parse("timeout:-1,best").unwrap();
        assert_eq!(o.entries[0], SpsEntry::Timeout(-1));
    }

    #[test]
    fn options_reject_garbage() {
        assert!(SuggestOptions::parse("bestest").is_err());
        assert!(SuggestOptions::parse("best,fast").is_err());
        assert!(SuggestOptions::parse("5x").is_err());
        assert!(SuggestOptions::parse("timeout:abc").is_err());
    }

    #[test]
    fn default_runs_internal_method() {
        let o = SuggestOptions::default();
        assert_eq!(o.method, Method::Best);
        assert_eq!(o.limit, 9999);
        assert_eq!(o.entries, vec![SpsEntry::Intern]);
    }

    #[test]
    fn truncate_word_respects_boundaries() {
        let long: String = "a".repeat(MAXWLEN * 2);
        assert_eq!(truncate_word(&long).len(), MAXWLEN - 1);
        let short = "word";
        assert_eq!(truncate_word(short), "word");
    }
}
