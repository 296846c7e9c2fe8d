//! Error-tolerant depth-first search over the dictionary trie.
//!
//! Each depth of the search corresponds to one accepted byte of the
//! candidate good word. At every node a small state machine tries each
//! edit operator in a fixed order: accept or substitute a byte, delete or
//! insert one, swap or rotate the leading characters, and apply
//! replacement-table rules. An operator that can fire copies the current
//! frame one level deeper ([`child_frame`]); when its subtree is exhausted
//! the frame pops and the state advances, so backtracking is a frame-index
//! decrement and no allocation happens per node.
//!
//! Word ends (NUL children) interleave dictionary logic with the search:
//! prefix validation, banned words, case scoring, compounding and
//! splitting all happen at the terminal states.
//!
//! The same walk runs over the sound-folded trie (`soundfold` mode) with a
//! reduced rule set: no case, no word flags, no banned words, no
//! splitting, and the REPSAL table instead of REP.

use crate::case::{
    badword_captype, captype, char_at, char_len, char_to_bytes, cstr_len, is_composing,
    is_word_byte, make_case_bytes, nofold_len, skip_to_white, skip_white, utf_byte2len,
    valid_case, MAXWLEN,
};
use crate::dictionary::flags::{WordFlags, WF_ALLCAP, WF_ONECAP, WF_RARE};
use crate::dictionary::trie::ByteTrie;
use crate::dictionary::LangDict;
use crate::score::{
    SCORE_DEL, SCORE_DELCOMP, SCORE_DELDUP, SCORE_ICASE, SCORE_INS, SCORE_INSCOMP, SCORE_INSDUP,
    SCORE_NONWORD, SCORE_RARE, SCORE_REGION, SCORE_REP, SCORE_SIMILAR, SCORE_SPLIT,
    SCORE_SPLIT_NO, SCORE_SUBCOMP, SCORE_SUBST, SCORE_SWAP, SCORE_SWAP3,
};
use crate::suggest::soundfold::add_sound_suggest;
use crate::suggest::{SuggestState, Which};

/// Buffer size for the mutable bad-word copy; padded so that looking a few
/// bytes past the terminating NUL stays in bounds.
pub(crate) const FWORD_BUF: usize = MAXWLEN + 4;

// ts_flags bits.
const TSF_PREFIXOK: u8 = 1; // already checked that the prefix is OK
const TSF_DIDSPLIT: u8 = 2; // tried a split at this point
const TSF_DIDDEL: u8 = 4; // did a delete, delidx has the index

// Special prefixdepth values.
const PFD_NOPREFIX: usize = usize::MAX; // not using prefixes
const PFD_PREFIXTREE: usize = usize::MAX - 1; // walking through the prefix tree
const PFD_NOTSPECIAL: usize = usize::MAX - 2; // highest non-special value

/// States tried at each node, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WalkState {
    /// Handle NUL bytes (word ends) at the start of the node.
    #[default]
    Start,
    /// Like Start, but at the root of the prefix tree: try without prefix.
    NoPrefix,
    /// Undo the changes done for a word split or compound.
    SplitUndo,
    /// Past the NUL bytes of the node.
    EndNul,
    /// Accept or substitute each byte of the node.
    Plain,
    /// Delete a character from the bad word.
    Del,
    /// Prepare for inserting bytes.
    InsPrep,
    /// Insert a byte of this node into the bad word.
    Ins,
    /// Swap two characters.
    Swap,
    /// Undo the swap.
    Unswap,
    /// Swap two characters over three: "123" -> "321".
    Swap3,
    /// Undo the three-swap.
    Unswap3,
    /// Undo rotating three characters left.
    UnRot3L,
    /// Undo rotating three characters right.
    UnRot3R,
    /// Prepare for replacement-table rules.
    RepIni,
    /// Apply matching replacement rules.
    Rep,
    /// Undo a replacement.
    RepUndo,
    /// All operators tried, pop this frame.
    Final,
}

/// Multi-byte character progress within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Diff {
    /// No differing byte found yet.
    #[default]
    None,
    /// A differing byte was found (substitution in progress).
    Changed,
    /// A character is being inserted.
    Insert,
}

/// One level of the search; copied on push, so backtracking is free.
#[derive(Debug, Clone, Copy, Default)]
struct SearchFrame {
    state: WalkState,
    score: i32,
    /// Index of the current trie node (its length byte).
    arridx: usize,
    /// Index of the next child to try, 1-based within the node.
    curi: usize,
    /// Position in the (mutable) case-folded bad word.
    fidx: usize,
    /// Lowest fidx at which bytes may still be changed.
    fidxtry: usize,
    /// Bytes of good word collected in tword.
    twordlen: usize,
    /// Stack depth of the prefix frame, or a PFD_ special value.
    prefixdepth: usize,
    /// TSF_ bits.
    flags: u8,
    /// Bytes in the tword character being assembled, 0 when between chars.
    tcharlen: usize,
    /// Current byte index inside that character.
    tcharidx: usize,
    isdiff: Diff,
    /// fidx where the bad-word character started.
    fcharstart: usize,
    /// Length of the cased text collected in preword.
    prewordlen: usize,
    /// Start of the current word in tword, after the last split.
    splitoff: usize,
    /// fidx at the last word split.
    splitfidx: usize,
    /// Number of compound pieces collected.
    complen: usize,
    /// compflags index where splitting restarted compounding.
    compsplit: usize,
    /// Bad-word caps flags to restore on the way back.
    save_badflags: WordFlags,
    /// fidx of a deleted character; inserting it again is forbidden.
    delidx: usize,
}

/// Copy a frame one level deeper, charging `score_add`.
fn child_frame(parent: &SearchFrame, score_add: i32) -> SearchFrame {
    let mut f = *parent;
    f.state = WalkState::Start;
    f.score = parent.score + score_add;
    f.curi = 1;
    f.flags = 0;
    f
}

/// Gate for going one level deeper: bounded depth and bounded score.
#[inline]
fn try_deeper(frame: &SearchFrame, depth: usize, score_add: i32, maxscore: i32) -> bool {
    depth < MAXWLEN - 1 && frame.score + score_add < maxscore
}

/// Position of the character before byte `i` in `s`.
#[inline]
fn prev_char_pos(s: &[u8], i: usize) -> usize {
    let mut q = i.saturating_sub(1);
    while q > 0 && (s[q] & 0xc0) == 0x80 {
        q -= 1;
    }
    q
}

/// Number of characters in a byte slice.
#[inline]
fn count_chars(s: &[u8]) -> usize {
    s.iter().filter(|&&b| (b & 0xc0) != 0x80 && b != 0).count()
}

/// Byte offset of the start of the last space-separated word.
fn last_word_start(s: &[u8]) -> usize {
    let mut p = 0usize;
    loop {
        let w = skip_to_white(s, p);
        if s[w] == 0 {
            return p;
        }
        p = skip_white(s, w);
    }
}

/// Walk the trie applying edit operators to `fword`, adding everything that
/// scores under the ceiling to the suggestion set.
///
/// `fword` is a NUL-terminated buffer the walk mutates in place (swaps,
/// rotations and replacement rules) and restores on backtracking. With
/// `soundfold` the sound trie and REPSAL table are used and matches expand
/// through [`add_sound_suggest`].
pub(crate) fn trie_walk(
    su: &mut SuggestState<'_>,
    langs: &[LangDict],
    lang_idx: usize,
    fword: &mut [u8; FWORD_BUF],
    soundfold: bool,
) {
    let lang = &langs[lang_idx];

    let ftrie: &ByteTrie = if soundfold { &lang.sound } else { &lang.fold };
    let ptrie: &ByteTrie = &lang.prefix;
    let use_prefix_tree = !soundfold && !ptrie.is_empty();
    let mut trie: &ByteTrie = if use_prefix_tree { ptrie } else { ftrie };

    let mut tword = [0u8; MAXWLEN];
    // Cased words plus spaces can outgrow the collected word; padded so
    // the terminating NUL write after a copy stays in bounds.
    let mut preword = [0u8; MAXWLEN * 3 + 4];
    let mut compflags = [0u8; MAXWLEN + 2];
    let mut stack = [SearchFrame::default(); MAXWLEN];
    // Extra bytes in fword from replacement rules whose "to" is longer.
    let mut repextra: i32 = 0;

    stack[0].prefixdepth = PFD_NOPREFIX;
    if use_prefix_tree {
        stack[0].prefixdepth = PFD_PREFIXTREE;
        stack[0].state = WalkState::NoPrefix;
    }
    stack[0].curi = 1;

    let mut depth: isize = 0;
    while depth >= 0 && !su.stopped {
        let d = depth as usize;
        let mut sp = stack[d];
        match sp.state {
            WalkState::Start | WalkState::NoPrefix => {
                // Start of node: deal with NUL bytes, where tword may end.
                let node = sp.arridx;
                let len = trie.byte(node) as usize;
                let arridx = node + sp.curi;

                if sp.prefixdepth == PFD_PREFIXTREE {
                    // A NUL byte here means a prefix ends at this node.
                    let at_prefix_end = sp.curi <= len && trie.byte(arridx) == 0;
                    // Skip the NUL bytes, they are handled later.
                    let mut n = 0usize;
                    while sp.curi + n <= len && trie.byte(arridx + n) == 0 {
                        n += 1;
                    }
                    sp.curi += n;

                    let was_noprefix = sp.state == WalkState::NoPrefix;
                    sp.state = WalkState::EndNul;
                    sp.save_badflags = su.badflags;

                    // At the end of a prefix, or at the start of the
                    // prefix tree (trying without a prefix): follow with a
                    // word from the fold-case tree.
                    if d < MAXWLEN - 1 && (at_prefix_end || was_noprefix) {
                        // Caps type of the prefix part applies to the
                        // prefix itself; the rest is reclassified.
                        let n_bytes = nofold_len(fword, sp.fidx, &su.badword);
                        let prefix_flags = badword_captype(&su.badword[..n_bytes]);
                        su.badflags = badword_captype(&su.badword[n_bytes..]);

                        let mut child = child_frame(&sp, 0);
                        child.prefixdepth = d;
                        trie = ftrie;
                        child.arridx = 0;

                        tword[sp.twordlen] = 0;
                        child.prewordlen = make_case_bytes(
                            &tword[sp.splitoff..],
                            &mut preword,
                            sp.prewordlen,
                            prefix_flags,
                        );
                        child.splitoff = sp.twordlen;

                        stack[d] = sp;
                        stack[d + 1] = child;
                        depth += 1;
                        continue;
                    }
                    stack[d] = sp;
                    continue;
                }

                if sp.curi > len || trie.byte(arridx) != 0 {
                    // Past the bytes in this node and/or past NUL bytes.
                    sp.state = WalkState::EndNul;
                    sp.save_badflags = su.badflags;
                    stack[d] = sp;
                    continue;
                }

                // End of word in the tree.
                sp.curi += 1;
                let mut flags = WordFlags::new(trie.idx(arridx));

                if !soundfold && flags.is_nosuggest() {
                    stack[d] = sp;
                    continue;
                }

                let fword_ends = fword[sp.fidx] == 0
                    || if soundfold {
                        fword[sp.fidx] == b' ' || fword[sp.fidx] == b'\t'
                    } else {
                        !is_word_byte(fword, sp.fidx)
                    };
                tword[sp.twordlen] = 0;

                if !soundfold
                    && sp.prefixdepth <= PFD_NOTSPECIAL
                    && (sp.flags & TSF_PREFIXOK) == 0
                    && use_prefix_tree
                {
                    // There was a prefix before this word: check that the
                    // stem accepts it. No NUL bytes at the prefix node
                    // means this is the try without a prefix.
                    let pnode = stack[sp.prefixdepth].arridx;
                    let plen = ptrie.byte(pnode) as usize;
                    let mut any = false;
                    let mut accepted = false;
                    for i in 1..=plen {
                        if ptrie.byte(pnode + i) != 0 {
                            break;
                        }
                        any = true;
                        let pflags = WordFlags::new(ptrie.idx(pnode + i));
                        if LangDict::prefix_accepted(flags, pflags) {
                            accepted = true;
                            // A rare prefix makes the whole word rare.
                            if pflags.is_rare() {
                                flags = flags.with(WF_RARE);
                            }
                            break;
                        }
                    }
                    if any {
                        if !accepted {
                            stack[d] = sp;
                            continue;
                        }
                        sp.flags |= TSF_PREFIXOK;
                    }
                }

                // NEEDCOMPOUND: the word may not stand on its own, but
                // appending another compound piece below may still work.
                let mut goodword_ends =
                    !(sp.complen == sp.compsplit && fword_ends && flags.is_needcomp());

                let mut compound_ok = true;
                let mut prev_word_end: Option<usize> = None;
                if sp.complen > sp.compsplit {
                    if lang.compound.nobreak {
                        // When this word was not changed it is a valid
                        // continuation: suggest the first part.
                        if sp.fidx - sp.splitfidx == sp.twordlen - sp.splitoff
                            && fword[sp.splitfidx..sp.fidx]
                                == tword[sp.splitoff..sp.twordlen]
                        {
                            preword[sp.prewordlen] = 0;
                            let newscore = lang.wordcount_adjust(
                                sp.score,
                                &preword[sp.prewordlen..sp.prewordlen],
                                sp.prewordlen > 0,
                            );
                            if newscore <= su.maxscore {
                                let word =
                                    String::from_utf8_lossy(&preword[..sp.prewordlen])
                                        .into_owned();
                                let orglen =
                                    (sp.splitfidx as i32 - repextra).max(0) as usize;
                                su.add_suggestion(
                                    langs,
                                    Which::Words,
                                    &word,
                                    orglen,
                                    newscore,
                                    0,
                                    false,
                                    Some(lang_idx),
                                    false,
                                );
                            }
                            stack[d] = sp;
                            continue;
                        }
                    } else {
                        // A compound word precedes: this word must be able
                        // to continue it. Splitting was already tried for
                        // the word without the compound flag.
                        if flags.compound_flag() == 0
                            || count_chars(&tword[sp.splitoff..sp.twordlen])
                                < lang.compound.min_len
                        {
                            stack[d] = sp;
                            continue;
                        }

                        compflags[sp.complen] = flags.compound_flag();
                        compflags[sp.complen + 1] = 0;
                        let seg = sp.twordlen - sp.splitoff;
                        preword[sp.prewordlen..sp.prewordlen + seg]
                            .copy_from_slice(&tword[sp.splitoff..sp.twordlen]);
                        preword[sp.prewordlen + seg] = 0;

                        if lang.compound.check_pattern_veto(
                            &preword[..sp.prewordlen + seg],
                            sp.prewordlen,
                        ) {
                            compound_ok = false;
                        }

                        if compound_ok {
                            let p = last_word_start(&preword);
                            if fword_ends {
                                let chars =
                                    count_chars(&preword[p..p + cstr_len(&preword[p..])]);
                                if !lang.compound.can_compound(
                                    chars,
                                    &compflags[sp.compsplit..=sp.complen],
                                ) {
                                    // Not allowed yet, but adding another
                                    // short word may still make it one.
                                    compound_ok = false;
                                }
                            }
                        }

                        prev_word_end = Some(prev_char_pos(&preword, sp.prewordlen));
                    }
                }

                // Form the word with proper case in preword, appended to a
                // word from a previous split. The soundfold tree has no
                // case to apply.
                if soundfold {
                    let seg = sp.twordlen - sp.splitoff;
                    preword[sp.prewordlen..sp.prewordlen + seg]
                        .copy_from_slice(&tword[sp.splitoff..sp.twordlen]);
                    preword[sp.prewordlen + seg] = 0;
                } else if flags.is_keepcap() {
                    match lang.find_keepcap_word(&tword[sp.splitoff..]) {
                        Some(kw) => {
                            preword[sp.prewordlen..sp.prewordlen + kw.len()]
                                .copy_from_slice(&kw);
                            preword[sp.prewordlen + kw.len()] = 0;
                        }
                        None => preword[sp.prewordlen] = 0,
                    }
                } else {
                    let mut c = su.badflags;
                    if c.is_allcap() && su.badlen == char_len(su.badword.as_bytes(), 0) {
                        // A one-char bad word in all-caps is just One-cap.
                        c = WordFlags::new(WF_ONECAP);
                    }
                    c = c.union(flags);
                    // Appending a compound piece after a word character:
                    // don't capitalize it.
                    if let Some(q) = prev_word_end {
                        if is_word_byte(&preword, q) {
                            c = c.without(WF_ONECAP);
                        }
                    }
                    make_case_bytes(&tword[sp.splitoff..], &mut preword, sp.prewordlen, c);
                }

                if !soundfold {
                    // A banned word is remembered: it may match the bad
                    // word closely and must never win as a suggestion.
                    let pre_end = sp.prewordlen + cstr_len(&preword[sp.prewordlen..]);
                    let cur_word =
                        String::from_utf8_lossy(&preword[sp.prewordlen..pre_end])
                            .into_owned();
                    if flags.is_banned() {
                        su.add_banned(&cur_word);
                        stack[d] = sp;
                        continue;
                    }
                    let full_word =
                        String::from_utf8_lossy(&preword[..pre_end]).into_owned();
                    if (sp.complen == sp.compsplit && su.was_banned(&cur_word))
                        || su.was_banned(&full_word)
                    {
                        if !lang.compound.enabled() {
                            stack[d] = sp;
                            continue;
                        }
                        // The word so far is banned but compounding on may
                        // produce something acceptable.
                        goodword_ends = false;
                    }
                }

                let mut newscore = 0i32;
                if !soundfold {
                    if flags.region_mask() != 0 && (flags.region_mask() & lang.region) == 0 {
                        newscore += SCORE_REGION;
                    }
                    if flags.is_rare() {
                        newscore += SCORE_RARE;
                    }
                    let pre_end = sp.prewordlen + cstr_len(&preword[sp.prewordlen..]);
                    let cur_word = String::from_utf8_lossy(&preword[sp.prewordlen..pre_end]);
                    if !valid_case(su.badflags, captype(&cur_word)) {
                        newscore += SCORE_ICASE;
                    }
                }

                if fword_ends && goodword_ends && sp.fidx >= sp.fidxtry && compound_ok {
                    // The bad word also ends: add suggestions.
                    let pre_end = cstr_len(&preword);
                    if soundfold {
                        // A phonetic match: expand it to the original
                        // words that sound like this.
                        let phonetic = preword[..pre_end].to_vec();
                        add_sound_suggest(su, langs, lang_idx, &phonetic, sp.score);
                    } else if sp.fidx > 0 {
                        // Changing a non-word char into a word char gets a
                        // penalty: "thes," -> "these".
                        let p = prev_char_pos(fword, sp.fidx);
                        if !is_word_byte(fword, p) && preword[0] != 0 {
                            let q = prev_char_pos(&preword, pre_end);
                            if is_word_byte(&preword, q) {
                                newscore += SCORE_NONWORD;
                            }
                        }

                        let word_start = sp.prewordlen;
                        let score = lang.wordcount_adjust(
                            sp.score + newscore,
                            &preword[word_start..pre_end],
                            sp.prewordlen > 0,
                        );
                        if score <= su.maxscore {
                            let word =
                                String::from_utf8_lossy(&preword[..pre_end]).into_owned();
                            let orglen = (sp.fidx as i32 - repextra).max(0) as usize;
                            su.add_suggestion(
                                langs,
                                Which::Words,
                                &word,
                                orglen,
                                score,
                                0,
                                false,
                                Some(lang_idx),
                                false,
                            );

                            if su.badflags.is_mixcap() {
                                // Can't tell whether the word should be
                                // upper or lower case: add both.
                                let c = captype(&word);
                                if c.is_empty() || c.is_allcap() {
                                    let flip = if c.is_empty() {
                                        WordFlags::new(WF_ALLCAP)
                                    } else {
                                        WordFlags::empty()
                                    };
                                    make_case_bytes(
                                        &tword[sp.splitoff..],
                                        &mut preword,
                                        sp.prewordlen,
                                        flip,
                                    );
                                    let other_end = cstr_len(&preword);
                                    let other = String::from_utf8_lossy(
                                        &preword[..other_end],
                                    )
                                    .into_owned();
                                    su.add_suggestion(
                                        langs,
                                        Which::Words,
                                        &other,
                                        orglen,
                                        score + SCORE_ICASE,
                                        0,
                                        false,
                                        Some(lang_idx),
                                        false,
                                    );
                                }
                            }
                        }
                    }
                }

                // Try word split and/or compounding.
                if (sp.fidx >= sp.fidxtry || fword_ends) && sp.tcharlen == 0 {
                    // Past the end of the bad word a split makes no sense;
                    // otherwise even a changed next word is tried, like a
                    // split for "the the" with a different second "the".
                    let try_split =
                        (sp.fidx as i32 - repextra) < su.badlen as i32 && !soundfold;
                    let mut try_compound = false;
                    if !soundfold
                        && !lang.compound.no_compound_sugs
                        && lang.compound.enabled()
                        && flags.compound_flag() != 0
                        && count_chars(&tword[sp.splitoff..sp.twordlen])
                            >= lang.compound.min_len
                        && (lang.compound.syl_max < MAXWLEN
                            || sp.complen + 1 - sp.compsplit < lang.compound.max_pieces)
                        && lang.compound.can_be_compound(
                            sp.complen == sp.compsplit,
                            &compflags[sp.compsplit..sp.complen],
                            flags.compound_flag(),
                        )
                    {
                        try_compound = true;
                        compflags[sp.complen] = flags.compound_flag();
                        compflags[sp.complen + 1] = 0;
                    }

                    if lang.compound.nobreak && !lang.compound.no_compound_sugs {
                        // NOBREAK never splits; compounding is the only
                        // way to validate a continuation.
                        try_compound = true;
                    } else if !fword_ends
                        && try_compound
                        && (sp.flags & TSF_DIDSPLIT) == 0
                    {
                        // Both are possible here: do the split first and
                        // redo this NUL for the compound.
                        try_compound = false;
                        sp.flags |= TSF_DIDSPLIT;
                        sp.curi -= 1;
                        compflags[sp.complen] = 0;
                    } else {
                        sp.flags &= !TSF_DIDSPLIT;
                    }

                    if try_split || try_compound {
                        if !try_compound && (!fword_ends || !goodword_ends) {
                            // Going to split: the words so far must be
                            // valid on their own.
                            if sp.complen == sp.compsplit && flags.is_needcomp() {
                                stack[d] = sp;
                                continue;
                            }
                            let p = last_word_start(&preword);
                            if sp.complen > sp.compsplit {
                                let chars = count_chars(
                                    &preword[p..p + cstr_len(&preword[p..])],
                                );
                                if !lang.compound.can_compound(
                                    chars,
                                    &compflags[sp.compsplit..sp.complen],
                                ) {
                                    stack[d] = sp;
                                    continue;
                                }
                            }

                            if lang.compound.no_split_sugs {
                                newscore += SCORE_SPLIT_NO;
                            } else {
                                newscore += SCORE_SPLIT;
                            }
                            let pre_end =
                                sp.prewordlen + cstr_len(&preword[sp.prewordlen..]);
                            newscore = lang.wordcount_adjust(
                                newscore,
                                &preword[sp.prewordlen..pre_end],
                                true,
                            );
                        }

                        if try_deeper(&sp, d, newscore, su.maxscore) {
                            sp.save_badflags = su.badflags;
                            sp.state = WalkState::SplitUndo;

                            let mut child = child_frame(&sp, newscore);

                            // Append a space to preword when splitting.
                            if !try_compound && !fword_ends {
                                let e = cstr_len(&preword);
                                preword[e] = b' ';
                                preword[e + 1] = 0;
                            }
                            child.prewordlen = cstr_len(&preword);
                            child.splitoff = child.twordlen;
                            child.splitfidx = child.fidx;

                            // A non-word char at the split is replaced by
                            // the space; a char is always skipped when the
                            // bad word ends here, if the good word may end.
                            if ((!try_compound && !is_word_byte(fword, child.fidx))
                                || fword_ends)
                                && fword[child.fidx] != 0
                                && goodword_ends
                            {
                                let l = char_len(fword, child.fidx);
                                if fword_ends {
                                    let pl = child.prewordlen;
                                    preword[pl..pl + l].copy_from_slice(
                                        &fword[child.fidx..child.fidx + l],
                                    );
                                    child.prewordlen += l;
                                    preword[child.prewordlen] = 0;
                                } else {
                                    child.score -= SCORE_SPLIT - SCORE_SUBST;
                                }
                                child.fidx += l;
                            }

                            // Compounding extends the flag string; a split
                            // restarts compounding from here.
                            if try_compound {
                                child.complen += 1;
                            } else {
                                child.compsplit = child.complen;
                            }
                            child.prefixdepth = PFD_NOPREFIX;

                            // Caps type of the rest of the bad word.
                            let n = nofold_len(fword, child.fidx, &su.badword);
                            su.badflags =
                                badword_captype(&su.badword[n.min(su.badlen)..]);

                            child.arridx = 0;
                            if use_prefix_tree {
                                trie = ptrie;
                                child.prefixdepth = PFD_PREFIXTREE;
                                child.state = WalkState::NoPrefix;
                            }

                            stack[d] = sp;
                            stack[d + 1] = child;
                            depth += 1;
                            continue;
                        }
                    }
                }
                stack[d] = sp;
            }

            WalkState::SplitUndo => {
                // Undo the word split or compound.
                su.badflags = sp.save_badflags;
                sp.state = WalkState::Start;
                // In case the split went into the prefix tree.
                trie = ftrie;
                stack[d] = sp;
            }

            WalkState::EndNul => {
                // Past the NUL bytes of this node.
                su.badflags = sp.save_badflags;
                if fword[sp.fidx] == 0 && sp.tcharlen == 0 {
                    // The bad word ends; no byte left to accept.
                    sp.state = WalkState::Del;
                } else {
                    sp.state = WalkState::Plain;
                }
                stack[d] = sp;
            }

            WalkState::Plain => {
                let node = sp.arridx;
                if sp.curi > trie.byte(node) as usize {
                    // Done all bytes at this node. While still at already
                    // changed bytes skip the other tricks.
                    sp.state = if sp.fidx >= sp.fidxtry {
                        WalkState::Del
                    } else {
                        WalkState::Final
                    };
                    stack[d] = sp;
                    continue;
                }
                let arr = node + sp.curi;
                sp.curi += 1;
                let c = trie.byte(arr);

                // Accepting the byte is free when it matches; otherwise a
                // substitution. Not tried where bytes were already changed,
                // and not for a byte we just deleted (accepting it would
                // always be cheaper than delete plus substitute).
                let newscore = if c == fword[sp.fidx]
                    || (sp.tcharlen > 0 && sp.isdiff != Diff::None)
                {
                    0
                } else {
                    SCORE_SUBST
                };
                if (newscore == 0
                    || (sp.fidx >= sp.fidxtry
                        && ((sp.flags & TSF_DIDDEL) == 0 || c != fword[sp.delidx])))
                    && try_deeper(&sp, d, newscore, su.maxscore)
                {
                    let mut child = child_frame(&sp, newscore);
                    if fword[child.fidx] != 0 {
                        child.fidx += 1;
                    }
                    tword[child.twordlen] = c;
                    child.twordlen += 1;
                    child.arridx = trie.idx(arr) as usize;
                    if newscore == SCORE_SUBST {
                        child.isdiff = Diff::Changed;
                    }

                    // Multi-byte characters differ when any byte differs,
                    // and their lengths may differ too; score adjustments
                    // wait until the last byte of the character.
                    if child.tcharlen == 0 {
                        child.tcharidx = 0;
                        child.tcharlen = utf_byte2len(c);
                        child.fcharstart = child.fidx.saturating_sub(1);
                        child.isdiff = if newscore != 0 {
                            Diff::Changed
                        } else {
                            Diff::None
                        };
                    } else if child.isdiff == Diff::Insert && child.fidx > 0 {
                        // Inserting trail bytes does not advance in the
                        // bad word.
                        child.fidx -= 1;
                    }
                    child.tcharidx += 1;
                    if child.tcharidx == child.tcharlen {
                        // Last byte of the character.
                        if child.isdiff == Diff::Changed {
                            // Correct fidx for the byte length of the bad
                            // word character.
                            child.fidx =
                                child.fcharstart + char_len(fword, child.fcharstart);
                            let tchar =
                                char_at(&tword, child.twordlen - child.tcharlen);
                            let fchar = char_at(fword, child.fcharstart);
                            if is_composing(tchar) && is_composing(fchar) {
                                child.score -= SCORE_SUBST - SCORE_SUBCOMP;
                            } else if !soundfold
                                && lang.map.has_map()
                                && lang.map.similar(tchar, fchar)
                            {
                                child.score -= SCORE_SUBST - SCORE_SIMILAR;
                            }
                        } else if child.isdiff == Diff::Insert
                            && child.twordlen > child.tcharlen
                        {
                            let pos = child.twordlen - child.tcharlen;
                            let c2 = char_at(&tword, pos);
                            if is_composing(c2) {
                                // Inserting a composing char costs little.
                                child.score -= SCORE_INS - SCORE_INSCOMP;
                            } else {
                                let q = prev_char_pos(&tword, pos);
                                if c2 == char_at(&tword, q) {
                                    // Doubling a character.
                                    child.score -= SCORE_INS - SCORE_INSDUP;
                                }
                            }
                        }
                        child.tcharlen = 0;
                    }

                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                    continue;
                }
                stack[d] = sp;
            }

            WalkState::Del => {
                // Halfway a multi-byte char no delete/insert/swap applies.
                if sp.tcharlen > 0 {
                    sp.state = WalkState::Final;
                    stack[d] = sp;
                    continue;
                }
                sp.state = WalkState::InsPrep;
                sp.curi = 1;
                // Deleting the vowel marker at the start counts less, the
                // sound-alike scorer does the same.
                let newscore = if soundfold && sp.fidx == 0 && fword[0] == b'*' {
                    2 * SCORE_DEL / 3
                } else {
                    SCORE_DEL
                };
                if fword[sp.fidx] != 0 && try_deeper(&sp, d, newscore, su.maxscore) {
                    let mut child = child_frame(&sp, newscore);
                    // Remember the deleted character: inserting it again
                    // can never beat a substitution.
                    child.flags |= TSF_DIDDEL;
                    child.delidx = sp.fidx;

                    let c = char_at(fword, sp.fidx);
                    child.fidx += char_len(fword, sp.fidx);
                    if is_composing(c) {
                        child.score -= SCORE_DEL - SCORE_DELCOMP;
                    } else if fword[child.fidx] != 0 && c == char_at(fword, child.fidx) {
                        // Deleting one of a doubled character: "nn" -> "n".
                        child.score -= SCORE_DEL - SCORE_DELDUP;
                    }

                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                    continue;
                }
                stack[d] = sp;
            }

            WalkState::InsPrep => {
                if sp.flags & TSF_DIDDEL != 0 {
                    // Just deleted a byte: inserting is pointless, a
                    // substitute is always cheaper.
                    sp.state = WalkState::Swap;
                    stack[d] = sp;
                    continue;
                }
                // Skip over NUL bytes to the first insertable byte.
                let node = sp.arridx;
                loop {
                    if sp.curi > trie.byte(node) as usize {
                        sp.state = WalkState::Swap;
                        break;
                    }
                    if trie.byte(node + sp.curi) != 0 {
                        sp.state = WalkState::Ins;
                        break;
                    }
                    sp.curi += 1;
                }
                stack[d] = sp;
            }

            WalkState::Ins => {
                // Insert one byte at this node; repeated for each byte.
                let node = sp.arridx;
                if sp.curi > trie.byte(node) as usize {
                    sp.state = WalkState::Swap;
                    stack[d] = sp;
                    continue;
                }
                let arr = node + sp.curi;
                sp.curi += 1;
                if arr >= trie.len() {
                    // Corrupt index; abandon the walk.
                    su.stopped = true;
                    stack[d] = sp;
                    continue;
                }
                let c = trie.byte(arr);
                if c == 0 {
                    stack[d] = sp;
                    continue;
                }
                let newscore = if soundfold && sp.twordlen == 0 && c == b'*' {
                    2 * SCORE_INS / 3
                } else {
                    SCORE_INS
                };
                // Skip a byte equal to the bad word's: accepting it is
                // always better.
                if c != fword[sp.fidx] && try_deeper(&sp, d, newscore, su.maxscore) {
                    let mut child = child_frame(&sp, newscore);
                    tword[child.twordlen] = c;
                    child.twordlen += 1;
                    child.arridx = trie.idx(arr) as usize;
                    let fl = utf_byte2len(c);
                    if fl > 1 {
                        // Must collect the trail bytes before trying more
                        // operators.
                        child.tcharlen = fl;
                        child.tcharidx = 1;
                        child.isdiff = Diff::Insert;
                    } else if child.twordlen >= 2 && tword[child.twordlen - 2] == c {
                        // Doubling a character.
                        child.score -= SCORE_INS - SCORE_INSDUP;
                    }
                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                    continue;
                }
                stack[d] = sp;
            }

            WalkState::Swap => {
                // Swap two characters: "12" -> "21". fword changes in
                // place and Unswap restores it.
                let p = sp.fidx;
                if fword[p] == 0 {
                    // End of word, can't swap or replace.
                    sp.state = WalkState::Final;
                    stack[d] = sp;
                    continue;
                }
                // Swapping non-word characters makes no sense, and then
                // Swap3 and the rotations don't either.
                if !soundfold && !is_word_byte(fword, p) {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                    continue;
                }

                let n = char_len(fword, p);
                let c = char_at(fword, p);
                let c2 = if fword[p + n] == 0 {
                    '\0'
                } else if !soundfold && !is_word_byte(fword, p + n) {
                    c // don't swap a non-word char
                } else {
                    char_at(fword, p + n)
                };

                if c2 == '\0' {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                    continue;
                }
                if c == c2 {
                    // Swapping identical characters does nothing.
                    sp.state = WalkState::Swap3;
                    stack[d] = sp;
                    continue;
                }
                if try_deeper(&sp, d, SCORE_SWAP, su.maxscore) {
                    sp.state = WalkState::Unswap;
                    let fl = c2.len_utf8();
                    fword.copy_within(p + n..p + n + fl, p);
                    char_to_bytes(c, fword, p + fl);
                    let mut child = child_frame(&sp, SCORE_SWAP);
                    child.fidxtry = p + n + fl;
                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                } else {
                    // When a swap doesn't work, Swap3 won't either.
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                }
            }

            WalkState::Unswap => {
                // Undo the swap: "21" -> "12".
                let p = sp.fidx;
                let n = char_len(fword, p);
                let c = char_at(fword, p + n);
                let cl = char_len(fword, p + n);
                fword.copy_within(p..p + n, p + cl);
                char_to_bytes(c, fword, p);
                sp.state = WalkState::Swap3;
                stack[d] = sp;
            }

            WalkState::Swap3 => {
                // Swap two characters over three: "123" -> "321".
                let p = sp.fidx;
                let n = char_len(fword, p);
                let c = char_at(fword, p);
                let fl = char_len(fword, p + n);
                let c2 = char_at(fword, p + n);
                let c3 = if !soundfold && !is_word_byte(fword, p + n + fl) {
                    c // don't swap a non-word char
                } else {
                    char_at(fword, p + n + fl)
                };

                // With identical characters ("121") all the swaps and
                // rotations only repeat earlier results; skip them all.
                if c == c3 || c3 == '\0' {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                    continue;
                }
                if try_deeper(&sp, d, SCORE_SWAP3, su.maxscore) {
                    sp.state = WalkState::Unswap3;
                    let tl = c3.len_utf8();
                    fword.copy_within(p + n + fl..p + n + fl + tl, p);
                    char_to_bytes(c2, fword, p + tl);
                    char_to_bytes(c, fword, p + tl + fl);
                    let mut child = child_frame(&sp, SCORE_SWAP3);
                    child.fidxtry = p + n + fl + tl;
                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                } else {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                }
            }

            WalkState::Unswap3 => {
                // Undo Swap3: "321" -> "123".
                let p = sp.fidx;
                let n = char_len(fword, p);
                let c2 = char_at(fword, p + n);
                let fl = char_len(fword, p + n);
                let c = char_at(fword, p + n + fl);
                let tl = char_len(fword, p + n + fl);
                fword.copy_within(p..p + n, p + fl + tl);
                char_to_bytes(c, fword, p);
                char_to_bytes(c2, fword, p + tl);
                let pm = p + tl; // the middle character

                if !soundfold && !is_word_byte(fword, pm) {
                    // Middle char is not a word char, skip the rotations.
                    // First and third were already checked.
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                    continue;
                }

                // Rotate three characters left: "123" -> "231".
                if try_deeper(&sp, d, SCORE_SWAP3, su.maxscore) {
                    sp.state = WalkState::UnRot3L;
                    let n1 = char_len(fword, p);
                    let c1 = char_at(fword, p);
                    let mut fl2 = char_len(fword, p + n1);
                    fl2 += char_len(fword, p + n1 + fl2);
                    fword.copy_within(p + n1..p + n1 + fl2, p);
                    char_to_bytes(c1, fword, p + fl2);
                    let mut child = child_frame(&sp, SCORE_SWAP3);
                    child.fidxtry = p + n1 + fl2;
                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                } else {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                }
            }

            WalkState::UnRot3L => {
                // Undo the left rotation: "231" -> "123".
                let p = sp.fidx;
                let mut n = char_len(fword, p);
                n += char_len(fword, p + n);
                let c = char_at(fword, p + n);
                let tl = char_len(fword, p + n);
                fword.copy_within(p..p + n, p + tl);
                char_to_bytes(c, fword, p);

                // Rotate three characters right: "123" -> "312".
                if try_deeper(&sp, d, SCORE_SWAP3, su.maxscore) {
                    sp.state = WalkState::UnRot3R;
                    let mut n = char_len(fword, p);
                    n += char_len(fword, p + n);
                    let c = char_at(fword, p + n);
                    let tl = char_len(fword, p + n);
                    fword.copy_within(p..p + n, p + tl);
                    char_to_bytes(c, fword, p);
                    let mut child = child_frame(&sp, SCORE_SWAP3);
                    child.fidxtry = p + n + tl;
                    stack[d] = sp;
                    stack[d + 1] = child;
                    depth += 1;
                } else {
                    sp.state = WalkState::RepIni;
                    stack[d] = sp;
                }
            }

            WalkState::UnRot3R => {
                // Undo the right rotation: "312" -> "123".
                let p = sp.fidx;
                let c = char_at(fword, p);
                let tl = char_len(fword, p);
                let mut n = char_len(fword, p + tl);
                n += char_len(fword, p + tl + n);
                fword.copy_within(p + tl..p + tl + n, p);
                char_to_bytes(c, fword, p + n);
                sp.state = WalkState::RepIni;
                stack[d] = sp;
            }

            WalkState::RepIni => {
                // Check whether replacement rules can match here. Skip
                // when there are none, when the score is already too high,
                // or where bytes were changed by a swap or replacement.
                let table = if soundfold { &lang.repsal } else { &lang.rep };
                if (!soundfold && table.is_empty())
                    || sp.score + SCORE_REP >= su.maxscore
                    || sp.fidx < sp.fidxtry
                {
                    sp.state = WalkState::Final;
                    stack[d] = sp;
                    continue;
                }
                match table.first_for(fword[sp.fidx]) {
                    None => sp.state = WalkState::Final,
                    Some(i) => {
                        sp.curi = i;
                        sp.state = WalkState::Rep;
                    }
                }
                stack[d] = sp;
            }

            WalkState::Rep => {
                // Apply each matching replacement and check whether the
                // resulting word is valid.
                let p = sp.fidx;
                let table = if soundfold { &lang.repsal } else { &lang.rep };
                let mut deepened = false;
                while sp.curi < table.len() {
                    let entry = table.entry(sp.curi);
                    sp.curi += 1;
                    if entry.from[0] != fword[p] {
                        // Past all possibly matching entries.
                        sp.curi = table.len();
                        break;
                    }
                    let fl = entry.from.len();
                    let tl = entry.to.len();
                    let tail_len = cstr_len(&fword[p..]);
                    let matches = tail_len >= fl && fword[p..p + fl] == entry.from[..];
                    let fits = matches && p + tl + (tail_len - fl) + 1 < MAXWLEN;
                    if matches && fits && try_deeper(&sp, d, SCORE_REP, su.maxscore) {
                        // Change "from" into "to", to be undone later.
                        sp.state = WalkState::RepUndo;
                        if fl != tl {
                            let rest = tail_len - fl;
                            fword.copy_within(p + fl..p + fl + rest + 1, p + tl);
                            repextra += tl as i32 - fl as i32;
                        }
                        fword[p..p + tl].copy_from_slice(&entry.to);
                        let mut child = child_frame(&sp, SCORE_REP);
                        child.fidxtry = p + tl;
                        child.tcharlen = 0;
                        stack[d] = sp;
                        stack[d + 1] = child;
                        depth += 1;
                        deepened = true;
                        break;
                    }
                }
                if !deepened {
                    if sp.curi >= table.len() && sp.state == WalkState::Rep {
                        sp.state = WalkState::Final;
                    }
                    stack[d] = sp;
                }
            }

            WalkState::RepUndo => {
                // Undo the replacement and continue with the next rule.
                let table = if soundfold { &lang.repsal } else { &lang.rep };
                let entry = table.entry(sp.curi - 1);
                let fl = entry.from.len();
                let tl = entry.to.len();
                let p = sp.fidx;
                if fl != tl {
                    let rest = cstr_len(&fword[p + tl..]);
                    fword.copy_within(p + tl..p + tl + rest + 1, p + fl);
                    repextra -= tl as i32 - fl as i32;
                }
                fword[p..p + fl].copy_from_slice(&entry.from);
                sp.state = WalkState::Rep;
                stack[d] = sp;
            }

            WalkState::Final => {
                // All operators done at this level, go up one.
                depth -= 1;
                if depth >= 0 && stack[depth as usize].prefixdepth == PFD_PREFIXTREE {
                    // Continue in (or go back to) the prefix tree.
                    trie = ptrie;
                }
                // Checking the clock on every pop costs time.
                su.breakcheck();
            }
        }
    }
}
