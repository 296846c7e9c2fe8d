//! Distance scorers.
//!
//! Three routines rank how far a suggestion is from the bad word:
//!
//! - [`edit_score`]: weighted edit distance over decoded code points, with
//!   adjacent-swap transposition, case-only and similar-character
//!   discounts. Full dynamic-programming matrix, no limit.
//! - [`edit_score_limit`]: same metric but bounded; returns
//!   [`SCORE_MAXMAX`] as soon as the true distance exceeds the limit.
//!   Uses a depth-first explorer with a small explicit stack instead of
//!   the matrix, which is much faster for tight limits.
//! - [`soundalike_score`]: a fixed-depth (at most two edits) score on
//!   sound-folded strings, written out as a case analysis per length
//!   difference to stay fast.

use smallvec::SmallVec;

use crate::case::fold_char;
use crate::dictionary::SimilarMap;
use crate::score::{
    SCORE_DEL, SCORE_EDIT_MIN, SCORE_ICASE, SCORE_INS, SCORE_MAXMAX, SCORE_SIMILAR, SCORE_SUBST,
    SCORE_SWAP,
};

/// Substitution cost for `bc` -> `gc` given the optional MAP classes.
#[inline]
fn subst_cost(map: Option<&SimilarMap>, bc: char, gc: char) -> i32 {
    if fold_char(bc) == fold_char(gc) {
        SCORE_ICASE
    } else if map.is_some_and(|m| m.has_map() && m.similar(gc, bc)) {
        SCORE_SIMILAR
    } else {
        SCORE_SUBST
    }
}

/// Weighted edit distance to turn `badword` into `goodword`.
///
/// The fewer deletes/inserts/substitutes/swaps are required the lower the
/// score. `edit_score(x, x) == 0` for every `x`.
pub fn edit_score(map: Option<&SimilarMap>, badword: &str, goodword: &str) -> i32 {
    let bad: Vec<char> = badword.chars().collect();
    let good: Vec<char> = goodword.chars().collect();
    let badlen = bad.len();
    let goodlen = good.len();

    // cnt[i][j] is the cost of matching bad[..i] against good[..j],
    // flattened row-major.
    let width = goodlen + 1;
    let mut cnt = vec![0i32; (badlen + 1) * width];
    let at = |i: usize, j: usize| i * width + j;

    for j in 1..=goodlen {
        cnt[at(0, j)] = cnt[at(0, j - 1)] + SCORE_INS;
    }
    for i in 1..=badlen {
        cnt[at(i, 0)] = cnt[at(i - 1, 0)] + SCORE_DEL;
        for j in 1..=goodlen {
            let bc = bad[i - 1];
            let gc = good[j - 1];
            let mut t = if bc == gc {
                cnt[at(i - 1, j - 1)]
            } else {
                subst_cost(map, bc, gc) + cnt[at(i - 1, j - 1)]
            };
            if bc != gc {
                // Transposition only when the two characters exactly cross.
                if i > 1 && j > 1 && bc == good[j - 2] && bad[i - 2] == gc {
                    t = t.min(SCORE_SWAP + cnt[at(i - 2, j - 2)]);
                }
                t = t.min(SCORE_DEL + cnt[at(i - 1, j)]);
                t = t.min(SCORE_INS + cnt[at(i, j - 1)]);
            }
            cnt[at(i, j)] = t;
        }
    }
    cnt[at(badlen, goodlen)]
}

struct LimitFrame {
    badi: usize,
    goodi: usize,
    score: i32,
}

/// Like [`edit_score`] but bounded: returns [`SCORE_MAXMAX`] when the
/// distance exceeds `limit`.
///
/// Walks both words front to back; as long as characters are equal the
/// score stays unchanged. At a difference the delete and insert
/// alternatives are pushed onto a small stack for later, an adjacent swap
/// is taken as a shortcut when the characters cross, and the substitute
/// continues in place. Near the limit the tail comparison is inlined
/// instead of pushed, because only an exact continuation can still win.
pub fn edit_score_limit(
    map: Option<&SimilarMap>,
    badword: &str,
    goodword: &str,
    limit: i32,
) -> i32 {
    let bad: Vec<char> = badword.chars().collect();
    let good: Vec<char> = goodword.chars().collect();
    let bc_at = |i: usize| bad.get(i).copied();
    let gc_at = |i: usize| good.get(i).copied();

    let mut stack: SmallVec<[LimitFrame; 10]> = SmallVec::new();
    let mut bi = 0usize;
    let mut gi = 0usize;
    let mut score = 0i32;
    let mut minscore = limit + 1;

    'alternative: loop {
        // Skip over an equal part, the score remains the same.
        loop {
            match (bc_at(bi), gc_at(gi)) {
                (None, None) => {
                    if score < minscore {
                        minscore = score;
                    }
                    break;
                }
                (b, g) if b == g => {
                    bi += 1;
                    gi += 1;
                    continue;
                }
                _ => {}
            }
            let bc = bc_at(bi);
            let gc = gc_at(gi);

            if bc.is_none() && gc.is_none() {
                break;
            }
            if gc.is_none() {
                // The good word ends: delete the rest of the bad word.
                let mut s = score;
                let mut i = bi;
                loop {
                    s += SCORE_DEL;
                    if s >= minscore {
                        break;
                    }
                    i += 1;
                    if bc_at(i).is_none() {
                        minscore = s;
                        break;
                    }
                }
            } else if bc.is_none() {
                // The bad word ends: insert the rest of the good word.
                let mut s = score;
                let mut i = gi;
                loop {
                    s += SCORE_INS;
                    if s >= minscore {
                        break;
                    }
                    i += 1;
                    if gc_at(i).is_none() {
                        minscore = s;
                        break;
                    }
                }
            } else {
                let bc = bc.unwrap();
                let gc = gc.unwrap();

                // Round 0 tries deleting a bad char, round 1 inserting a
                // good one; only alternatives that can still beat the
                // minimum are considered.
                for round in 0..=1usize {
                    let score_off = score + if round == 0 { SCORE_DEL } else { SCORE_INS };
                    if score_off < minscore {
                        if score_off + SCORE_EDIT_MIN >= minscore {
                            // Near the limit: the rest must match exactly,
                            // check it right away.
                            let mut bi2 = bi + 1 - round;
                            let mut gi2 = gi + round;
                            loop {
                                if gc_at(gi2) != bc_at(bi2) {
                                    break;
                                }
                                if gc_at(gi2).is_none() {
                                    minscore = score_off;
                                    break;
                                }
                                bi2 += 1;
                                gi2 += 1;
                            }
                        } else {
                            stack.push(LimitFrame {
                                badi: bi + 1 - round,
                                goodi: gi + round,
                                score: score_off,
                            });
                        }
                    }
                }

                if score + SCORE_SWAP < minscore
                    && gc_at(gi + 1) == Some(bc)
                    && bc_at(bi + 1) == Some(gc)
                {
                    // A swap matches both characters; the substitution
                    // path would be more expensive, so just take it.
                    bi += 2;
                    gi += 2;
                    score += SCORE_SWAP;
                    continue;
                }

                score += subst_cost(map, bc, gc);
                if score < minscore {
                    bi += 1;
                    gi += 1;
                    continue;
                }
            }
            break;
        }

        // Try the next alternative from the stack.
        match stack.pop() {
            Some(frame) => {
                bi = frame.badi;
                gi = frame.goodi;
                score = frame.score;
                continue 'alternative;
            }
            None => break,
        }
    }

    // Over the limit the real score may be much higher; return a huge
    // value so a later bonus cannot pull it back under.
    if minscore > limit {
        SCORE_MAXMAX
    } else {
        minscore
    }
}

/// Virtual NUL-terminated byte access.
#[inline]
fn at(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(0)
}

#[inline]
fn tail(s: &[u8], i: usize) -> &[u8] {
    if i >= s.len() {
        &[]
    } else {
        &s[i..]
    }
}

/// Score two sound-folded words against each other.
///
/// Permits at most two inserts/deletes/swaps/substitutes; anything farther
/// apart returns [`SCORE_MAXMAX`]. A leading `*` marks "word starts with a
/// vowel"; adding or removing it costs only two thirds of a delete, and
/// vowels halfway the word were already collapsed by the sound folding.
pub fn soundalike_score(goodstart: &[u8], badstart: &[u8]) -> i32 {
    let mut goodsound = goodstart;
    let mut badsound = badstart;
    let mut score = 0i32;

    if (at(badsound, 0) == b'*' || at(goodsound, 0) == b'*')
        && at(badsound, 0) != at(goodsound, 0)
    {
        if (at(badsound, 0) == 0 && at(goodsound, 1) == 0)
            || (at(goodsound, 0) == 0 && at(badsound, 1) == 0)
        {
            // Changing a word with only a vowel into a word without sound.
            return SCORE_DEL;
        }
        if at(badsound, 0) == 0 || at(goodsound, 0) == 0 {
            // More than two changes.
            return SCORE_MAXMAX;
        }
        if at(badsound, 1) == at(goodsound, 1)
            || (at(badsound, 1) != 0
                && at(goodsound, 1) != 0
                && at(badsound, 2) == at(goodsound, 2))
        {
            // Handle like a substitute below.
        } else {
            score = 2 * SCORE_DEL / 3;
            if at(badsound, 0) == b'*' {
                badsound = tail(badsound, 1);
            } else {
                goodsound = tail(goodsound, 1);
            }
        }
    }

    let goodlen = goodsound.len() as i32;
    let badlen = badsound.len() as i32;
    let n = goodlen - badlen;
    if !(-2..=2).contains(&n) {
        return SCORE_MAXMAX;
    }

    // pl is the longer of the two from here on.
    let (pl, ps) = if n > 0 {
        (goodsound, badsound)
    } else {
        (badsound, goodsound)
    };
    let mut pli = 0usize;
    let mut psi = 0usize;
    while at(pl, pli) == at(ps, psi) && at(pl, pli) != 0 {
        pli += 1;
        psi += 1;
    }

    match n.abs() {
        2 => {
            // Must delete two characters from the longer word.
            pli += 1; // first delete
            while at(pl, pli) == at(ps, psi) && at(pl, pli) != 0 {
                pli += 1;
                psi += 1;
            }
            // The strings must be equal after the second delete.
            if tail(pl, pli + 1) == tail(ps, psi) {
                return score + SCORE_DEL * 2;
            }
        }
        1 => {
            // At least one delete from the longer word.

            // 1: delete
            let mut pl2 = pli + 1;
            let mut ps2 = psi;
            loop {
                if at(pl, pl2) != at(ps, ps2) {
                    break;
                }
                if at(pl, pl2) == 0 {
                    return score + SCORE_DEL;
                }
                pl2 += 1;
                ps2 += 1;
            }

            // 2: delete then swap, then the rest must be equal
            if at(pl, pl2) == at(ps, ps2 + 1)
                && at(pl, pl2 + 1) == at(ps, ps2)
                && tail(pl, pl2 + 2) == tail(ps, ps2 + 2)
            {
                return score + SCORE_DEL + SCORE_SWAP;
            }

            // 3: delete then substitute, then the rest must be equal
            if tail(pl, pl2 + 1) == tail(ps, ps2 + 1) {
                return score + SCORE_DEL + SCORE_SUBST;
            }

            // 4: first swap then delete
            if at(pl, pli) == at(ps, psi + 1) && at(pl, pli + 1) == at(ps, psi) {
                let mut pl2 = pli + 2; // swap, skip two chars
                let mut ps2 = psi + 2;
                while at(pl, pl2) == at(ps, ps2) && at(pl, pl2) != 0 {
                    pl2 += 1;
                    ps2 += 1;
                }
                // Delete a char and then the strings must be equal.
                if tail(pl, pl2 + 1) == tail(ps, ps2) {
                    return score + SCORE_SWAP + SCORE_DEL;
                }
            }

            // 5: first substitute then delete
            let mut pl2 = pli + 1; // substitute, skip one char
            let mut ps2 = psi + 1;
            while at(pl, pl2) == at(ps, ps2) && at(pl, pl2) != 0 {
                pl2 += 1;
                ps2 += 1;
            }
            if tail(pl, pl2 + 1) == tail(ps, ps2) {
                return score + SCORE_SUBST + SCORE_DEL;
            }
        }
        _ => {
            // Lengths are equal, so changes must preserve the length; an
            // insert is only possible together with a delete.

            // 1: identical strings
            if at(pl, pli) == 0 {
                return score;
            }

            // 2: swap
            if at(pl, pli) == at(ps, psi + 1) && at(pl, pli + 1) == at(ps, psi) {
                let mut pl2 = pli + 2; // swap, skip two chars
                let mut ps2 = psi + 2;
                loop {
                    if at(pl, pl2) != at(ps, ps2) {
                        break;
                    }
                    if at(pl, pl2) == 0 {
                        return score + SCORE_SWAP;
                    }
                    pl2 += 1;
                    ps2 += 1;
                }
                // 3: swap and swap again
                if at(pl, pl2) == at(ps, ps2 + 1)
                    && at(pl, pl2 + 1) == at(ps, ps2)
                    && tail(pl, pl2 + 2) == tail(ps, ps2 + 2)
                {
                    return score + SCORE_SWAP + SCORE_SWAP;
                }
                // 4: swap and substitute
                if tail(pl, pl2 + 1) == tail(ps, ps2 + 1) {
                    return score + SCORE_SWAP + SCORE_SUBST;
                }
            }

            // 5: substitute
            let mut pl2 = pli + 1;
            let mut ps2 = psi + 1;
            loop {
                if at(pl, pl2) != at(ps, ps2) {
                    break;
                }
                if at(pl, pl2) == 0 {
                    return score + SCORE_SUBST;
                }
                pl2 += 1;
                ps2 += 1;
            }

            // 6: substitute and swap
            if at(pl, pl2) == at(ps, ps2 + 1)
                && at(pl, pl2 + 1) == at(ps, ps2)
                && tail(pl, pl2 + 2) == tail(ps, ps2 + 2)
            {
                return score + SCORE_SUBST + SCORE_SWAP;
            }
            // 7: substitute and substitute
            if tail(pl, pl2 + 1) == tail(ps, ps2 + 1) {
                return score + SCORE_SUBST + SCORE_SUBST;
            }

            // 8: insert then delete
            let mut pl2 = pli;
            let mut ps2 = psi + 1;
            while at(pl, pl2) == at(ps, ps2) && at(pl, pl2) != 0 {
                pl2 += 1;
                ps2 += 1;
            }
            if tail(pl, pl2 + 1) == tail(ps, ps2) {
                return score + SCORE_INS + SCORE_DEL;
            }

            // 9: delete then insert
            let mut pl2 = pli + 1;
            let mut ps2 = psi;
            while at(pl, pl2) == at(ps, ps2) && at(pl, pl2) != 0 {
                pl2 += 1;
                ps2 += 1;
            }
            if tail(pl, pl2) == tail(ps, ps2 + 1) {
                return score + SCORE_INS + SCORE_DEL;
            }
        }
    }

    SCORE_MAXMAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_score_identity() {
        assert_eq!(edit_score(None, "test", "test"), 0);
        assert_eq!(edit_score(None, "", ""), 0);
    }

    #[test]
    fn edit_score_single_operations() {
        assert_eq!(edit_score(None, "test", "tst"), SCORE_INS);
        assert_eq!(edit_score(None, "tst", "test"), SCORE_DEL);
        assert_eq!(edit_score(None, "test", "tept"), SCORE_SUBST);
        assert_eq!(edit_score(None, "teh", "the"), SCORE_SWAP);
        assert_eq!(edit_score(None, "monday", "Monday"), SCORE_ICASE);
    }

    #[test]
    fn edit_score_uses_map_classes() {
        let mut map = SimilarMap::new();
        map.add_class("aeiou");
        assert_eq!(edit_score(Some(&map), "bag", "bog"), SCORE_SIMILAR);
        assert_eq!(edit_score(Some(&map), "bag", "bxg"), SCORE_SUBST);
    }

    #[test]
    fn edit_score_limit_agrees_with_matrix() {
        let pairs = [
            ("test", "test"),
            ("teh", "the"),
            ("hello", "helo"),
            ("kitten", "sitting"),
            ("abc", "xyz"),
        ];
        for (b, g) in pairs {
            let full = edit_score(None, b, g);
            let limited = edit_score_limit(None, b, g, 350);
            if full <= 350 {
                assert_eq!(limited, full, "{b} vs {g}");
            } else {
                assert_eq!(limited, SCORE_MAXMAX, "{b} vs {g}");
            }
        }
    }

    #[test]
    fn edit_score_limit_zero_is_equality_test() {
        assert_eq!(edit_score_limit(None, "same", "same", 0), 0);
        assert_eq!(edit_score_limit(None, "same", "sane", 0), SCORE_MAXMAX);
    }

    #[test]
    fn soundalike_identity_and_symmetry() {
        assert_eq!(soundalike_score(b"TST", b"TST"), 0);
        assert_eq!(
            soundalike_score(b"TST", b"TSK"),
            soundalike_score(b"TSK", b"TST")
        );
    }

    #[test]
    fn soundalike_simple_edits() {
        assert_eq!(soundalike_score(b"TEST", b"TEXT"), SCORE_SUBST);
        assert_eq!(soundalike_score(b"TEST", b"TESTS"), SCORE_DEL);
        assert_eq!(soundalike_score(b"TEST", b"TETS"), SCORE_SWAP);
        assert_eq!(soundalike_score(b"TEST", b"TESTXX"), 2 * SCORE_DEL);
    }

    #[test]
    fn soundalike_length_gate() {
        assert_eq!(soundalike_score(b"T", b"TESTS"), SCORE_MAXMAX);
    }

    #[test]
    fn soundalike_vowel_marker() {
        // "*" against a leading consonant: cheap partial delete.
        let with = soundalike_score(b"*BC", b"BC");
        assert_eq!(with, 2 * SCORE_DEL / 3);
        assert_eq!(soundalike_score(b"*", b""), SCORE_DEL);
    }
}
