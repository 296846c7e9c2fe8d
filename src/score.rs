//! Score constants and combinators for ranking suggestions.
//!
//! Every edit operation the engine can apply to a bad word carries a fixed
//! cost; a suggestion's score is the sum of the costs on the path that
//! produced it, minus bonuses for frequently seen words. Lower is better.
//!
//! The constants are tuned relative to each other: accepting a byte is free,
//! substituting a *similar* character ([`SCORE_SIMILAR`]) is far cheaper
//! than an arbitrary substitution ([`SCORE_SUBST`]), and a case-only
//! difference ([`SCORE_ICASE`]) sits in between. Swaps are cheaper than a
//! delete + insert pair so that transposed typos rank first.

/// Split a bad word in two (insert a space).
pub const SCORE_SPLIT: i32 = 149;
/// Split a bad word when the language declares NOSPLITSUGS.
pub const SCORE_SPLIT_NO: i32 = 249;
/// Case of the suggestion differs from the bad word.
pub const SCORE_ICASE: i32 = 52;
/// Word exists but belongs to another region.
pub const SCORE_REGION: i32 = 200;
/// Word is flagged rare.
pub const SCORE_RARE: i32 = 180;
/// Swap two adjacent characters.
pub const SCORE_SWAP: i32 = 75;
/// Swap two characters over three ("123" -> "321"), or rotate three.
pub const SCORE_SWAP3: i32 = 110;
/// Apply a replacement-table (REP) rule.
pub const SCORE_REP: i32 = 65;
/// Substitute one character.
pub const SCORE_SUBST: i32 = 93;
/// Substitute a character from the same MAP similarity class.
pub const SCORE_SIMILAR: i32 = 33;
/// Substitute a composing character.
pub const SCORE_SUBCOMP: i32 = 33;
/// Delete a character.
pub const SCORE_DEL: i32 = 94;
/// Delete one of a doubled pair ("nn" -> "n").
pub const SCORE_DELDUP: i32 = 66;
/// Delete a composing character.
pub const SCORE_DELCOMP: i32 = 28;
/// Insert a character.
pub const SCORE_INS: i32 = 96;
/// Insert a duplicate of the previous character ("bok" -> "book").
pub const SCORE_INSDUP: i32 = 67;
/// Insert a composing character.
pub const SCORE_INSCOMP: i32 = 30;
/// Change a non-word character into a word character ("thes," -> "these").
pub const SCORE_NONWORD: i32 = 103;

/// Score for a suggestion taken from a `file:` source.
pub const SCORE_FILE: i32 = 30;
/// Initial maximum score; allows for about three changes. Higher is slower.
pub const SCORE_MAXINIT: i32 = 350;

/// Bonus subtracted for words seen before.
pub const SCORE_COMMON1: i32 = 30;
/// Bonus subtracted for words seen often.
pub const SCORE_COMMON2: i32 = 40;
/// Bonus subtracted for words seen very often.
pub const SCORE_COMMON3: i32 = 50;
/// Word-count threshold for [`SCORE_COMMON2`].
pub const SCORE_THRES2: u32 = 10;
/// Word-count threshold for [`SCORE_COMMON3`].
pub const SCORE_THRES3: u32 = 100;

/// Maximum sound-fold score for the first pass.
///
/// Trying more than two changes on a sound-folded word gets slow, but with
/// fewer we miss a few good suggestions, so the sound-alike stage runs up to
/// three passes with a rising ceiling and stops as soon as enough
/// candidates are in.
pub const SCORE_SFMAX1: i32 = 200;
/// Maximum sound-fold score for the second pass.
pub const SCORE_SFMAX2: i32 = 300;
/// Maximum sound-fold score for the third pass.
pub const SCORE_SFMAX3: i32 = 400;

/// A big score difference, used when a sound-alike score is unavailable.
pub const SCORE_BIG: i32 = SCORE_INS * 3;
/// Accept any score; also the "over the limit" marker of the bounded scorer.
pub const SCORE_MAXMAX: i32 = 999_999;
/// Upper bound on limits passed to the bounded edit-distance scorer.
pub const SCORE_LIMITMAX: i32 = 350;

/// Minimum cost of any single edit the bounded scorer can still apply.
pub const SCORE_EDIT_MIN: i32 = SCORE_SIMILAR;

/// Combine a word score with a sound-alike score.
///
/// Weighs the word score three times heavier, so the ordering is mostly
/// decided by spelling distance and sound-alike similarity breaks ties.
#[inline]
pub const fn rescore(word_score: i32, sound_score: i32) -> i32 {
    (3 * word_score + sound_score) / 4
}

/// Inverse of [`rescore`]: the maximum word score that can still reach
/// `total_score` given a known `sound_score`.
#[inline]
pub const fn max_word_score(total_score: i32, sound_score: i32) -> i32 {
    (4 * total_score - sound_score) / 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescore_weights_word_score() {
        assert_eq!(rescore(SCORE_REP, 0), 48);
        assert_eq!(rescore(100, 100), 100);
        assert_eq!(rescore(0, 0), 0);
    }

    #[test]
    fn max_word_score_inverts_rescore() {
        for word in [0, 50, 93, 350] {
            for sound in [0, 75, 200] {
                let total = rescore(word, sound);
                // Integer division makes this an inequality, not an identity.
                assert!(max_word_score(total, sound) <= word);
                assert!(max_word_score(total, sound) >= word - 3);
            }
        }
    }
}
