//! Case classification and character-level primitives.
//!
//! The engine works on NUL-terminated byte buffers holding UTF-8 text, the
//! same representation the packed tries use. This module provides the
//! byte-level character helpers (decode, encode, length-by-lead-byte) plus
//! the caps-flag logic: classifying how a word is capitalized and
//! re-applying that capitalization to a suggestion.

use crate::dictionary::flags::{self, WordFlags};

/// Maximum word length in bytes. No buffer or search depth ever exceeds it.
pub const MAXWLEN: usize = 254;

/// Number of bytes in a UTF-8 sequence, judged from the lead byte.
///
/// Continuation and invalid lead bytes count as length 1 so that malformed
/// input advances instead of looping.
#[inline]
pub(crate) fn utf_byte2len(b: u8) -> usize {
    match b {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

/// Byte length of the character starting at `s[i]`.
///
/// Clamped so that `i + len` never passes the terminating NUL.
#[inline]
pub(crate) fn char_len(s: &[u8], i: usize) -> usize {
    let l = utf_byte2len(s[i]);
    let mut n = 1;
    while n < l && i + n < s.len() && s[i + n] != 0 {
        n += 1;
    }
    n
}

/// Decode the character starting at `s[i]`.
///
/// An invalid sequence decodes as the raw lead byte (latin1 fallback), which
/// keeps scoring deterministic on malformed input.
pub(crate) fn char_at(s: &[u8], i: usize) -> char {
    let l = char_len(s, i);
    match std::str::from_utf8(&s[i..i + l]) {
        Ok(t) => t.chars().next().unwrap_or('\0'),
        Err(_) => s[i] as char,
    }
}

/// Encode `c` into `buf` starting at `i`, returning the byte length.
pub(crate) fn char_to_bytes(c: char, buf: &mut [u8], i: usize) -> usize {
    let mut tmp = [0u8; 4];
    let s = c.encode_utf8(&mut tmp);
    buf[i..i + s.len()].copy_from_slice(s.as_bytes());
    s.len()
}

/// Length of the NUL-terminated text in `s`.
#[inline]
pub(crate) fn cstr_len(s: &[u8]) -> usize {
    s.iter().position(|&b| b == 0).unwrap_or(s.len())
}

/// True for characters that can be part of a word.
#[inline]
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// True when the character starting at `s[i]` is a word character.
#[inline]
pub(crate) fn is_word_byte(s: &[u8], i: usize) -> bool {
    s[i] != 0 && is_word_char(char_at(s, i))
}

/// True for combining marks, which attract reduced edit costs.
pub(crate) fn is_composing(c: char) -> bool {
    matches!(u32::from(c),
        0x0300..=0x036f
        | 0x0483..=0x0489
        | 0x0591..=0x05bd
        | 0x0610..=0x061a
        | 0x064b..=0x065f
        | 0x0e31..=0x0e3a
        | 0x1ab0..=0x1aff
        | 0x1dc0..=0x1dff
        | 0x20d0..=0x20ff
        | 0xfe20..=0xfe2f)
}

/// Case-fold a word: every character lowercased.
pub fn case_fold(word: &str) -> String {
    word.chars().flat_map(|c| c.to_lowercase()).collect()
}

/// Fold a single character.
#[inline]
pub(crate) fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Classify the capitalization of `word`.
///
/// Returns a flags word with at most one of ONECAP, ALLCAP or KEEPCAP set:
/// "Word" is ONECAP, "WORD" is ALLCAP, and anything irregular such as
/// "WoRd" is KEEPCAP (the word must keep exactly this case). Words without
/// letters report empty flags.
pub fn captype(word: &str) -> WordFlags {
    let mut chars = word.chars().skip_while(|c| !is_word_char(*c));
    let first = match chars.next() {
        Some(c) => c,
        None => return WordFlags::empty(),
    };
    let firstcap = first.is_uppercase();
    let mut allcap = firstcap;
    let mut past_second = false;
    for c in chars {
        if !is_word_char(c) {
            continue;
        }
        if !c.is_uppercase() {
            // UUl -> KEEPCAP
            if past_second && allcap {
                return WordFlags::new(flags::WF_KEEPCAP);
            }
            allcap = false;
        } else if !allcap {
            // lU -> KEEPCAP
            return WordFlags::new(flags::WF_KEEPCAP);
        }
        past_second = true;
    }
    if allcap && past_second {
        WordFlags::new(flags::WF_ALLCAP)
    } else if firstcap {
        WordFlags::new(flags::WF_ONECAP)
    } else {
        WordFlags::empty()
    }
}

/// Like [`captype`], but for a KEEPCAP word also report how it leans.
///
/// A bad word classified KEEPCAP still needs usable caps flags so that
/// suggestions can be cased: count upper and lower case letters and add
/// ALLCAP when upper dominates (at least three), ONECAP when the first
/// letter is upper, and MIXCAP when both cases appear at least twice
/// ("maCARONI", "maCAroni").
pub fn badword_captype(word: &str) -> WordFlags {
    let mut f = captype(word);
    if !f.is_keepcap() {
        return f;
    }

    let mut upper = 0usize;
    let mut lower = 0usize;
    let mut first_upper = false;
    for (i, c) in word.chars().enumerate() {
        if c.is_uppercase() {
            upper += 1;
            if i == 0 {
                first_upper = true;
            }
        } else {
            lower += 1;
        }
    }

    // "ALl" most likely should be "All": require three upper case letters
    // before suggesting an ALLCAP word.
    if upper > lower && upper > 2 {
        f = f.with(flags::WF_ALLCAP);
    } else if first_upper {
        f = f.with(flags::WF_ONECAP);
    }
    if upper >= 2 && lower >= 2 {
        f = f.with(flags::WF_MIXCAP);
    }
    f
}

/// Apply caps flags to a (case-folded) word.
///
/// ALLCAP uppercases everything, ONECAP only the first letter; otherwise
/// the word is returned unchanged.
pub fn make_case_word(word: &str, flags: WordFlags) -> String {
    if flags.is_allcap() {
        return word.chars().flat_map(|c| c.to_uppercase()).collect();
    }
    if flags.is_onecap() {
        let mut out = String::with_capacity(word.len());
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
        }
        out.extend(chars);
        return out;
    }
    word.to_string()
}

/// Byte-buffer variant of [`make_case_word`]: write the cased form of the
/// NUL-terminated `word` into `out` at `out_off`, returning the new length.
///
/// Truncates rather than overflowing `out`; the final byte is kept free for
/// the NUL terminator.
pub(crate) fn make_case_bytes(
    word: &[u8],
    out: &mut [u8],
    out_off: usize,
    flags: WordFlags,
) -> usize {
    let len = cstr_len(word);
    let text = String::from_utf8_lossy(&word[..len]);
    let cased = make_case_word(&text, flags);
    let out_off = out_off.min(out.len().saturating_sub(1));
    let avail = out.len().saturating_sub(out_off + 1);
    let n = if cased.len() > avail {
        // Back off to a character boundary.
        let mut n = avail;
        while n > 0 && (cased.as_bytes()[n] & 0xc0) == 0x80 {
            n -= 1;
        }
        n
    } else {
        cased.len()
    };
    out[out_off..out_off + n].copy_from_slice(&cased.as_bytes()[..n]);
    out[out_off + n] = 0;
    out_off + n
}

/// All-uppercase copy of a word.
pub(crate) fn allcap_copy(word: &str) -> String {
    word.chars().flat_map(|c| c.to_uppercase()).collect()
}

/// Check whether the case of a produced word fits the bad word's caps flags.
///
/// An ALLCAP bad word accepts anything; otherwise the produced word may not
/// be ALLCAP or KEEPCAP, and may only be ONECAP when the bad word was.
pub(crate) fn valid_case(badflags: WordFlags, prod: WordFlags) -> bool {
    let bad_caps = badflags.raw()
        & (flags::WF_ONECAP | flags::WF_ALLCAP | flags::WF_KEEPCAP | flags::WF_MIXCAP);
    bad_caps == flags::WF_ALLCAP
        || (!prod.is_allcap()
            && !prod.is_keepcap()
            && (!prod.is_onecap() || badflags.is_onecap()))
}

/// Number of bytes in `orig` covering as many characters as the first
/// `fold_len` bytes of the case-folded `fword`.
///
/// Case folding may change byte lengths, so positions in the folded word
/// are mapped back to the original by character count.
pub(crate) fn nofold_len(fword: &[u8], fold_len: usize, orig: &str) -> usize {
    let mut chars = 0usize;
    let mut i = 0usize;
    while i < fold_len && fword[i] != 0 {
        i += char_len(fword, i);
        chars += 1;
    }
    let mut n = 0usize;
    for (count, (pos, c)) in orig.char_indices().enumerate() {
        if count == chars {
            return pos;
        }
        n = pos + c.len_utf8();
    }
    n
}

/// Index of the first whitespace byte at or after `i`.
pub(crate) fn skip_to_white(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && s[i] != 0 && s[i] != b' ' && s[i] != b'\t' {
        i += 1;
    }
    i
}

/// Index of the first non-whitespace byte at or after `i`.
pub(crate) fn skip_white(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && (s[i] == b' ' || s[i] == b'\t') {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captype_basic() {
        assert!(captype("word").is_empty());
        assert!(captype("Word").is_onecap());
        assert!(captype("WORD").is_allcap());
        assert!(captype("WoRd").is_keepcap());
        assert!(captype("wOrd").is_keepcap());
        assert!(captype("W").is_onecap());
        assert!(captype("...").is_empty());
    }

    #[test]
    fn badword_captype_upgrades_keepcap() {
        let f = badword_captype("MACARONi");
        assert!(f.is_keepcap());
        assert!(f.is_allcap());
        let f = badword_captype("MaCAroni");
        assert!(f.is_onecap());
        assert!(f.is_mixcap());
        // Only two upper case letters: no ALLCAP upgrade.
        let f = badword_captype("ALl");
        assert!(!f.is_allcap());
        assert!(f.is_onecap());
    }

    #[test]
    fn make_case_word_applies_flags() {
        let onecap = WordFlags::new(flags::WF_ONECAP);
        let allcap = WordFlags::new(flags::WF_ALLCAP);
        assert_eq!(make_case_word("monday", onecap), "Monday");
        assert_eq!(make_case_word("monday", allcap), "MONDAY");
        assert_eq!(make_case_word("monday", WordFlags::empty()), "monday");
    }

    #[test]
    fn valid_case_rules() {
        let none = WordFlags::empty();
        let onecap = WordFlags::new(flags::WF_ONECAP);
        let allcap = WordFlags::new(flags::WF_ALLCAP);
        // "monday" -> "Monday" needs a case change.
        assert!(!valid_case(none, onecap));
        // "Monday" -> "Monday" is fine.
        assert!(valid_case(onecap, onecap));
        // An all-caps bad word accepts anything.
        assert!(valid_case(allcap, onecap));
        assert!(valid_case(none, none));
    }

    #[test]
    fn char_helpers_handle_utf8() {
        let buf = "caf\u{e9}\0".as_bytes();
        assert_eq!(char_len(buf, 3), 2);
        assert_eq!(char_at(buf, 3), '\u{e9}');
        assert_eq!(cstr_len(buf), 5);
    }

    #[test]
    fn nofold_len_maps_positions() {
        // Folding does not change lengths here.
        let fword = b"monday\0";
        assert_eq!(nofold_len(fword, 3, "Monday"), 3);
        // Mapping is by character count, not bytes.
        let orig = "\u{c9}x"; // "Éx" folds to "éx", same char count
        let folded = case_fold(orig);
        let mut buf = [0u8; 16];
        buf[..folded.len()].copy_from_slice(folded.as_bytes());
        let one_char = char_len(&buf, 0);
        assert_eq!(nofold_len(&buf, one_char, orig), 2);
    }
}
