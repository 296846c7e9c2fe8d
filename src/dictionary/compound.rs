//! Compound-word metadata and the COMPOUNDRULE pattern engine.
//!
//! A dictionary word may carry a compound flag byte (top octet of its
//! [`WordFlags`](super::flags::WordFlags)). Whether a sequence of stems may
//! be joined is decided by the accumulated string of those flag bytes:
//! the first must appear in the start-flag set, later ones in the all-flag
//! set, and when COMPOUNDRULE patterns are defined the whole flag string
//! must match one of them. CHECKCOMPOUNDPATTERN pairs can veto an otherwise
//! legal join at the text level.

use crate::case::MAXWLEN;

/// One atom of a compound rule: a set of flag bytes plus a repeat modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleAtom {
    set: Vec<u8>,
    rep: Rep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rep {
    One,
    Opt,
    Star,
}

impl RuleAtom {
    #[inline]
    fn contains(&self, flag: u8) -> bool {
        self.set.contains(&flag)
    }
}

/// A parsed set of COMPOUNDRULE patterns over flag bytes.
///
/// Pattern syntax: plain flag bytes, `[abc]` groups, and the `*`, `+`, `?`
/// modifiers, e.g. `"a*b+c?"` or `"[ab]c"`.
#[derive(Debug, Clone, Default)]
pub struct CompoundRules {
    rules: Vec<Vec<RuleAtom>>,
}

impl CompoundRules {
    /// Parse rule patterns. Malformed groups (unclosed `[`) are truncated
    /// at the end of the pattern.
    pub fn parse<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| parse_rule(p.as_ref().as_bytes()))
            .collect();
        CompoundRules { rules }
    }

    /// True when no rules are defined.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Full match: `flags` is a complete, valid compound flag string.
    pub fn matches(&self, flags: &[u8]) -> bool {
        self.rules.iter().any(|r| match_atoms(r, flags, false))
    }

    /// Prefix match: `flags` could still grow into a valid flag string.
    pub fn matches_prefix(&self, flags: &[u8]) -> bool {
        self.rules.iter().any(|r| match_atoms(r, flags, true))
    }
}

fn parse_rule(pat: &[u8]) -> Vec<RuleAtom> {
    let mut atoms = Vec::new();
    let mut i = 0usize;
    while i < pat.len() {
        let set = if pat[i] == b'[' {
            let close = pat[i + 1..]
                .iter()
                .position(|&b| b == b']')
                .map(|p| i + 1 + p)
                .unwrap_or(pat.len());
            let set = pat[i + 1..close].to_vec();
            i = (close + 1).min(pat.len());
            set
        } else {
            let set = vec![pat[i]];
            i += 1;
            set
        };
        let rep = match pat.get(i) {
            Some(b'*') => {
                i += 1;
                Rep::Star
            }
            Some(b'+') => {
                i += 1;
                // "a+" is "aa*".
                atoms.push(RuleAtom {
                    set: set.clone(),
                    rep: Rep::One,
                });
                Rep::Star
            }
            Some(b'?') => {
                i += 1;
                Rep::Opt
            }
            _ => Rep::One,
        };
        atoms.push(RuleAtom { set, rep });
    }
    atoms
}

fn match_atoms(atoms: &[RuleAtom], flags: &[u8], partial: bool) -> bool {
    if flags.is_empty() {
        // A partial match only needs the flags so far to be viable.
        return partial || atoms.iter().all(|a| a.rep != Rep::One);
    }
    let Some((atom, rest)) = atoms.split_first() else {
        return false;
    };
    match atom.rep {
        Rep::One => atom.contains(flags[0]) && match_atoms(rest, &flags[1..], partial),
        Rep::Opt => {
            (atom.contains(flags[0]) && match_atoms(rest, &flags[1..], partial))
                || match_atoms(rest, flags, partial)
        }
        Rep::Star => {
            match_atoms(rest, flags, partial)
                || (atom.contains(flags[0]) && match_atoms(atoms, &flags[1..], partial))
        }
    }
}

/// Compound constraints and rules for one language.
#[derive(Debug, Clone)]
pub struct CompoundInfo {
    /// Minimum length of a compound piece, in characters.
    pub min_len: usize,
    /// Maximum length of a whole compound, in characters (syllable bound
    /// encoded as a character count). `MAXWLEN` means unlimited.
    pub syl_max: usize,
    /// Maximum number of pieces in a compound.
    pub max_pieces: usize,
    /// Flag bytes allowed on the first piece.
    pub start_flags: Vec<u8>,
    /// Flag bytes allowed on later pieces.
    pub all_flags: Vec<u8>,
    /// COMPOUNDRULE patterns; empty means any flag combination passes.
    pub rules: CompoundRules,
    /// CHECKCOMPOUNDPATTERN pairs: a join where the previous text ends with
    /// `.0` and the next starts with `.1` is rejected.
    pub check_patterns: Vec<(Vec<u8>, Vec<u8>)>,
    /// Language never uses spaces between words; splitting is pointless and
    /// compounding is the only way to validate a continuation.
    pub nobreak: bool,
    /// Split suggestions are penalized with the higher split score.
    pub no_split_sugs: bool,
    /// Compound suggestions are not wanted at all.
    pub no_compound_sugs: bool,
}

impl Default for CompoundInfo {
    fn default() -> Self {
        CompoundInfo {
            min_len: 0,
            syl_max: MAXWLEN,
            max_pieces: MAXWLEN,
            start_flags: Vec::new(),
            all_flags: Vec::new(),
            rules: CompoundRules::default(),
            check_patterns: Vec::new(),
            nobreak: false,
            no_split_sugs: false,
            no_compound_sugs: false,
        }
    }
}

impl CompoundInfo {
    /// True when the language defines any compounding at all.
    pub fn enabled(&self) -> bool {
        !self.start_flags.is_empty() || !self.all_flags.is_empty() || !self.rules.is_empty()
    }

    /// Can `flag` possibly extend the flag string `sofar` into a compound?
    ///
    /// `first` selects the start-flag set (no complete piece yet). When
    /// rules are defined and there already is at least one piece, the
    /// combined string must still be a viable rule prefix.
    pub fn can_be_compound(&self, first: bool, sofar: &[u8], flag: u8) -> bool {
        let set = if first {
            &self.start_flags
        } else {
            &self.all_flags
        };
        if !set.contains(&flag) {
            return false;
        }
        if !self.rules.is_empty() && !sofar.is_empty() {
            let mut combined = Vec::with_capacity(sofar.len() + 1);
            combined.extend_from_slice(sofar);
            combined.push(flag);
            return self.rules.matches_prefix(&combined);
        }
        true
    }

    /// Is the finished compound valid: the flag string matches a rule (when
    /// rules exist) and the word is within the length bound?
    pub fn can_compound(&self, word_chars: usize, flags: &[u8]) -> bool {
        if !self.rules.is_empty() && !self.rules.matches(flags) {
            return false;
        }
        self.syl_max >= MAXWLEN || word_chars <= self.syl_max
    }

    /// CHECKCOMPOUNDPATTERN veto for a join at byte offset `join` in `text`.
    pub fn check_pattern_veto(&self, text: &[u8], join: usize) -> bool {
        self.check_patterns.iter().any(|(end, start)| {
            text[..join].ends_with(end) && text[join..].starts_with(start)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_matching() {
        let rules = CompoundRules::parse(["ab", "a+c"]);
        assert!(rules.matches(b"ab"));
        assert!(rules.matches(b"ac"));
        assert!(rules.matches(b"aac"));
        assert!(!rules.matches(b"a"));
        assert!(!rules.matches(b"ba"));
        assert!(rules.matches_prefix(b"a"));
        assert!(rules.matches_prefix(b"aa"));
        assert!(!rules.matches_prefix(b"b"));
    }

    #[test]
    fn groups_and_modifiers() {
        let rules = CompoundRules::parse(["[xy]*z?w"]);
        assert!(rules.matches(b"w"));
        assert!(rules.matches(b"xw"));
        assert!(rules.matches(b"xyzw"));
        assert!(!rules.matches(b"zz"));
    }

    #[test]
    fn can_be_compound_uses_flag_sets() {
        let info = CompoundInfo {
            start_flags: vec![b'a'],
            all_flags: vec![b'b'],
            ..CompoundInfo::default()
        };
        assert!(info.can_be_compound(true, b"", b'a'));
        assert!(!info.can_be_compound(true, b"", b'b'));
        assert!(info.can_be_compound(false, b"a", b'b'));
        assert!(!info.can_be_compound(false, b"a", b'a'));
    }

    #[test]
    fn check_pattern_vetoes_join() {
        let info = CompoundInfo {
            check_patterns: vec![(b"o".to_vec(), b"b".to_vec())],
            ..CompoundInfo::default()
        };
        assert!(info.check_pattern_veto(b"foobar", 3));
        assert!(!info.check_pattern_veto(b"forbar", 3));
    }
}
