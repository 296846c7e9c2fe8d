//! External suggestion inputs: checker and expression hooks, `file:`
//! sources.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::case::{captype, make_case_word};
use crate::dictionary::flags::WordFlags;

/// Decides whether a piece of text is correctly spelled.
///
/// The engine uses this for the "maybe it only needs a capital" special
/// case and to drop suggestions that are themselves flagged wrong. When no
/// checker is installed a trie-backed check over the loaded dictionaries is
/// used instead.
pub trait WordChecker {
    /// Is `text` a valid spelling?
    fn is_valid(&self, text: &str) -> bool;
}

impl<F: Fn(&str) -> bool> WordChecker for F {
    fn is_valid(&self, text: &str) -> bool {
        self(text)
    }
}

/// Produces suggestions from a user expression (`expr:` option entries).
///
/// Implementations must not call back into the engine for the same request;
/// re-entrancy protection is the caller's concern.
pub trait ExprSuggestions {
    /// Evaluate `expr` for `badword`, returning `(suggestion, score)`
    /// pairs. Entries with scores outside the engine's current ceiling are
    /// dropped by the caller.
    fn suggest(&self, badword: &str, expr: &str) -> Vec<(String, i32)>;
}

/// Read suggestions for `badword` from a `file:` source.
///
/// Each non-blank line is `bad<TAB>good`; on a case-insensitive match of
/// `bad` the `good` word is returned, with the bad word's caps applied when
/// `good` carries no explicit case of its own. An unreadable file logs a
/// warning and contributes nothing.
pub(crate) fn file_suggestions(
    path: &Path,
    badword: &str,
    badflags: WordFlags,
) -> Vec<String> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            warn!(path = %path.display(), %err, "cannot open suggestion file");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        let Some((bad, good)) = line.split_once('\t') else {
            continue;
        };
        let good = good.trim_end_matches(['\r', '\n']);
        if good.is_empty() || !bad.eq_ignore_ascii_case(badword) {
            continue;
        }
        if captype(good).is_empty() {
            out.push(make_case_word(good, badflags));
        } else {
            out.push(good.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::flags::{WF_ONECAP, WordFlags};
    use std::io::Write;

    #[test]
    fn file_source_matches_case_insensitively() {
        let dir = std::env::temp_dir();
        let path = dir.join("spellsift_file_source_test.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "teh\tthe").unwrap();
        writeln!(f, "beer\tWine").unwrap();
        writeln!(f, "no separator line").unwrap();
        drop(f);

        let none = WordFlags::empty();
        assert_eq!(file_suggestions(&path, "teh", none), vec!["the"]);
        assert_eq!(file_suggestions(&path, "TEH", none), vec!["the"]);
        // Caps of the bad word are applied when "good" has no case.
        let onecap = WordFlags::new(WF_ONECAP);
        assert_eq!(file_suggestions(&path, "teh", onecap), vec!["The"]);
        // Explicit case in "good" is kept.
        assert_eq!(file_suggestions(&path, "beer", none), vec!["Wine"]);
        assert!(file_suggestions(&path, "missing", none).is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_yields_nothing() {
        let path = Path::new("/nonexistent/spellsift/sugfile");
        assert!(file_suggestions(path, "word", WordFlags::empty()).is_empty());
    }
}
