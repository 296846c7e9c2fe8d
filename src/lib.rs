//! # spellsift
//!
//! Trie-based spelling suggestions: given a misspelled word and one or
//! more loaded dictionaries, produce a ranked list of corrections.
//!
//! The engine combines three searches over packed byte tries:
//!
//! - An **error-tolerant trie walk** driven by a state machine of edit
//!   operators (substitute, delete, insert, swap, rotate, replacement
//!   table rules), interleaved with word splitting, compounding and
//!   postponed-prefix handling.
//! - A **sound-alike search** running the same walk over a sound-folded
//!   trie, expanding each phonetic match back to the original words.
//! - **Bounded edit-distance scoring** with case, similar-character and
//!   transposition discounts to rank everything found.
//!
//! ## Example
//!
//! ```rust
//! use spellsift::prelude::*;
//!
//! let dict = LangDict::builder()
//!     .words(["hello", "help", "world"])
//!     .build();
//! let langs = [dict];
//!
//! let suggestor = Suggestor::new(&langs);
//! for s in suggestor.suggest("helo") {
//!     println!("{} ({})", s.word, s.score);
//! }
//! ```
//!
//! Dictionary files are out of scope: a [`dictionary::LangBuilder`]
//! constructs the packed tries, replacement tables, compound rules and
//! sound-folding data from in-memory word lists.
//!
//! The engine owns no background tasks and keeps no state between
//! requests; a wall-clock deadline (`timeout:` option) and an optional
//! interrupt flag are checked cooperatively during the walk, returning
//! partial results.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod case;
pub mod dictionary;
pub mod distance;
pub mod phonetic;
pub mod score;
pub mod suggest;

/// Common imports for convenient usage.
pub mod prelude {
    pub use crate::dictionary::compound::{CompoundInfo, CompoundRules};
    pub use crate::dictionary::{LangBuilder, LangDict, WordEntry};
    pub use crate::phonetic::SoundRules;
    pub use crate::suggest::{
        ExprSuggestions, Method, OptionParseError, SuggestOptions, Suggestion, Suggestor,
        WordChecker,
    };
}
