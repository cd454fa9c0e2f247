//! # btoken
//!
//! Greedy longest-match tokenizer over arbitrary byte vocabularies.
//!
//! A [`Vocabulary`] is validated once and compiled into a double-array trie.
//! [`Tokenizer::tokenize`] then scans the input bytes left to right, emitting at
//! each position the id of the longest vocabulary token that starts there, or
//! a [`Fallback`] id for a byte no token covers. The scan never fails and
//! never backtracks.
//!
//! ```
//! use btoken::Tokenizer;
//!
//! let tokenizer = Tokenizer::from_str_dict([("hello ", 1), ("world", 2), ("!", 4)]).unwrap();
//! assert_eq!(tokenizer.tokenize("hello world!"), vec![1, 2, 4]);
//! assert_eq!(tokenizer.decode(&[1, 2, 4]).unwrap(), "hello world!");
//! ```

pub mod byte_level;
pub mod error;
pub mod fallback;
pub mod load;
mod tokenizer;
mod trie;
pub mod vocab;

pub use error::{TokenizerError, VocabError};
pub use fallback::Fallback;
pub use tokenizer::{Spans, TokenSpan, Tokenizer};
pub use vocab::Vocabulary;

/// Token identifier as exposed to callers.
pub type TokenId = u64;

/// Constant guess for the expected bytes/token ratio.
pub const BYTES_PER_TOKEN_HINT: f64 = 4.0;
