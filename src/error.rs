use thiserror::Error;

use crate::TokenId;

/// Errors raised while building or querying a [`Vocabulary`](crate::Vocabulary).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabError {
    #[error("duplicate token \"{}\" at ids {first} and {second}", .token.escape_ascii())]
    DuplicateToken {
        token: Vec<u8>,
        first: TokenId,
        second: TokenId,
    },
    #[error(
        "duplicate id {id} for tokens \"{}\" and \"{}\"",
        .first.escape_ascii(),
        .second.escape_ascii()
    )]
    DuplicateId {
        id: TokenId,
        first: Vec<u8>,
        second: Vec<u8>,
    },
    #[error("empty token at id {id}")]
    EmptyToken { id: TokenId },
    #[error("unknown token id {0}")]
    UnknownId(TokenId),
    #[error("unknown token \"{}\"", .0.escape_ascii())]
    UnknownToken(Vec<u8>),
}

/// Errors raised while building a [`Tokenizer`](crate::Tokenizer) or decoding its output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    #[error("cannot build a tokenizer from an empty vocabulary")]
    EmptyVocabulary,
    #[error(transparent)]
    Vocab(#[from] VocabError),
    #[error("fallback id {id} for byte 0x{byte:02x} is already a vocabulary id")]
    FallbackCollision { byte: u8, id: TokenId },
    #[error("fallback id for byte 0x{byte:02x} overflows the id space")]
    FallbackOverflow { byte: u8 },
    #[error("vocabulary needs {states} trie states, more than the matcher can address")]
    TrieTooLarge { states: usize },
    #[error("decoded bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
