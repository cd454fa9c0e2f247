//! Vocabulary loaders for common on-disk formats.
//!
//! - JSON array of strings: ids are positions.
//! - JSON object `{"token": id}`: ids as given.
//! - Byte-level JSON object: keys use the GPT-2 byte alphabet (see [`crate::byte_level`]).
//! - tiktoken: one `base64(token) id` pair per line.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::byte_level;
use crate::error::VocabError;
use crate::vocab::Vocabulary;
use crate::TokenId;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 encoding on line {line}: {source}")]
    Base64 {
        line: usize,
        source: base64::DecodeError,
    },
    /// A malformed tiktoken line; `line` is 1-based.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    /// A malformed JSON entry; `index` is 0-based, in array order or object key order.
    #[error("entry {index}: {reason}")]
    Entry { index: usize, reason: String },
    #[error("expected a JSON array of strings or an object of token ids")]
    UnsupportedJson,
    #[error(transparent)]
    Vocab(#[from] VocabError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabFormat {
    Json,
    ByteLevelJson,
    Tiktoken,
}

impl VocabFormat {
    /// `.tiktoken` files are tiktoken; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tiktoken") => VocabFormat::Tiktoken,
            _ => VocabFormat::Json,
        }
    }
}

impl FromStr for VocabFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(VocabFormat::Json),
            "byte-level-json" => Ok(VocabFormat::ByteLevelJson),
            "tiktoken" => Ok(VocabFormat::Tiktoken),
            other => Err(format!(
                "unknown vocabulary format '{other}' (expected json, byte-level-json or tiktoken)"
            )),
        }
    }
}

impl fmt::Display for VocabFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VocabFormat::Json => "json",
            VocabFormat::ByteLevelJson => "byte-level-json",
            VocabFormat::Tiktoken => "tiktoken",
        })
    }
}

pub fn load_vocab_file(path: &Path, format: VocabFormat) -> Result<Vocabulary, LoadError> {
    let data = fs::read(path)?;
    let vocab = match format {
        VocabFormat::Json => vocab_from_json(&data, false)?,
        VocabFormat::ByteLevelJson => vocab_from_json(&data, true)?,
        VocabFormat::Tiktoken => vocab_from_tiktoken(&data)?,
    };
    log::info!(
        "loaded {} tokens from {} ({})",
        vocab.len(),
        path.display(),
        format
    );
    Ok(vocab)
}

/// Parse a JSON array of token strings or a JSON object of `token -> id`.
///
/// With `byte_level_keys`, tokens are GPT-2 byte-level strings and are decoded
/// to raw bytes before insertion.
pub fn vocab_from_json(data: &[u8], byte_level_keys: bool) -> Result<Vocabulary, LoadError> {
    let root: serde_json::Value = serde_json::from_slice(data)?;
    let inverse = byte_level_keys.then(byte_level::char_to_byte_table);

    let token_bytes = |index: usize, s: &str| -> Result<Vec<u8>, LoadError> {
        match &inverse {
            Some(inverse) => {
                byte_level::decode_chars(s, inverse).ok_or_else(|| LoadError::Entry {
                    index,
                    reason: format!("token {s:?} is not in the byte-level alphabet"),
                })
            }
            None => Ok(s.as_bytes().to_vec()),
        }
    };

    match root {
        serde_json::Value::Array(items) => {
            let mut tokens = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let s = item.as_str().ok_or_else(|| LoadError::Entry {
                    index: i,
                    reason: format!("expected a string, got {item}"),
                })?;
                tokens.push(token_bytes(i, s)?);
            }
            Ok(Vocabulary::from_ordered_tokens(tokens)?)
        }
        serde_json::Value::Object(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (i, (key, value)) in map.iter().enumerate() {
                let id = value.as_u64().ok_or_else(|| LoadError::Entry {
                    index: i,
                    reason: format!("id for {key:?} is not a non-negative integer: {value}"),
                })?;
                pairs.push((token_bytes(i, key)?, id));
            }
            Ok(Vocabulary::from_mapping(pairs)?)
        }
        _ => Err(LoadError::UnsupportedJson),
    }
}

/// Parse tiktoken lines: `base64_token id`. Blank lines are skipped.
pub fn vocab_from_tiktoken(data: &[u8]) -> Result<Vocabulary, LoadError> {
    let mut pairs: Vec<(Vec<u8>, TokenId)> = Vec::new();

    for (i, line) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = i + 1;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| LoadError::Parse {
                line: line_no,
                reason: "missing space separator".to_string(),
            })?;

        let token = STANDARD
            .decode(&line[..space_pos])
            .map_err(|source| LoadError::Base64 {
                line: line_no,
                source,
            })?;

        let id_str = &line[space_pos + 1..];
        let id = std::str::from_utf8(id_str)
            .ok()
            .and_then(|s| s.parse::<TokenId>().ok())
            .ok_or_else(|| LoadError::Parse {
                line: line_no,
                reason: format!("invalid id: {}", id_str.escape_ascii()),
            })?;

        pairs.push((token, id));
    }

    Ok(Vocabulary::from_mapping(pairs)?)
}
