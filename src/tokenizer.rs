//! Greedy longest-match tokenizer.
//!
//! The input is scanned left to right once. At each position the trie is
//! walked as far as the input allows and the longest token seen on the way is
//! emitted; a byte that starts no token is emitted as a fallback id. Every
//! call is a read-only walk, so one `Tokenizer` can serve many threads.

use rayon::prelude::*;

use crate::error::{TokenizerError, VocabError};
use crate::fallback::{Fallback, FallbackTable};
use crate::trie::DATrie;
use crate::vocab::Vocabulary;
use crate::{TokenId, BYTES_PER_TOKEN_HINT};

/// One emitted token and the input bytes `start..end` it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub id: TokenId,
    pub start: usize,
    pub end: usize,
    /// `true` when no vocabulary token matched and the byte was emitted by the fallback policy.
    pub fallback: bool,
}

impl TokenSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: Vocabulary,
    trie: DATrie,
    fallback: FallbackTable,
}

impl Tokenizer {
    /// Build with the default fallback, [`Fallback::past_vocab`].
    pub fn new(vocab: Vocabulary) -> Result<Self, TokenizerError> {
        let fallback = Fallback::past_vocab(&vocab);
        Self::with_fallback(vocab, fallback)
    }

    pub fn with_fallback(vocab: Vocabulary, fallback: Fallback) -> Result<Self, TokenizerError> {
        if vocab.is_empty() {
            return Err(TokenizerError::EmptyVocabulary);
        }
        let fallback = FallbackTable::resolve(&vocab, fallback)?;
        if fallback.covered() == 0 {
            log::warn!(
                "vocabulary has no single-byte tokens; every unmatched byte uses {:?}",
                fallback.policy()
            );
        }
        let trie = DATrie::build(&vocab)?;
        log::debug!(
            "tokenizer ready: {} tokens, longest {} bytes, {} of 256 bytes in vocabulary",
            vocab.len(),
            vocab.max_token_len(),
            fallback.covered()
        );
        Ok(Self {
            vocab,
            trie,
            fallback,
        })
    }

    /// Ids are positions in `tokens`.
    pub fn from_str_vec<I, S>(tokens: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocab = Vocabulary::from_ordered_tokens(tokens.into_iter().map(StrBytes))?;
        Self::new(vocab)
    }

    pub fn from_str_dict<I, S>(pairs: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (S, TokenId)>,
        S: AsRef<str>,
    {
        let vocab =
            Vocabulary::from_mapping(pairs.into_iter().map(|(s, id)| (StrBytes(s), id)))?;
        Self::new(vocab)
    }

    pub fn from_byte_dict<I, B>(pairs: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (B, TokenId)>,
        B: AsRef<[u8]>,
    {
        Self::new(Vocabulary::from_mapping(pairs)?)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback.policy()
    }

    /// Upper bound on trie steps taken per emitted token.
    pub fn max_token_len(&self) -> usize {
        self.vocab.max_token_len()
    }

    /// Id emitted for `byte` when no longer token matches at its position.
    pub fn fallback_id(&self, byte: u8) -> TokenId {
        self.fallback.id_for(byte)
    }

    #[inline]
    fn next_span(&self, bytes: &[u8], pos: usize) -> TokenSpan {
        match self.trie.longest_match(&bytes[pos..]) {
            Some((len, id)) => TokenSpan {
                id,
                start: pos,
                end: pos + len,
                fallback: false,
            },
            None => TokenSpan {
                id: self.fallback.id_for(bytes[pos]),
                start: pos,
                end: pos + 1,
                fallback: true,
            },
        }
    }

    /// Lazily yield the spans covering `bytes`, in order.
    pub fn spans<'a>(&'a self, bytes: &'a [u8]) -> Spans<'a> {
        Spans {
            tokenizer: self,
            bytes,
            pos: 0,
        }
    }

    /// Tokenize text (or raw bytes) into ids.
    ///
    /// Never fails: malformed UTF-8 and bytes outside the vocabulary are
    /// handled by the fallback policy.
    pub fn tokenize<T: AsRef<[u8]> + ?Sized>(&self, text: &T) -> Vec<TokenId> {
        let bytes = text.as_ref();
        let mut tokens = Vec::with_capacity((bytes.len() as f64 / BYTES_PER_TOKEN_HINT) as usize);
        let mut pos = 0;
        while pos < bytes.len() {
            let span = self.next_span(bytes, pos);
            tokens.push(span.id);
            pos = span.end;
        }
        tokens
    }

    pub fn count_tokens<T: AsRef<[u8]> + ?Sized>(&self, text: &T) -> usize {
        let bytes = text.as_ref();
        let mut count = 0;
        let mut pos = 0;
        while pos < bytes.len() {
            pos = self.next_span(bytes, pos).end;
            count += 1;
        }
        count
    }

    /// Tokenize many texts in parallel.
    pub fn tokenize_batch<T: AsRef<[u8]> + Sync>(&self, texts: &[T]) -> Vec<Vec<TokenId>> {
        texts.par_iter().map(|t| self.tokenize(t)).collect()
    }

    /// Bytes of a single id: its vocabulary token, or the byte a fallback id stands for.
    pub fn token_bytes(&self, id: TokenId) -> Result<&[u8], TokenizerError> {
        if let Some(token) = self.vocab.get_token(id) {
            return Ok(token);
        }
        self.fallback
            .decode(id)
            .ok_or(TokenizerError::Vocab(VocabError::UnknownId(id)))
    }

    /// Concatenate the bytes of `ids`.
    ///
    /// With [`Fallback::ByteOffset`] this exactly inverts [`Tokenizer::tokenize`].
    pub fn decode_bytes(&self, ids: &[TokenId]) -> Result<Vec<u8>, TokenizerError> {
        let mut out = Vec::with_capacity(ids.len() * BYTES_PER_TOKEN_HINT as usize);
        for &id in ids {
            out.extend_from_slice(self.token_bytes(id)?);
        }
        Ok(out)
    }

    pub fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        Ok(String::from_utf8(self.decode_bytes(ids)?)?)
    }
}

/// Iterator returned by [`Tokenizer::spans`].
#[derive(Debug, Clone)]
pub struct Spans<'a> {
    tokenizer: &'a Tokenizer,
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for Spans<'_> {
    type Item = TokenSpan;

    #[inline]
    fn next(&mut self) -> Option<TokenSpan> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let span = self.tokenizer.next_span(self.bytes, self.pos);
        self.pos = span.end;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bytes.len() - self.pos;
        (remaining.div_ceil(self.tokenizer.max_token_len()), Some(remaining))
    }
}

impl std::iter::FusedIterator for Spans<'_> {}

/// `AsRef<[u8]>` view of anything that is `AsRef<str>`.
struct StrBytes<S>(S);

impl<S: AsRef<str>> AsRef<[u8]> for StrBytes<S> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref().as_bytes()
    }
}
