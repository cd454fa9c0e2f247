//! Token vocabulary: a validated bijection between byte strings and ids.
//!
//! A [`Vocabulary`] is built once, either positionally from an ordered list of
//! tokens or from an explicit `token -> id` mapping, and is immutable after
//! that. Both constructors normalize into the same representation.
//!
//! Token bytes are stored once, in insertion order. Lookups by id go through a
//! hash map of slots; lookups by bytes binary-search a slot index sorted by
//! token bytes.

use rustc_hash::FxHashMap;

use crate::error::VocabError;
use crate::TokenId;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tokens: Vec<Box<[u8]>>,
    /// `ids[slot]` is the id of `tokens[slot]`.
    ids: Vec<TokenId>,
    by_id: FxHashMap<TokenId, usize>,
    /// Slots ordered by token bytes, then by slot.
    by_bytes: Vec<usize>,
    max_id: Option<TokenId>,
    max_token_len: usize,
}

impl Vocabulary {
    /// Build from an ordered token list; each token's id is its position.
    ///
    /// Fails on a zero-length token or on two byte-identical tokens.
    pub fn from_ordered_tokens<I, T>(tokens: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let tokens = tokens.into_iter();
        let mut vocab = Self::with_capacity(tokens.size_hint().0);
        for (id, token) in tokens.enumerate() {
            vocab.push(token.as_ref(), id as TokenId)?;
        }
        vocab.finish()
    }

    /// Build from `(token, id)` pairs. Ids need not be contiguous.
    ///
    /// Fails on a zero-length token, on a token listed twice, or on two tokens
    /// sharing one id.
    pub fn from_mapping<I, T>(pairs: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = (T, TokenId)>,
        T: AsRef<[u8]>,
    {
        let pairs = pairs.into_iter();
        let mut vocab = Self::with_capacity(pairs.size_hint().0);
        for (token, id) in pairs {
            vocab.push(token.as_ref(), id)?;
        }
        vocab.finish()
    }

    fn with_capacity(capacity: usize) -> Self {
        let mut by_id = FxHashMap::default();
        by_id.reserve(capacity);
        Self {
            tokens: Vec::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
            by_id,
            by_bytes: Vec::new(),
            max_id: None,
            max_token_len: 0,
        }
    }

    /// Append one entry. Repeated tokens are only detected by [`Self::finish`].
    fn push(&mut self, token: &[u8], id: TokenId) -> Result<(), VocabError> {
        let err = if token.is_empty() {
            Some(VocabError::EmptyToken { id })
        } else {
            self.by_id.get(&id).map(|&slot| VocabError::DuplicateId {
                id,
                first: self.tokens[slot].to_vec(),
                second: token.to_vec(),
            })
        };
        if let Some(err) = err {
            // A token repeated earlier in the input is the first failure.
            self.index_tokens();
            return Err(self.first_duplicate_token().unwrap_or(err));
        }

        self.by_id.insert(id, self.tokens.len());
        self.tokens.push(token.into());
        self.ids.push(id);
        self.max_id = Some(self.max_id.map_or(id, |m| m.max(id)));
        self.max_token_len = self.max_token_len.max(token.len());
        Ok(())
    }

    fn finish(mut self) -> Result<Self, VocabError> {
        self.index_tokens();
        match self.first_duplicate_token() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn index_tokens(&mut self) {
        let tokens = &self.tokens;
        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_unstable_by(|&a, &b| tokens[a].cmp(&tokens[b]).then(a.cmp(&b)));
        self.by_bytes = order;
    }

    /// The repeated token whose second occurrence comes earliest in the input.
    fn first_duplicate_token(&self) -> Option<VocabError> {
        self.by_bytes
            .windows(2)
            .filter(|w| self.tokens[w[0]] == self.tokens[w[1]])
            .min_by_key(|w| w[1])
            .map(|w| VocabError::DuplicateToken {
                token: self.tokens[w[0]].to_vec(),
                first: self.ids[w[0]],
                second: self.ids[w[1]],
            })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Largest id in the vocabulary, `None` when empty.
    pub fn max_id(&self) -> Option<TokenId> {
        self.max_id
    }

    /// Byte length of the longest token; bounds the depth of any trie walk.
    pub fn max_token_len(&self) -> usize {
        self.max_token_len
    }

    pub fn token_for(&self, id: TokenId) -> Result<&[u8], VocabError> {
        self.get_token(id).ok_or(VocabError::UnknownId(id))
    }

    pub fn id_for(&self, token: &[u8]) -> Result<TokenId, VocabError> {
        self.get_id(token)
            .ok_or_else(|| VocabError::UnknownToken(token.to_vec()))
    }

    pub fn get_token(&self, id: TokenId) -> Option<&[u8]> {
        self.by_id.get(&id).map(|&slot| &self.tokens[slot][..])
    }

    pub fn get_id(&self, token: &[u8]) -> Option<TokenId> {
        let i = self
            .by_bytes
            .binary_search_by(|&slot| self.tokens[slot][..].cmp(token))
            .ok()?;
        Some(self.ids[self.by_bytes[i]])
    }

    pub fn contains_id(&self, id: TokenId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Id of the literal single-byte token `[byte]`, if present.
    pub fn byte_id(&self, byte: u8) -> Option<TokenId> {
        self.get_id(&[byte])
    }

    /// Iterate `(token, id)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], TokenId)> + '_ {
        self.tokens
            .iter()
            .zip(&self.ids)
            .map(|(t, &id)| (&t[..], id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_ids_are_positional() {
        let vocab = Vocabulary::from_ordered_tokens(["a", "bc", "def"]).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id_for(b"a"), Ok(0));
        assert_eq!(vocab.id_for(b"bc"), Ok(1));
        assert_eq!(vocab.id_for(b"def"), Ok(2));
        assert_eq!(vocab.token_for(2), Ok(&b"def"[..]));
        assert_eq!(vocab.max_id(), Some(2));
        assert_eq!(vocab.max_token_len(), 3);
    }

    #[test]
    fn test_ordered_duplicate_token() {
        let err = Vocabulary::from_ordered_tokens(["a", "b", "a"]).unwrap_err();
        assert_eq!(
            err,
            VocabError::DuplicateToken {
                token: b"a".to_vec(),
                first: 0,
                second: 2,
            }
        );
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = Vocabulary::from_ordered_tokens(["a", ""]).unwrap_err();
        assert_eq!(err, VocabError::EmptyToken { id: 1 });

        let err = Vocabulary::from_mapping([("", 7)]).unwrap_err();
        assert_eq!(err, VocabError::EmptyToken { id: 7 });
    }

    #[test]
    fn test_mapping_sparse_ids() {
        let vocab = Vocabulary::from_mapping([("x", 10), ("yy", 1023)]).unwrap();
        assert_eq!(vocab.max_id(), Some(1023));
        assert_eq!(vocab.token_for(10), Ok(&b"x"[..]));
        assert_eq!(vocab.token_for(11), Err(VocabError::UnknownId(11)));
        assert!(vocab.contains_id(1023));
        assert!(!vocab.contains_id(0));
    }

    #[test]
    fn test_mapping_duplicate_id() {
        let err = Vocabulary::from_mapping([("x", 0), ("y", 0)]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateId { id: 0, .. }));
    }

    #[test]
    fn test_mapping_duplicate_token() {
        let err = Vocabulary::from_mapping([("x", 0), ("x", 1)]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateToken { first: 0, second: 1, .. }));
    }

    /// Errors are reported for the earliest offending entry, whatever its kind.
    #[test]
    fn test_first_error_in_input_order() {
        let err = Vocabulary::from_mapping([("x", 0), ("x", 1), ("y", 1)]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateToken { first: 0, second: 1, .. }));

        let err = Vocabulary::from_mapping([("x", 0), ("y", 0), ("y", 2)]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateId { id: 0, .. }));

        let err = Vocabulary::from_ordered_tokens(["b", "a", "b", "a", ""]).unwrap_err();
        assert!(matches!(err, VocabError::DuplicateToken { first: 0, second: 2, .. }));
    }

    #[test]
    fn test_lookup_both_directions() {
        let tokens: Vec<String> = (0..500).rev().map(|i| format!("t{i}")).collect();
        let vocab = Vocabulary::from_ordered_tokens(&tokens).unwrap();
        for (id, token) in tokens.iter().enumerate() {
            assert_eq!(vocab.id_for(token.as_bytes()), Ok(id as TokenId));
            assert_eq!(vocab.token_for(id as TokenId), Ok(token.as_bytes()));
        }
        assert_eq!(vocab.get_id(b"t"), None);
        assert_eq!(vocab.get_id(b"t5000"), None);

        let pairs: Vec<(&[u8], TokenId)> = vocab.iter().take(2).collect();
        assert_eq!(pairs, vec![(&b"t499"[..], 0), (&b"t498"[..], 1)]);
    }

    #[test]
    fn test_empty_vocabulary_is_valid() {
        let vocab = Vocabulary::from_ordered_tokens(Vec::<&str>::new()).unwrap();
        assert!(vocab.is_empty());
        assert_eq!(vocab.max_id(), None);
    }

    #[test]
    fn test_unknown_token() {
        let vocab = Vocabulary::from_ordered_tokens(["a"]).unwrap();
        assert_eq!(
            vocab.id_for(b"zz"),
            Err(VocabError::UnknownToken(b"zz".to_vec()))
        );
        assert_eq!(vocab.byte_id(b'a'), Some(0));
        assert_eq!(vocab.byte_id(b'b'), None);
    }

    #[test]
    fn test_error_messages_escape_bytes() {
        let err = VocabError::UnknownToken(vec![0xff, b'a']);
        assert_eq!(err.to_string(), "unknown token \"\\xffa\"");
    }
}
