//! What to emit for a byte that starts no vocabulary token.

use crate::error::TokenizerError;
use crate::vocab::Vocabulary;
use crate::TokenId;

/// Bytes decoded from a [`Fallback::Single`] id, which cannot say which byte it stood for.
pub const REPLACEMENT: &[u8] = "\u{FFFD}".as_bytes();

/// Policy for bytes that no vocabulary token matches.
///
/// A byte with a literal single-byte vocabulary entry always uses that entry;
/// the policy only covers the bytes the vocabulary leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Unmatched byte `b` is emitted as `base + b`; decodes back to `b`.
    ByteOffset(TokenId),
    /// Every unmatched byte is emitted as the same id; decodes to U+FFFD.
    Single(TokenId),
}

impl Fallback {
    /// 256 reserved ids starting just past the largest vocabulary id.
    ///
    /// When that range would pass `TokenId::MAX`, the lowest run of 256 ids
    /// holding no vocabulary id is used instead.
    pub fn past_vocab(vocab: &Vocabulary) -> Self {
        match vocab.max_id() {
            None => Fallback::ByteOffset(0),
            Some(max) if max.checked_add(256).is_some() => Fallback::ByteOffset(max + 1),
            Some(_) => Fallback::ByteOffset(lowest_free_base(vocab)),
        }
    }
}

/// Lowest `base` with no vocabulary id in `base..=base + 255`.
///
/// If no such run exists the returned range overlaps the vocabulary, and
/// [`FallbackTable::resolve`] rejects it only for bytes that need a fallback id.
fn lowest_free_base(vocab: &Vocabulary) -> TokenId {
    let mut ids: Vec<TokenId> = vocab.iter().map(|(_, id)| id).collect();
    ids.sort_unstable();
    let mut base: TokenId = 0;
    for id in ids {
        if id - base >= 256 {
            break;
        }
        match id.checked_add(1) {
            Some(next) => base = next,
            None => break,
        }
    }
    base
}

/// A [`Fallback`] resolved against one vocabulary: the id emitted for every byte.
#[derive(Debug, Clone)]
pub(crate) struct FallbackTable {
    policy: Fallback,
    ids: [TokenId; 256],
    covered: usize,
}

impl FallbackTable {
    pub(crate) fn resolve(vocab: &Vocabulary, policy: Fallback) -> Result<Self, TokenizerError> {
        let mut ids = [0; 256];
        let mut covered = 0;
        for byte in 0..=255u8 {
            let id = match vocab.byte_id(byte) {
                Some(id) => {
                    covered += 1;
                    id
                }
                None => {
                    let id = match policy {
                        Fallback::ByteOffset(base) => base
                            .checked_add(byte as TokenId)
                            .ok_or(TokenizerError::FallbackOverflow { byte })?,
                        Fallback::Single(id) => id,
                    };
                    if vocab.contains_id(id) {
                        return Err(TokenizerError::FallbackCollision { byte, id });
                    }
                    id
                }
            };
            ids[byte as usize] = id;
        }
        Ok(Self {
            policy,
            ids,
            covered,
        })
    }

    pub(crate) fn policy(&self) -> Fallback {
        self.policy
    }

    #[inline(always)]
    pub(crate) fn id_for(&self, byte: u8) -> TokenId {
        self.ids[byte as usize]
    }

    /// Number of bytes with a literal single-byte vocabulary entry.
    pub(crate) fn covered(&self) -> usize {
        self.covered
    }

    /// Bytes for a fallback id this table can emit; `None` for any other id.
    pub(crate) fn decode(&self, id: TokenId) -> Option<&'static [u8]> {
        match self.policy {
            Fallback::ByteOffset(base) => {
                let byte = u8::try_from(id.checked_sub(base)?).ok()?;
                (self.ids[byte as usize] == id).then(|| byte_slice(byte))
            }
            Fallback::Single(single) => (single == id && self.covered < 256).then_some(REPLACEMENT),
        }
    }
}

/// Static one-byte slice for `byte`.
fn byte_slice(byte: u8) -> &'static [u8] {
    static BYTES: [u8; 256] = {
        let mut table = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            table[i] = i as u8;
            i += 1;
        }
        table
    };
    let i = byte as usize;
    &BYTES[i..i + 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_past_vocab_base() {
        let vocab = Vocabulary::from_mapping([("a", 4), ("b", 9)]).unwrap();
        assert_eq!(Fallback::past_vocab(&vocab), Fallback::ByteOffset(10));

        let vocab = Vocabulary::from_mapping([("a", TokenId::MAX - 256)]).unwrap();
        assert_eq!(
            Fallback::past_vocab(&vocab),
            Fallback::ByteOffset(TokenId::MAX - 255)
        );
    }

    /// Ids near `TokenId::MAX` push the range into the lowest free gap.
    #[test]
    fn test_past_vocab_wraps_to_free_gap() {
        let vocab = Vocabulary::from_mapping([("a", TokenId::MAX)]).unwrap();
        assert_eq!(Fallback::past_vocab(&vocab), Fallback::ByteOffset(0));

        let vocab =
            Vocabulary::from_mapping([("a", 0), ("b", 100), ("c", 300), ("d", TokenId::MAX)])
                .unwrap();
        assert_eq!(Fallback::past_vocab(&vocab), Fallback::ByteOffset(301));
        assert!(FallbackTable::resolve(&vocab, Fallback::past_vocab(&vocab)).is_ok());
    }

    #[test]
    fn test_byte_entries_take_precedence() {
        let vocab = Vocabulary::from_mapping([("a", 4), ("bc", 9)]).unwrap();
        let table = FallbackTable::resolve(&vocab, Fallback::ByteOffset(100)).unwrap();
        assert_eq!(table.id_for(b'a'), 4);
        assert_eq!(table.id_for(b'b'), 100 + b'b' as TokenId);
        assert_eq!(table.covered(), 1);
    }

    #[test]
    fn test_byte_offset_decode() {
        let vocab = Vocabulary::from_mapping([("a", 0)]).unwrap();
        let table = FallbackTable::resolve(&vocab, Fallback::ByteOffset(1)).unwrap();
        assert_eq!(table.decode(1 + 0xff), Some(&[0xffu8][..]));
        assert_eq!(table.decode(1 + 0x10), Some(&[0x10u8][..]));
        // 'a' is a vocabulary byte, so its offset slot is never emitted.
        assert_eq!(table.decode(1 + b'a' as TokenId), None);
        assert_eq!(table.decode(0), None);
        assert_eq!(table.decode(1 + 256), None);
    }

    #[test]
    fn test_single_decode() {
        let vocab = Vocabulary::from_mapping([("a", 0)]).unwrap();
        let table = FallbackTable::resolve(&vocab, Fallback::Single(7)).unwrap();
        assert_eq!(table.id_for(b'z'), 7);
        assert_eq!(table.decode(7), Some(REPLACEMENT));
        assert_eq!(table.decode(8), None);
    }

    #[test]
    fn test_collision() {
        let vocab = Vocabulary::from_mapping([("a", 0), ("b", 1)]).unwrap();
        let err = FallbackTable::resolve(&vocab, Fallback::Single(1)).unwrap_err();
        assert_eq!(err, TokenizerError::FallbackCollision { byte: 0, id: 1 });

        let err = FallbackTable::resolve(&vocab, Fallback::ByteOffset(0)).unwrap_err();
        assert_eq!(err, TokenizerError::FallbackCollision { byte: 0, id: 0 });
    }

    #[test]
    fn test_overflow() {
        let vocab = Vocabulary::from_mapping([("a", 0)]).unwrap();
        let err = FallbackTable::resolve(&vocab, Fallback::ByteOffset(TokenId::MAX)).unwrap_err();
        assert_eq!(err, TokenizerError::FallbackOverflow { byte: 1 });
    }

    #[test]
    fn test_full_byte_coverage_never_collides() {
        let tokens: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
        let vocab = Vocabulary::from_ordered_tokens(&tokens).unwrap();
        let table = FallbackTable::resolve(&vocab, Fallback::Single(3)).unwrap();
        assert_eq!(table.covered(), 256);
        assert_eq!(table.decode(3), None);
    }
}
