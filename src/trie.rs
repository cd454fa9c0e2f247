//! Double-array trie over vocabulary tokens.
//!
//! O(1) per byte: transition t = base[s] + byte, valid if (check[t] & MASK) == s.
//! Terminal flag packed into bit 31 of check; the token id of a terminal
//! state lives in `values[t]`.

use std::collections::VecDeque;

use crate::error::TokenizerError;
use crate::vocab::Vocabulary;
use crate::TokenId;

const TERM_BIT: u32 = 0x8000_0000;
const IDX_MASK: u32 = 0x7FFF_FFFF;
const EMPTY: u32 = u32::MAX;
const ROOT: u32 = 0;

#[derive(Debug, Clone)]
pub(crate) struct DATrie {
    base: Vec<u32>,
    check: Vec<u32>,
    values: Vec<TokenId>,
}

/// Pointer-style trie used only while placing states into the arrays.
struct Nodes {
    children: Vec<Vec<(u8, u32)>>,
    value: Vec<Option<TokenId>>,
}

impl Nodes {
    fn from_vocab(vocab: &Vocabulary) -> Result<Self, TokenizerError> {
        let mut nodes = Nodes {
            children: vec![vec![]],
            value: vec![None],
        };
        for (token, id) in vocab.iter() {
            let mut cur: u32 = ROOT;
            for &byte in token {
                let existing = nodes.children[cur as usize]
                    .iter()
                    .find(|(k, _)| *k == byte);
                cur = if let Some(&(_, idx)) = existing {
                    idx
                } else {
                    let idx = nodes.children.len();
                    if idx > IDX_MASK as usize {
                        return Err(TokenizerError::TrieTooLarge { states: idx + 1 });
                    }
                    let idx = idx as u32;
                    nodes.children.push(vec![]);
                    nodes.value.push(None);
                    nodes.children[cur as usize].push((byte, idx));
                    idx
                };
            }
            nodes.value[cur as usize] = Some(id);
        }

        for children in &mut nodes.children {
            children.sort_by_key(|(k, _)| *k);
        }
        Ok(nodes)
    }
}

impl DATrie {
    pub(crate) fn build(vocab: &Vocabulary) -> Result<Self, TokenizerError> {
        let nodes = Nodes::from_vocab(vocab)?;

        let num_nodes = nodes.children.len();
        let initial_size = num_nodes + 512;
        let mut base = vec![0u32; initial_size];
        let mut check = vec![EMPTY; initial_size];
        let mut values: Vec<TokenId> = vec![0; initial_size];
        let mut occupied = vec![false; initial_size];
        let mut first_free = 0usize;

        let mut da_pos = vec![0u32; num_nodes];
        da_pos[0] = ROOT;
        occupied[ROOT as usize] = true;

        let mut queue = VecDeque::new();
        queue.push_back(0usize);

        while let Some(trie_node) = queue.pop_front() {
            let s = da_pos[trie_node] as usize;
            let ch = &nodes.children[trie_node];

            if ch.is_empty() {
                continue;
            }

            while first_free < occupied.len() && occupied[first_free] {
                first_free += 1;
            }
            let b = find_base(ch, &occupied, first_free);

            let max_pos = b + 256;
            if max_pos > IDX_MASK as usize {
                return Err(TokenizerError::TrieTooLarge { states: max_pos });
            }
            if max_pos >= base.len() {
                let new_size = max_pos + 512;
                base.resize(new_size, 0);
                check.resize(new_size, EMPTY);
                values.resize(new_size, 0);
                occupied.resize(new_size, false);
            }

            base[s] = b as u32;

            for &(key, child) in ch {
                let t = b + key as usize;
                let child = child as usize;
                let term = match nodes.value[child] {
                    Some(id) => {
                        values[t] = id;
                        TERM_BIT
                    }
                    None => 0,
                };
                check[t] = s as u32 | term;
                occupied[t] = true;
                da_pos[child] = t as u32;
                queue.push_back(child);
            }
        }

        let actual_size = occupied
            .iter()
            .rposition(|&o| o)
            .map_or(1, |i| i + 1);
        base.truncate(actual_size);
        check.truncate(actual_size);
        values.truncate(actual_size);

        log::debug!(
            "built double-array trie: {} nodes in {} slots",
            num_nodes,
            actual_size
        );

        Ok(DATrie {
            base,
            check,
            values,
        })
    }

    #[inline(always)]
    fn transition(&self, s: u32, byte: u8) -> Option<(u32, bool)> {
        let t = self.base[s as usize] as usize + byte as usize;
        let c = *self.check.get(t)?;
        if c == EMPTY || (c & IDX_MASK) != s {
            return None;
        }
        Some((t as u32, c & TERM_BIT != 0))
    }

    /// Longest token that is a prefix of `bytes`, as `(byte_len, id)`.
    #[inline]
    pub(crate) fn longest_match(&self, bytes: &[u8]) -> Option<(usize, TokenId)> {
        self.walk(bytes).0
    }

    /// Longest match plus the number of transitions taken, at most `max_token_len`.
    #[inline(always)]
    fn walk(&self, bytes: &[u8]) -> (Option<(usize, TokenId)>, usize) {
        let mut cur = ROOT;
        let mut best = None;
        let mut steps = 0;
        for &b in bytes {
            match self.transition(cur, b) {
                Some((next, is_term)) => {
                    cur = next;
                    steps += 1;
                    if is_term {
                        best = Some((steps, self.values[next as usize]));
                    }
                }
                None => break,
            }
        }
        (best, steps)
    }
}

/// Smallest base at or after the first free slot where every child key lands
/// on an unoccupied slot.
fn find_base(children: &[(u8, u32)], occupied: &[bool], first_free: usize) -> usize {
    let len = occupied.len();
    let first_key = children[0].0 as usize;
    let mut b = first_free.saturating_sub(first_key);
    'outer: loop {
        for &(k, _) in children {
            let pos = b + k as usize;
            if pos < len && occupied[pos] {
                b += 1;
                continue 'outer;
            }
        }
        return b;
    }
}
