/// GPT-2 byte-level encoding: maps each byte 0x00..0xFF to a unique Unicode
/// character so that vocabularies can be stored as displayable strings.
///
/// Printable ASCII + Latin-1 supplement map to themselves; control characters
/// and the few gaps (0x00-0x20, 0x7F-0xA0, 0xAD) map to U+0100..U+0143.
pub fn byte_to_char_table() -> [char; 256] {
    let mut table = ['\0'; 256];
    let mut n: u32 = 0;
    for b in 0u16..256 {
        let ch = match b as u8 {
            // Ranges that map to themselves
            0x21..=0x7E | 0xA1..=0xAC | 0xAE..=0xFF => b as u32,
            // Everything else maps to 0x100 + n
            _ => {
                let c = 0x100 + n;
                n += 1;
                c
            }
        };
        // Every value is either < 0x100 or in 0x100..0x144, all valid scalars.
        table[b as usize] = char::from_u32(ch).unwrap_or('\0');
    }
    table
}

/// Inverse of [`byte_to_char_table`], indexed by code point (all lie below U+0144).
pub fn char_to_byte_table() -> [Option<u8>; 0x144] {
    let mut inverse = [None; 0x144];
    for (b, &c) in byte_to_char_table().iter().enumerate() {
        inverse[c as usize] = Some(b as u8);
    }
    inverse
}

/// Encode raw bytes into the GPT-2 unicode representation.
pub fn encode_bytes(input: &[u8], table: &[char; 256]) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input {
        out.push(table[b as usize]);
    }
    out
}

/// Decode a GPT-2 unicode string back to raw bytes; `None` on a character
/// outside the byte alphabet.
pub fn decode_chars(input: &str, inverse: &[Option<u8>; 0x144]) -> Option<Vec<u8>> {
    input
        .chars()
        .map(|c| inverse.get(c as usize).copied().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_a_bijection() {
        let table = byte_to_char_table();
        let inverse = char_to_byte_table();
        for b in 0..=255u8 {
            assert_eq!(inverse[table[b as usize] as usize], Some(b));
        }
        assert_eq!(inverse.iter().filter(|e| e.is_some()).count(), 256);
    }

    #[test]
    fn test_known_mappings() {
        let table = byte_to_char_table();
        assert_eq!(table[b'a' as usize], 'a');
        assert_eq!(table[b' ' as usize], '\u{120}');
        assert_eq!(table[b'\n' as usize], '\u{10A}');
    }

    #[test]
    fn test_roundtrip_and_rejects_foreign_chars() {
        let table = byte_to_char_table();
        let inverse = char_to_byte_table();
        let raw = b"Hello world\n\xff\x00";
        let encoded = encode_bytes(raw, &table);
        assert_eq!(encoded.chars().next(), Some('H'));
        assert_eq!(decode_chars(&encoded, &inverse), Some(raw.to_vec()));
        assert_eq!(decode_chars("\u{4e16}", &inverse), None);
    }
}
