//! Walking UTF-8 bytes in UTF-16 units.
//!
//! The engine may hold bytes that are not valid UTF-8. Every byte that does
//! not start a complete, well-formed sequence is counted as one character of
//! one unit, so the walk is total and both directions agree on where the
//! character boundaries are.

/// Byte length and UTF-16 width of the character starting at `bytes[0]`.
#[inline]
#[must_use]
pub fn char_at(bytes: &[u8]) -> (usize, usize) {
    let Some(&lead) = bytes.first() else {
        return (0, 0);
    };
    // The second byte's range depends on the lead: it rules out overlong
    // forms, UTF-16 surrogates and anything above U+10FFFF.
    let (len, units, second): (usize, usize, std::ops::RangeInclusive<u8>) = match lead {
        0x00..=0x7F => return (1, 1),
        0xC2..=0xDF => (2, 1, 0x80..=0xBF),
        0xE0 => (3, 1, 0xA0..=0xBF),
        0xED => (3, 1, 0x80..=0x9F),
        0xE1..=0xEC | 0xEE..=0xEF => (3, 1, 0x80..=0xBF),
        0xF0 => (4, 2, 0x90..=0xBF),
        0xF1..=0xF3 => (4, 2, 0x80..=0xBF),
        0xF4 => (4, 2, 0x80..=0x8F),
        _ => return (1, 1),
    };

    match bytes.get(1..len) {
        Some([first, rest @ ..])
            if second.contains(first) && rest.iter().all(|b| (0x80..=0xBF).contains(b)) =>
        {
            (len, units)
        }
        _ => (1, 1),
    }
}

/// Number of UTF-16 units in `bytes`.
#[must_use]
pub fn utf16_len(bytes: &[u8]) -> usize {
    if bytes.is_ascii() {
        return bytes.len();
    }

    let mut idx = 0;
    let mut units = 0;

    while idx < bytes.len() {
        let (len, width) = char_at(&bytes[idx..]);

        idx += len;
        units += width;
    }

    units
}

/// Byte offset of the `units`-th UTF-16 unit in `bytes`.
///
/// A target inside a surrogate pair snaps back to the start of the pair.
/// Targets past the end clamp to `bytes.len()`.
#[must_use]
pub fn byte_offset_of_unit(bytes: &[u8], units: usize) -> usize {
    let mut idx = 0;
    let mut consumed = 0;

    while idx < bytes.len() {
        let (len, width) = char_at(&bytes[idx..]);

        if consumed + width > units {
            break;
        }

        idx += len;
        consumed += width;
    }

    idx
}

/// Number of UTF-16 units before byte `offset` in `bytes`.
///
/// An offset inside a multi-byte sequence snaps back to the start of that
/// sequence. Offsets past the end clamp to the full width.
#[must_use]
pub fn unit_offset_of_byte(bytes: &[u8], offset: usize) -> usize {
    let mut idx = 0;
    let mut units = 0;

    while idx < bytes.len() {
        let (len, width) = char_at(&bytes[idx..]);

        if idx + len > offset {
            break;
        }

        idx += len;
        units += width;
    }

    units
}
