//! Nametag text handling.
//!
//! Nametags are stored as fixed-width Shift-JIS regions. Players typing on
//! the in-game keyboard get fullwidth ASCII variants, which read terribly
//! next to regular text, so decoded tags are normalized to halfwidth.

use encoding_rs::SHIFT_JIS;

/// Decodes a fixed-width nametag region: Shift-JIS bytes, NUL-terminated.
pub fn decode_nametag(bytes: &[u8]) -> String {
    let raw = match bytes.iter().position(|&byte| byte == 0) {
        Some(nul) => &bytes[..nul],
        None => bytes,
    };

    let (decoded, _, had_errors) = SHIFT_JIS.decode(raw);
    if had_errors {
        tracing::warn!("Nametag contains invalid Shift-JIS bytes: {raw:02X?}");
    }

    to_halfwidth(&decoded)
}

/// Converts fullwidth ASCII variants (U+FF01..=U+FF5E) and the ideographic
/// space to their halfwidth equivalents. Other characters pass through.
pub fn to_halfwidth(input: &str) -> String {
    input
        .chars()
        .map(|c| match c as u32 {
            code @ 0xFF01..=0xFF5E => char::from_u32(code - 0xFF00 + 0x20).unwrap_or(c),
            0x3000 => ' ',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullwidth_ascii_becomes_halfwidth() {
        assert_eq!(to_halfwidth("ＡＢＣ１＝＄"), "ABC1=$");
        assert_eq!(to_halfwidth("\u{3000}"), " ");
    }

    #[test]
    fn non_fullwidth_characters_pass_through() {
        assert_eq!(to_halfwidth("plain"), "plain");
        assert_eq!(to_halfwidth("イ"), "イ");
    }

    #[test]
    fn nametag_decodes_shift_jis_and_stops_at_nul() {
        // Fullwidth "Ａ", halfwidth "1", then a NUL and garbage padding.
        let bytes = [0x82, 0x60, 0x31, 0x00, 0xFF, 0xFF];
        assert_eq!(decode_nametag(&bytes), "A1");
    }

    #[test]
    fn empty_nametag_decodes_to_empty_string() {
        assert_eq!(decode_nametag(&[0x00; 16]), "");
        assert_eq!(decode_nametag(&[]), "");
    }

    #[test]
    fn katakana_nametag_survives() {
        // "イ" in Shift-JIS.
        let bytes = [0x83, 0x43, 0x00];
        assert_eq!(decode_nametag(&bytes), "イ");
    }
}
