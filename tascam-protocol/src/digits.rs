//! Decimal digit fields as they appear on the wire
//!
//! Four-digit numbers (track numbers, minutes) are transmitted in the order
//! tens, ones, thousands, hundreds. `12` is sent as `"1200"` and `3012` as
//! `"1230"`. This ordering is part of the protocol and must be kept.

use crate::error::ParseError;

fn digit(code: &str, field: &'static str, raw: &str, c: char) -> Result<u16, ParseError> {
    c.to_digit(10)
        .map(|d| d as u16)
        .ok_or_else(|| ParseError::InvalidDigits {
            code: code.to_string(),
            field,
            value: raw.to_string(),
        })
}

/// Decode a four-character field in tens, ones, thousands, hundreds order.
///
/// `raw` must be exactly four characters; callers slice it after checking
/// the payload length.
pub fn decode_ordered(code: &str, field: &'static str, raw: &str) -> Result<u16, ParseError> {
    let mut chars = raw.chars();
    let mut next = || {
        chars.next().ok_or_else(|| ParseError::InvalidDigits {
            code: code.to_string(),
            field,
            value: raw.to_string(),
        })
    };
    let tens = digit(code, field, raw, next()?)?;
    let ones = digit(code, field, raw, next()?)?;
    let thousands = digit(code, field, raw, next()?)?;
    let hundreds = digit(code, field, raw, next()?)?;

    Ok(thousands * 1000 + hundreds * 100 + tens * 10 + ones)
}

/// Decode a two-character field in tens, ones order.
pub fn decode_pair(code: &str, field: &'static str, raw: &str) -> Result<u8, ParseError> {
    let mut chars = raw.chars();
    let tens = chars.next().map(|c| digit(code, field, raw, c)).transpose()?;
    let ones = chars.next().map(|c| digit(code, field, raw, c)).transpose()?;

    match (tens, ones) {
        (Some(tens), Some(ones)) => Ok((tens * 10 + ones) as u8),
        _ => Err(ParseError::InvalidDigits {
            code: code.to_string(),
            field,
            value: raw.to_string(),
        }),
    }
}

/// Encode a value below 10000 in tens, ones, thousands, hundreds order.
pub fn encode_ordered(value: u16) -> String {
    let thousands = (value / 1000) % 10;
    let hundreds = (value / 100) % 10;
    let tens = (value / 10) % 10;
    let ones = value % 10;

    format!("{tens}{ones}{thousands}{hundreds}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0000", 0)]
    #[case("1200", 12)]
    #[case("1230", 3012)]
    #[case("9901", 199)]
    #[case("0010", 1000)]
    fn test_decode_ordered(#[case] raw: &str, #[case] expected: u16) {
        assert_eq!(decode_ordered("D5", "track", raw).unwrap(), expected);
    }

    #[rstest]
    #[case(1, "0100")]
    #[case(12, "1200")]
    #[case(105, "0501")]
    #[case(999, "9909")]
    fn test_encode_ordered(#[case] value: u16, #[case] expected: &str) {
        assert_eq!(encode_ordered(value), expected);
        assert_eq!(decode_ordered("23", "track", expected).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_non_digits() {
        let err = decode_ordered("D5", "track", "12a0").unwrap_err();
        assert!(matches!(err, ParseError::InvalidDigits { field: "track", .. }));
    }

    #[test]
    fn test_decode_pair() {
        assert_eq!(decode_pair("D8", "seconds", "30").unwrap(), 30);
        assert_eq!(decode_pair("D8", "seconds", "07").unwrap(), 7);
        assert!(decode_pair("D8", "seconds", "3").is_err());
        assert!(decode_pair("D8", "seconds", "-1").is_err());
    }
}
