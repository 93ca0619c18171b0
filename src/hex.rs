//! Decoding of JSON-RPC hex quantities (`"0x1a"`).
use std::num::ParseIntError;

use thiserror::Error;

/// Failure to decode a hex quantity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    /// The string contains something other than hex digits after the prefix.
    #[error("invalid hex digit in {0:?}")]
    InvalidDigit(String),
    /// The value does not fit the target integer type.
    #[error("hex quantity {input:?} out of range: {source}")]
    OutOfRange {
        /// The offending input.
        input: String,
        /// Underlying integer parse failure.
        #[source]
        source: ParseIntError,
    },
}

fn parse_radix<T>(
    input: &str,
    from_str_radix: fn(&str, u32) -> Result<T, ParseIntError>,
) -> Result<T, HexError>
where
    T: Default,
{
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.is_empty() {
        return Ok(T::default());
    }
    // from_str_radix accepts a leading sign, which is not a hex quantity
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HexError::InvalidDigit(input.to_string()));
    }
    from_str_radix(digits, 16).map_err(|source| HexError::OutOfRange {
        input: input.to_string(),
        source,
    })
}

/// Decode a hex quantity into an `i64`. An empty string decodes to 0.
pub fn parse_hex_i64(input: &str) -> Result<i64, HexError> {
    parse_radix(input, i64::from_str_radix)
}

/// Decode a hex quantity into a `u64`. An empty string decodes to 0.
pub fn parse_hex_u64(input: &str) -> Result<u64, HexError> {
    parse_radix(input, u64::from_str_radix)
}

/// Decode a hex quantity into a `u128` (wei amounts).
pub fn parse_hex_u128(input: &str) -> Result<u128, HexError> {
    parse_radix(input, u128::from_str_radix)
}

/// Encode a height as a `0x`-prefixed quantity for request params.
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}
