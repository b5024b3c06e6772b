// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Conversion between unsigned big integers and the byte buffers stored in
//! big integer attributes.
//!
//! The encoding is big-endian, carries no sign byte and is always minimal:
//! no leading zero bytes, except that the value zero is a single `0x00`
//! byte rather than an empty buffer.

use crate::error::{Error, Result};

use num_bigint::BigUint;
use num_traits::Zero;

/// Returns the minimal big-endian encoding of `value`
pub fn encode(value: &BigUint) -> Vec<u8> {
    /* BigUint already encodes zero as [0] */
    value.to_bytes_be()
}

/// Returns the length of the buffer [encode] would produce, without
/// allocating it
pub fn encoded_len(value: &BigUint) -> usize {
    if value.is_zero() {
        return 1;
    }
    usize::try_from((value.bits() + 7) / 8).unwrap_or(usize::MAX)
}

/// Parses a big-endian byte sequence into an unsigned integer
///
/// An empty sequence does not represent any value and is refused with a
/// `MalformedAttribute` error. Leading zero bytes are accepted and do not
/// change the resulting value.
pub fn decode(bytes: &[u8]) -> Result<BigUint> {
    if bytes.is_empty() {
        return Err(Error::malformed(
            "empty buffer is not an integer".to_string(),
        ));
    }
    Ok(BigUint::from_bytes_be(bytes))
}
