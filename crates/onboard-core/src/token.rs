//! Token amounts

use serde::{Deserialize, Serialize};
use std::fmt;

/// A token quantity in the token contract's base unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(TokenAmount)
    }

    /// Parse a JSON-RPC quantity or 32-byte ABI word (`0x`-prefixed hex).
    ///
    /// Leading zeros are ignored; values that do not fit in 128 bits are rejected.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return if digits.chars().all(|c| c == '0') {
                Some(Self::ZERO)
            } else {
                None
            };
        }
        if significant.len() > 32 {
            return None;
        }
        u128::from_str_radix(significant, 16).ok().map(Self)
    }

    /// Encode as a 32-byte ABI word without prefix
    pub fn to_abi_word(&self) -> String {
        format!("{:064x}", self.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(TokenAmount::from_hex("0x0"), Some(TokenAmount::ZERO));
        assert_eq!(TokenAmount::from_hex("0x"), Some(TokenAmount::ZERO));
        assert_eq!(TokenAmount::from_hex("0x64"), Some(TokenAmount(100)));
        assert_eq!(
            TokenAmount::from_hex(&format!("0x{}", "0".repeat(62) + "2a")),
            Some(TokenAmount(42))
        );
    }

    #[test]
    fn test_from_hex_rejects_overflow_and_garbage() {
        assert_eq!(TokenAmount::from_hex(&format!("0x1{}", "0".repeat(32))), None);
        assert_eq!(TokenAmount::from_hex("64"), None);
        assert_eq!(TokenAmount::from_hex("0xzz"), None);
    }

    #[test]
    fn test_abi_word() {
        let word = TokenAmount(255).to_abi_word();
        assert_eq!(word.len(), 64);
        assert!(word.ends_with("ff"));
    }
}
