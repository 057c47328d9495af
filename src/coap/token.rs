use std::fmt::{Debug, Formatter};

use anyhow::bail;
use rand::RngCore;

/// The application-layer correlation key: up to eight opaque bytes, carried unchanged
///  between a request and its (possibly separate) response. An empty token is valid and
///  means correlation by message id alone.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Token {
    len: u8,
    bytes: [u8; 8],
}

impl Token {
    pub const EMPTY: Token = Token { len: 0, bytes: [0; 8] };

    pub fn new(value: &[u8]) -> anyhow::Result<Token> {
        if value.len() > 8 {
            bail!("a token has at most 8 bytes, got {}", value.len());
        }
        let mut bytes = [0u8; 8];
        bytes[..value.len()].copy_from_slice(value);
        Ok(Token {
            len: value.len() as u8,
            bytes,
        })
    }

    pub fn random() -> Token {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Token { len: 8, bytes }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x")?;
        for b in self.as_slice() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty(b"", "0x")]
    #[case::short(b"\x01\x02", "0x0102")]
    #[case::full(b"\xde\xad\xbe\xef\x01\x02\x03\x04", "0xdeadbeef01020304")]
    fn test_token_debug(#[case] bytes: &[u8], #[case] expected: &str) {
        let token = Token::new(bytes).unwrap();
        assert_eq!(format!("{:?}", token), expected);
        assert_eq!(token.as_slice(), bytes);
    }

    #[test]
    fn test_token_too_long() {
        assert!(Token::new(b"123456789").is_err());
    }

    #[test]
    fn test_random_tokens_differ() {
        // 64 random bits colliding is not a realistic test failure
        assert_ne!(Token::random(), Token::random());
        assert!(!Token::random().is_empty());
    }
}
