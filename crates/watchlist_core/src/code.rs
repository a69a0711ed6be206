//! Invite code generator.
//!
//! # Invariants
//! - Codes are drawn from the OS-seeded CSPRNG and encoded with the
//!   URL-safe base64 alphabet without padding, so they are fixed length for
//!   a given byte count.
//! - Uniqueness among pending invites is enforced by the store; callers
//!   regenerate on a unique-index collision.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid code regex"));

/// Source of invite codes. The lifecycle engine depends on this seam so
/// collision handling can be exercised deterministically.
pub trait CodeSource: Send + Sync {
    fn generate(&self) -> String;
    /// Returns whether `code` could have been produced by this source.
    fn is_well_formed(&self, code: &str) -> bool;
}

/// Produces fixed-length URL-safe codes of `byte_len` random bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenerator {
    byte_len: usize,
}

impl CodeGenerator {
    pub fn new(byte_len: usize) -> Self {
        Self { byte_len }
    }

    /// Length in characters of every code this generator produces.
    pub fn code_len(&self) -> usize {
        (self.byte_len * 4).div_ceil(3)
    }
}

impl CodeSource for CodeGenerator {
    fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.byte_len];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn is_well_formed(&self, code: &str) -> bool {
        code.len() == self.code_len() && CODE_RE.is_match(code)
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeGenerator, CodeSource};
    use std::collections::HashSet;

    #[test]
    fn codes_are_fixed_length_and_url_safe() {
        let generator = CodeGenerator::new(16);
        for _ in 0..64 {
            let code = generator.generate();
            assert_eq!(code.len(), 22);
            assert!(generator.is_well_formed(&code), "malformed code {code}");
        }
    }

    #[test]
    fn codes_do_not_repeat_in_small_sample() {
        let generator = CodeGenerator::new(16);
        let codes: HashSet<String> = (0..1_000).map(|_| generator.generate()).collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn rejects_foreign_alphabet_and_length() {
        let generator = CodeGenerator::new(16);
        assert!(!generator.is_well_formed("short"));
        assert!(!generator.is_well_formed("abcdefghijklmnopqrstu+"));
        assert!(!generator.is_well_formed("abcdefghijklmnopqrst/="));
    }
}
