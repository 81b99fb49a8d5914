//! Cache entry identity
//!
//! Every cached locator lives in a directory named after the MD5 digest of
//! its (optionally transformed) locator string. Same locator = same directory.

use md5::{Digest, Md5};

/// Length of an entry id in hex characters (128-bit digest)
pub const ENTRY_ID_LEN: usize = 32;

/// Derive the entry directory name for a locator
pub fn entry_id(key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check whether a directory name looks like an entry id
pub fn is_entry_id(name: &str) -> bool {
    name.len() == ENTRY_ID_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(entry_id(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(entry_id("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn deterministic() {
        let a = entry_id("/data/sample.csv");
        let b = entry_id("/data/sample.csv");
        assert_eq!(a, b);
        assert!(is_entry_id(&a));
    }

    #[test]
    fn different_locators() {
        assert_ne!(
            entry_id("https://example.com/a.csv"),
            entry_id("https://example.com/b.csv")
        );
    }

    #[test]
    fn rejects_non_ids() {
        assert!(!is_entry_id("cache_metadata.json"));
        assert!(!is_entry_id("D41D8CD98F00B204E9800998ECF8427E"));
        assert!(!is_entry_id("d41d8cd9"));
    }
}
