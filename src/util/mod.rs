#[cfg(test)]
pub mod test;

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `bytes`, used only to render a password for
/// `ACL LIST`/`ACL GETUSER` output (§6) without ever printing it back in
/// the clear. Storage and `tscmp` comparisons both still operate on the
/// raw password bytes — hashing here is display-only.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        // echo -n "" | sha256sum
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_deterministic_and_fixed_length() {
        assert_eq!(sha256_hex(b"hunter2"), sha256_hex(b"hunter2"));
        assert_eq!(sha256_hex(b"hunter2").len(), 64);
        assert_ne!(sha256_hex(b"hunter2"), sha256_hex(b"hunter3"));
    }
}
