//! Manifest digest generation.

use sha2::{Digest, Sha256};

/// Compute the digest identifying one manifest generation.
///
/// Pairs must already be sorted by identifier so equal manifests hash equally.
/// Every field is length-prefixed, so no choice of identifiers or
/// fingerprints can shift bytes from one entry into the next.
pub fn compute_manifest_digest<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut hasher = Sha256::new();
    for (resource, fingerprint) in pairs {
        update_field(&mut hasher, resource);
        update_field(&mut hasher, fingerprint);
    }
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        let pairs = [("index.html", "h1"), ("main.js", "h2")];
        assert_eq!(compute_manifest_digest(pairs), compute_manifest_digest(pairs));
    }

    #[test]
    fn test_digest_changes_with_fingerprint() {
        let before = compute_manifest_digest([("main.js", "h2")]);
        let after = compute_manifest_digest([("main.js", "h3")]);
        assert_ne!(before, after);
    }

    #[test]
    fn test_digest_separates_fields() {
        let joined = compute_manifest_digest([("ab", "c")]);
        let split = compute_manifest_digest([("a", "bc")]);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_digest_fingerprint_cannot_absorb_entries() {
        let first = compute_manifest_digest([("a", "b"), ("c", "d\ne\nf")]);
        let second = compute_manifest_digest([("a", "b\nc\nd"), ("e", "f")]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_digest_format() {
        let hash = compute_manifest_digest([("index.html", "h1")]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
