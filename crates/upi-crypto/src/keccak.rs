use sha3::{Digest, Keccak256};
use upi_types::Upi;

/// Keccak-256 digest used to derive property identifiers.
///
/// This is the pre-standard Keccak padding (as used by Ethereum tooling), not
/// NIST SHA3-256; identifiers produced here match `web3.utils.sha3` output.
pub struct UpiHasher;

impl UpiHasher {
    /// Raw Keccak-256 digest of `data`.
    pub fn digest(data: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    /// Digest a canonical source string into a [`Upi`].
    pub fn hash_canonical(source: &str) -> Upi {
        Upi::from_digest(Self::digest(source.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_vector() {
        // Keccak-256("") from the Keccak reference vectors.
        assert_eq!(
            hex::encode(UpiHasher::digest(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn differs_from_nist_sha3() {
        let nist = sha3::Sha3_256::digest(b"abc");
        assert_ne!(UpiHasher::digest(b"abc").as_slice(), nist.as_slice());
    }

    #[test]
    fn hash_canonical_is_deterministic() {
        let a = UpiHasher::hash_canonical("+40.712776||-74.005974||");
        let b = UpiHasher::hash_canonical("+40.712776||-74.005974||");
        assert_eq!(a, b);
        assert_ne!(a, UpiHasher::hash_canonical("+40.712776||-74.005974||A"));
    }
}
