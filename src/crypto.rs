use std::sync::LazyLock;

use rand::rngs::OsRng;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// SHA-256 output.
pub type Digest = [u8; 32];

static SECP: LazyLock<Secp256k1<All>> = LazyLock::new(Secp256k1::new);

/// Canonical JSON form of one hashed value.
pub fn canonical<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).expect("ledger records always serialize to JSON")
}

/// Hash several canonical values at once. The parts are sorted before being
/// joined with a single space, so the result does not depend on argument order.
pub fn hash_parts(parts: &[String]) -> Digest {
    let mut sorted: Vec<&str> = parts.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(" ").as_bytes());
    hasher.finalize().into()
}

/// Hex form of [`hash_parts`].
pub fn crypto_hash(parts: &[String]) -> String {
    hex::encode(hash_parts(parts))
}

/// Digest of a single serializable value, which is what gets signed.
pub fn digest_of<T: Serialize + ?Sized>(value: &T) -> Digest {
    hash_parts(&[canonical(value)])
}

/// Number of leading zero bits of a hex-encoded hash. Non-hex input counts as zero.
pub fn leading_zero_bits(hash_hex: &str) -> u32 {
    let Ok(bytes) = hex::decode(hash_hex) else {
        return 0;
    };
    let mut bits = 0;
    for byte in bytes {
        if byte == 0 {
            bits += 8;
            continue;
        }
        bits += byte.leading_zeros();
        break;
    }
    bits
}

pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    leading_zero_bits(hash_hex) >= difficulty
}

/// Signing and verification seam. Validation code only ever talks to this
/// trait, never to a concrete curve.
pub trait SignatureScheme {
    type SecretKey;

    fn sign(&self, secret_key: &Self::SecretKey, digest: &Digest) -> String;

    /// Never fails: malformed keys or signatures simply do not verify.
    fn verify(&self, public_key: &str, digest: &Digest, signature: &str) -> bool;
}

/// ECDSA over secp256k1. Public keys are hex of the compressed point,
/// signatures are hex DER.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Scheme;

impl SignatureScheme for Secp256k1Scheme {
    type SecretKey = SecretKey;

    fn sign(&self, secret_key: &SecretKey, digest: &Digest) -> String {
        let msg = Message::from_digest(*digest);
        let sig = SECP.sign_ecdsa(&msg, secret_key);
        hex::encode(&sig.serialize_der()[..])
    }

    fn verify(&self, public_key: &str, digest: &Digest, signature: &str) -> bool {
        verify_signature_hex(public_key, signature, digest).unwrap_or(false)
    }
}

/// Generate a new secp256k1 keypair, returning the secret key and the hex of
/// the compressed public key (which doubles as the address).
pub fn generate_keypair() -> (SecretKey, String) {
    let (sk, pk) = SECP.generate_keypair(&mut OsRng);
    (sk, hex::encode(pk.serialize()))
}

/// Verify a hex DER signature against a hex public key and a 32-byte digest.
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    digest: &Digest,
) -> Result<bool, &'static str> {
    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_digest(*digest);
    Ok(SECP.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_argument_order() {
        let a = vec![canonical("one"), canonical(&2), canonical(&[3, 4])];
        let b = vec![canonical(&[3, 4]), canonical("one"), canonical(&2)];
        assert_eq!(crypto_hash(&a), crypto_hash(&b));
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(
            crypto_hash(&[canonical("foo")]),
            crypto_hash(&[canonical("bar")])
        );
    }

    #[test]
    fn known_sha256_vector() {
        // sha256("\"foo\"")
        assert_eq!(
            crypto_hash(&[canonical("foo")]),
            "b2213295d564916f89a6a42455567c87c3f480fcd7a1c15e220f17d7169a790b"
        );
    }

    #[test]
    fn counts_leading_zero_bits() {
        assert_eq!(leading_zero_bits("ff00"), 0);
        assert_eq!(leading_zero_bits("0f00"), 4);
        assert_eq!(leading_zero_bits("00ff"), 8);
        assert_eq!(leading_zero_bits("0001"), 15);
        assert_eq!(leading_zero_bits("not-hex"), 0);
        assert!(meets_difficulty("0fff", 4));
        assert!(!meets_difficulty("0fff", 5));
    }

    #[test]
    fn sign_then_verify() {
        let (sk, pk) = generate_keypair();
        let digest = digest_of("payload");
        let sig = Secp256k1Scheme.sign(&sk, &digest);

        assert!(Secp256k1Scheme.verify(&pk, &digest, &sig));
        assert!(!Secp256k1Scheme.verify(&pk, &digest_of("other"), &sig));

        let (_, other_pk) = generate_keypair();
        assert!(!Secp256k1Scheme.verify(&other_pk, &digest, &sig));
        assert!(!Secp256k1Scheme.verify("zz", &digest, &sig));
        assert!(!Secp256k1Scheme.verify(&pk, &digest, "deadbeef"));
    }
}
