use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA256_ASN1_SIGNING,
};
use zeroize::Zeroizing;

use crate::error::{LedgerError, Result};
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hex length of an uncompressed P-256 public key (`04 || X || Y`)
pub const ADDRESS_HEX_LEN: usize = 130;

/// Seconds since the unix epoch
pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_secs();

    i64::try_from(duration).map_err(|_| LedgerError::Crypto("Timestamp overflow".to_string()))
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(&sha256_digest(data))
}

pub fn new_key_pair() -> Result<Zeroizing<Vec<u8>>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(Zeroizing::new(pkcs8))
}

pub fn ecdsa_p256_sha256_sign(key_pair: &EcdsaKeyPair, message: &[u8]) -> Result<String> {
    let rng = SystemRandom::new();
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| LedgerError::Crypto(format!("Failed to sign message: {e}")))?;
    Ok(HEXLOWER.encode(signature.as_ref()))
}

/// Verifies a hex DER signature against a hex public key. Undecodable
/// input never verifies.
pub fn ecdsa_p256_sha256_verify(public_key_hex: &str, signature_hex: &str, message: &[u8]) -> bool {
    let Ok(public_key) = HEXLOWER.decode(public_key_hex.as_bytes()) else {
        return false;
    };
    let Ok(signature) = HEXLOWER.decode(signature_hex.as_bytes()) else {
        return false;
    };
    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, public_key);
    peer_public_key.verify(message, &signature).is_ok()
}

/// An address is an uncompressed public key: 130 lowercase hex characters
/// starting with `04`, naming a point on P-256.
pub fn validate_address(address: &str) -> bool {
    let well_formed = address.len() == ADDRESS_HEX_LEN
        && address.starts_with("04")
        && address
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return false;
    }

    match HEXLOWER.decode(address.as_bytes()) {
        Ok(point) => p256::PublicKey::from_sec1_bytes(&point).is_ok(),
        Err(_) => false,
    }
}
