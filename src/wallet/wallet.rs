use crate::error::{LedgerError, Result};
use crate::utils::ecdsa_p256_sha256_sign;
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use zeroize::Zeroizing;

/// A P-256 key pair. The address is the hex uncompressed public key.
pub struct Wallet {
    key_pair: EcdsaKeyPair,
    address: String,
}

impl Wallet {
    /// Generate a fresh key pair, returning the wallet and its PKCS#8 document
    pub fn generate() -> Result<(Wallet, Zeroizing<Vec<u8>>)> {
        let pkcs8 = crate::utils::new_key_pair()?;
        let wallet = Wallet::from_pkcs8(&pkcs8)?;
        Ok((wallet, pkcs8))
    }

    pub fn new() -> Result<Wallet> {
        Self::generate().map(|(wallet, _)| wallet)
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Wallet> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8, &rng)
            .map_err(|e| LedgerError::Crypto(format!("Failed to load key pair from PKCS8: {e}")))?;
        Ok(Self::from_key_pair(key_pair))
    }

    /// Build a wallet from a raw hex private scalar and its hex uncompressed public key.
    pub fn from_key_pair_hex(private_key: &str, public_key: &str) -> Result<Wallet> {
        let private_key = Zeroizing::new(
            HEXLOWER
                .decode(private_key.as_bytes())
                .map_err(|e| LedgerError::Crypto(format!("Invalid private key hex: {e}")))?,
        );
        let public_key = HEXLOWER
            .decode(public_key.as_bytes())
            .map_err(|e| LedgerError::Crypto(format!("Invalid public key hex: {e}")))?;
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_private_key_and_public_key(
            &ECDSA_P256_SHA256_ASN1_SIGNING,
            &private_key,
            &public_key,
            &rng,
        )
        .map_err(|e| LedgerError::Crypto(format!("Key pair rejected: {e}")))?;
        Ok(Self::from_key_pair(key_pair))
    }

    fn from_key_pair(key_pair: EcdsaKeyPair) -> Wallet {
        let address = HEXLOWER.encode(key_pair.public_key().as_ref());
        Wallet { key_pair, address }
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    /// Hex DER signature over `message`
    pub fn sign(&self, message: &[u8]) -> Result<String> {
        ecdsa_p256_sha256_sign(&self.key_pair, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{ecdsa_p256_sha256_verify, validate_address};

    #[test]
    fn test_address_is_uncompressed_public_key() {
        let wallet = Wallet::new().unwrap();
        assert!(validate_address(wallet.get_address()));
        assert!(wallet.get_address().starts_with("04"));
    }

    #[test]
    fn test_pkcs8_reload_keeps_address() {
        let (wallet, pkcs8) = Wallet::generate().unwrap();
        let reloaded = Wallet::from_pkcs8(&pkcs8).unwrap();
        assert_eq!(wallet.get_address(), reloaded.get_address());
    }

    #[test]
    fn test_signature_verifies_under_address() {
        let wallet = Wallet::new().unwrap();
        let signature = wallet.sign(b"tx-id").unwrap();
        assert!(ecdsa_p256_sha256_verify(
            wallet.get_address(),
            &signature,
            b"tx-id"
        ));

        let other = Wallet::new().unwrap();
        assert!(!ecdsa_p256_sha256_verify(
            other.get_address(),
            &signature,
            b"tx-id"
        ));
    }

    #[test]
    fn test_from_key_pair_hex() {
        let wallet = crate::testnet::genesis_wallet();
        assert_eq!(wallet.get_address(), crate::core::GENESIS_ADDRESS);
    }

    #[test]
    fn test_from_key_pair_hex_rejects_mismatched_keys() {
        let other = Wallet::new().unwrap();
        let result = Wallet::from_key_pair_hex(
            crate::testnet::GENESIS_PRIVATE_KEY,
            other.get_address(),
        );
        assert!(matches!(result, Err(LedgerError::Crypto(_))));
    }
}
