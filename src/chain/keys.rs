use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;

use super::error::KeyError;
use crate::secret::Secret;

/// Parse a hex private key (with or without `0x`) into a local signer
pub fn signer_from_secret(secret: &Secret) -> Result<PrivateKeySigner, KeyError> {
    // The parse error can echo input bytes, so it is not forwarded
    PrivateKeySigner::from_str(secret.expose().trim())
        .map_err(|_| KeyError::InvalidKey("not a 32-byte secp256k1 key".to_string()))
}

/// Derive the account address controlled by `secret`
pub fn address_of(secret: &Secret) -> Result<Address, KeyError> {
    Ok(signer_from_secret(secret)?.address())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test key (account #0 of the default anvil/hardhat mnemonic)
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ANVIL_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_address_derivation() {
        let address = address_of(&Secret::new(ANVIL_KEY)).unwrap();
        assert_eq!(address, ANVIL_ADDR.parse::<Address>().unwrap());
        assert_eq!(address.to_string(), ANVIL_ADDR);
    }

    #[test]
    fn test_key_without_prefix() {
        let bare = ANVIL_KEY.trim_start_matches("0x");
        let address = address_of(&Secret::new(bare)).unwrap();
        assert_eq!(address, ANVIL_ADDR.parse::<Address>().unwrap());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(address_of(&Secret::new("0x1234")).is_err());
        assert!(address_of(&Secret::new("not-hex")).is_err());
    }
}
