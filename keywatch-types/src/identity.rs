//! Monitored identities: BLS keys and staking addresses.

use alloc::string::String;
use alloc::vec::Vec;

/// Length in bytes of a BLS public key.
pub const BLS_KEY_LEN: usize = 96;

/// Length of a hex-encoded BLS public key.
pub const BLS_HEX_KEY_LEN: usize = 2 * BLS_KEY_LEN;

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 32;

/// Human readable part of bech32 account addresses.
pub const ADDRESS_HRP: &str = "erd";

/// An account address kept in both of its encodings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    pub hex: String,
    pub bech32: String,
}

/// Identities parsed from a list file.
///
/// BLS keys are monitored directly. Addresses are resolved on every cycle
/// into the BLS keys they currently have staked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityList {
    pub bls_hex_keys: Vec<String>,
    pub addresses: Vec<Address>,
}

impl IdentityList {
    pub fn is_empty(&self) -> bool {
        self.bls_hex_keys.is_empty() && self.addresses.is_empty()
    }
}
