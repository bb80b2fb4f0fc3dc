// wallet-core/src/crypto/paths.rs
//
// Derivation paths for the two supported chains.
// BIP-44 for Ethereum (secp256k1), SLIP-0010 for the optional Solana HD scheme.

/// SLIP-44 registered coin types
pub mod coin_type {
    pub const ETHEREUM: u32 = 60;
    pub const SOLANA: u32 = 501;
}

/// # Conventions
/// - BIP-44: `m/44'/coin'/account'/change/index` (secp256k1)
/// - SLIP-0010: `m/44'/coin'/account'/change'` (ed25519, all hardened)
pub struct DerivationPaths;

impl DerivationPaths {
    /// The only Ethereum path the wallet derives.
    pub const EVM_0: &'static str = "m/44'/60'/0'/0/0";

    #[inline]
    pub fn evm(index: u32) -> String {
        format!("m/44'/{}'/0'/0/{}", coin_type::ETHEREUM, index)
    }

    /// Phantom / Solflare style path, used only by `SolanaDerivation::Slip10`.
    pub const SOLANA_0: &'static str = "m/44'/501'/0'/0'";

    #[inline]
    pub fn solana(account: u32) -> String {
        format!("m/44'/{}'/{}'/0'", coin_type::SOLANA, account)
    }
}
