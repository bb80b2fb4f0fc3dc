// wallet-core/src/chains/solana/tokens.rs
//
// Curated list of well-known SPL mints. Tokens outside it keep no symbol.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownMint {
    pub mint: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
}

pub const KNOWN_MINTS: &[KnownMint] = &[
    KnownMint {
        mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        symbol: "USDC",
        name: "USD Coin",
        decimals: 6,
    },
    KnownMint {
        mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
        symbol: "USDT",
        name: "Tether USD",
        decimals: 6,
    },
    KnownMint {
        mint: "So11111111111111111111111111111111111111112",
        symbol: "SOL",
        name: "Wrapped SOL",
        decimals: 9,
    },
    KnownMint {
        mint: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
        symbol: "BONK",
        name: "Bonk",
        decimals: 5,
    },
    KnownMint {
        mint: "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
        symbol: "JUP",
        name: "Jupiter",
        decimals: 6,
    },
];

pub fn lookup(mint: &str) -> Option<&'static KnownMint> {
    KNOWN_MINTS.iter().find(|m| m.mint == mint)
}
