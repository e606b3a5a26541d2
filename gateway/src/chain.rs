//! Chain id helpers: hex quantities and well-known network names.

use crate::error::ProviderError;

/// Encode a number as a JSON-RPC quantity (`0x`-prefixed, no leading zeros).
pub fn to_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Decode a JSON-RPC quantity such as `"0xaa36a7"`.
pub fn parse_quantity(value: &str) -> Result<u64, ProviderError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ProviderError::InvalidResponse(format!("not a hex quantity: {value:?}")))?;
    if digits.is_empty() {
        return Err(ProviderError::InvalidResponse(format!(
            "empty hex quantity: {value:?}"
        )));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hex quantity {value:?}: {e}")))
}

/// Network name for a chain id, `"unknown"` when it is not a well-known chain.
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        10 => "optimism",
        56 => "bnb",
        100 => "xdai",
        137 => "matic",
        8453 => "base",
        17000 => "holesky",
        31337 => "anvil",
        42161 => "arbitrum",
        59144 => "linea",
        80002 => "matic-amoy",
        84532 => "base-sepolia",
        421614 => "arbitrum-sepolia",
        11155111 => "sepolia",
        11155420 => "optimism-sepolia",
        _ => "unknown",
    }
}
