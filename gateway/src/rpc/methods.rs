use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chain::parse_quantity;
use crate::config::{ChainParams, NativeCurrency};
use crate::error::ProviderError;
use crate::rpc::{decode_hex, encode_hex, Eip1193};

/// Wallet error code for a chain it does not know (EIP-3326).
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Wallet error code for a request the user declined (EIP-1193).
pub const USER_REJECTED: i64 = 4001;

/// Transaction receipt, reduced to the fields the gateway needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` on revert; absent before Byzantium.
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        !matches!(self.status.as_deref(), Some("0x0") | Some("0x00"))
    }
}

/// Parameters of `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams<'a> {
    pub chain_id: String,
    pub chain_name: &'a str,
    pub rpc_urls: &'a [String],
    pub native_currency: &'a NativeCurrency,
    pub block_explorer_urls: &'a [String],
}

impl<'a> From<&'a ChainParams> for AddChainParams<'a> {
    fn from(chain: &'a ChainParams) -> Self {
        Self {
            chain_id: chain.hex_chain_id(),
            chain_name: &chain.chain_name,
            rpc_urls: &chain.rpc_urls,
            native_currency: &chain.native_currency,
            block_explorer_urls: &chain.block_explorer_urls,
        }
    }
}

/// eth_requestAccounts - Ask the wallet to authorize accounts.
pub async fn request_accounts<P: Eip1193>(provider: &P) -> Result<Vec<String>, ProviderError> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    parse_accounts(value)
}

/// eth_accounts - Accounts already authorized, without prompting.
pub async fn accounts<P: Eip1193>(provider: &P) -> Result<Vec<String>, ProviderError> {
    let value = provider.request("eth_accounts", json!([])).await?;
    parse_accounts(value)
}

/// eth_chainId - Currently selected chain.
pub async fn chain_id<P: Eip1193>(provider: &P) -> Result<u64, ProviderError> {
    let value = provider.request("eth_chainId", json!([])).await?;
    let quantity = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_chainId returned {value}")))?;
    parse_quantity(quantity)
}

/// wallet_switchEthereumChain - Select a chain the wallet already knows.
pub async fn switch_chain<P: Eip1193>(provider: &P, chain_id: u64) -> Result<(), ProviderError> {
    provider
        .request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": crate::chain::to_quantity(chain_id) }]),
        )
        .await?;
    Ok(())
}

/// wallet_addEthereumChain - Register (and select) a chain.
pub async fn add_chain<P: Eip1193>(provider: &P, chain: &ChainParams) -> Result<(), ProviderError> {
    let params = serde_json::to_value(AddChainParams::from(chain))?;
    provider
        .request("wallet_addEthereumChain", Value::Array(vec![params]))
        .await?;
    Ok(())
}

/// eth_call - Execute a read-only call against the latest block.
pub async fn call<P: Eip1193>(
    provider: &P,
    to: Address,
    data: &[u8],
) -> Result<Vec<u8>, ProviderError> {
    let value = provider
        .request(
            "eth_call",
            json!([{ "to": to.to_string(), "data": encode_hex(data) }, "latest"]),
        )
        .await?;
    let hex = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_call returned {value}")))?;
    decode_hex(hex)
}

/// eth_sendTransaction - Have the wallet sign and submit a transaction.
///
/// Returns the transaction hash.
pub async fn send_transaction<P: Eip1193>(
    provider: &P,
    from: &str,
    to: Address,
    value: U256,
    data: &[u8],
) -> Result<String, ProviderError> {
    let tx = json!({
        "from": from,
        "to": to.to_string(),
        "value": format!("{value:#x}"),
        "data": encode_hex(data),
    });
    let result = provider.request("eth_sendTransaction", json!([tx])).await?;
    result.as_str().map(str::to_string).ok_or_else(|| {
        ProviderError::InvalidResponse(format!("eth_sendTransaction returned {result}"))
    })
}

/// eth_getTransactionReceipt - `None` while the transaction is pending.
pub async fn transaction_receipt<P: Eip1193>(
    provider: &P,
    hash: &str,
) -> Result<Option<TransactionReceipt>, ProviderError> {
    let value = provider
        .request("eth_getTransactionReceipt", json!([hash]))
        .await?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

fn parse_accounts(value: Value) -> Result<Vec<String>, ProviderError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}
