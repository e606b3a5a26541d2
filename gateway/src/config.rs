use std::time::Duration;

use alloy_primitives::Address;
use serde::Serialize;

/// Native currency of a chain, as registered with `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters of the chain the contract lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    /// EIP-155 chain id (e.g. `11155111`).
    pub chain_id: u64,
    /// Human-readable name shown by the wallet.
    pub chain_name: String,
    /// RPC endpoints offered to the wallet when the chain is unknown to it.
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

impl ChainParams {
    /// The Sepolia test network.
    pub fn sepolia() -> Self {
        Self {
            chain_id: 11_155_111,
            chain_name: "Sepolia test network".into(),
            rpc_urls: vec![
                "https://sepolia.infura.io/v3/".into(),
                "https://rpc.sepolia.org".into(),
            ],
            native_currency: NativeCurrency {
                name: "SepoliaETH".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://sepolia.etherscan.io/".into()],
        }
    }

    /// Chain id as the `0x`-prefixed quantity wallets expect.
    pub fn hex_chain_id(&self) -> String {
        crate::chain::to_quantity(self.chain_id)
    }
}

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deployed tip jar contract.
    pub contract_address: Address,
    /// Chain the contract is deployed on; writes are refused elsewhere.
    pub chain: ChainParams,
    /// Upper bound for a single provider request (including wallet prompts).
    pub request_timeout: Duration,
    /// Upper bound for waiting on a transaction receipt.
    pub confirmation_timeout: Duration,
    /// Delay between `eth_getTransactionReceipt` polls.
    pub receipt_poll_interval: Duration,
}

impl GatewayConfig {
    pub fn new(contract_address: Address, chain: ChainParams) -> Self {
        Self {
            contract_address,
            chain,
            request_timeout: Duration::from_secs(30),
            confirmation_timeout: Duration::from_secs(300),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}
