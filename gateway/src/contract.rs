//! Tip jar contract binding.
//!
//! ABI encoding is generated by `alloy_sol_types::sol!`; this module only
//! pairs the generated calls with the deployed address.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};

use crate::error::ProviderError;

sol! {
    interface ITipJar {
        function getBalance() external view returns (uint256);
        function owner() external view returns (address);
        function tip() external payable;
        function withdrawTips() external;
    }
}

/// Calldata builder and return decoder for a deployed tip jar.
#[derive(Debug, Clone, Copy)]
pub struct TipJarContract {
    address: Address,
}

impl TipJarContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn get_balance_calldata(&self) -> Vec<u8> {
        ITipJar::getBalanceCall {}.abi_encode()
    }

    pub fn owner_calldata(&self) -> Vec<u8> {
        ITipJar::ownerCall {}.abi_encode()
    }

    pub fn tip_calldata(&self) -> Vec<u8> {
        ITipJar::tipCall {}.abi_encode()
    }

    pub fn withdraw_calldata(&self) -> Vec<u8> {
        ITipJar::withdrawTipsCall {}.abi_encode()
    }

    /// Decode the `uint256` returned by `getBalance()`.
    pub fn decode_balance(&self, data: &[u8]) -> Result<U256, ProviderError> {
        ITipJar::getBalanceCall::abi_decode_returns(data, true)
            .map(|r| r._0)
            .map_err(|e| ProviderError::InvalidResponse(format!("getBalance(): {e}")))
    }

    /// Decode the `address` returned by `owner()`.
    pub fn decode_owner(&self, data: &[u8]) -> Result<Address, ProviderError> {
        ITipJar::ownerCall::abi_decode_returns(data, true)
            .map(|r| r._0)
            .map_err(|e| ProviderError::InvalidResponse(format!("owner(): {e}")))
    }
}
