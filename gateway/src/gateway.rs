use std::future::Future;
use std::time::Duration;

use alloy_primitives::U256;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::chain_name;
use crate::config::{ChainParams, GatewayConfig};
use crate::contract::TipJarContract;
use crate::error::{GatewayError, ProviderError, Result};
use crate::rpc::methods::{self, UNRECOGNIZED_CHAIN, USER_REJECTED};
use crate::rpc::Eip1193;
use crate::units::{format_ether, parse_ether};

/// Best-effort snapshot of the wallet session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    pub chain_name: Option<String>,
}

/// Wallet/chain gateway for the tip jar contract.
///
/// Every provider call is bounded by a timeout and aborted when the
/// cancellation token fires. Holding no provider is a valid state: reads and
/// writes then fail with [`GatewayError::NoProvider`] and
/// [`Gateway::session_info`] returns an empty session.
#[derive(Debug)]
pub struct Gateway<P> {
    provider: Option<P>,
    config: GatewayConfig,
    contract: TipJarContract,
    cancel: CancellationToken,
}

impl<P: Eip1193> Gateway<P> {
    pub fn new(config: GatewayConfig, provider: Option<P>) -> Self {
        let contract = TipJarContract::new(config.contract_address);
        Self {
            provider,
            config,
            contract,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight calls when `cancel` is triggered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&P> {
        self.provider.as_ref().ok_or(GatewayError::NoProvider)
    }

    // --- Session ---

    /// Request account access; returns the first authorized account.
    pub async fn connect(&self) -> Result<String> {
        let provider = self.provider()?;
        let accounts = self
            .guarded(
                "eth_requestAccounts",
                self.config.request_timeout,
                methods::request_accounts(provider),
            )
            .await?;
        let account = accounts.into_iter().next().ok_or(GatewayError::NoAccounts)?;
        info!(account = %account, "wallet connected");
        Ok(account)
    }

    /// Read the current account and network without prompting.
    ///
    /// Never fails: anything that cannot be read is left `None` and logged.
    pub async fn session_info(&self) -> SessionInfo {
        let Some(provider) = self.provider.as_ref() else {
            debug!("no wallet provider, session is empty");
            return SessionInfo::default();
        };

        let timeout = self.config.request_timeout;
        let (accounts, chain_id) = tokio::join!(
            self.guarded("eth_accounts", timeout, methods::accounts(provider)),
            self.guarded("eth_chainId", timeout, methods::chain_id(provider)),
        );

        let account = match accounts {
            Ok(accounts) => accounts.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "session account read failed");
                None
            }
        };
        let chain_id = match chain_id {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "session chain read failed");
                None
            }
        };

        SessionInfo {
            account,
            chain_id,
            chain_name: chain_id.map(|id| chain_name(id).to_string()),
        }
    }

    // --- Network ---

    /// Ask the wallet to select `target`, registering the chain first if the
    /// wallet reports it as unrecognized.
    pub async fn switch_network(&self, target: &ChainParams) -> Result<()> {
        let provider = self.provider()?;
        let timeout = self.config.request_timeout;

        let switched = self
            .guarded(
                "wallet_switchEthereumChain",
                timeout,
                methods::switch_chain(provider, target.chain_id),
            )
            .await;

        match switched {
            Ok(()) => {
                info!(chain_id = target.chain_id, "network switched");
                Ok(())
            }
            Err(GatewayError::Provider(e)) if e.code() == Some(UNRECOGNIZED_CHAIN) => {
                info!(
                    chain_id = target.chain_id,
                    chain = %target.chain_name,
                    "wallet does not know chain, adding it"
                );
                self.guarded(
                    "wallet_addEthereumChain",
                    timeout,
                    methods::add_chain(provider, target),
                )
                .await
                .map_err(|e| match e {
                    GatewayError::Provider(inner) => GatewayError::NetworkSwitch(format!(
                        "could not add {}: {}",
                        target.chain_name,
                        describe(&inner)
                    )),
                    other => other,
                })?;
                info!(chain_id = target.chain_id, "network added");
                Ok(())
            }
            Err(GatewayError::Provider(e)) => Err(GatewayError::NetworkSwitch(format!(
                "could not switch to {}: {}",
                target.chain_name,
                describe(&e)
            ))),
            Err(other) => Err(other),
        }
    }

    /// Fail with [`GatewayError::WrongNetwork`] unless the wallet is on
    /// `expected_chain_id`.
    pub async fn ensure_network(&self, expected_chain_id: u64) -> Result<()> {
        let provider = self.provider()?;
        let actual = self
            .guarded(
                "eth_chainId",
                self.config.request_timeout,
                methods::chain_id(provider),
            )
            .await?;
        if actual != expected_chain_id {
            return Err(GatewayError::WrongNetwork {
                expected: expected_chain_id,
                actual,
                name: chain_name(expected_chain_id).to_string(),
            });
        }
        Ok(())
    }

    // --- Reads ---

    /// Contract balance in wei.
    pub async fn read_balance_wei(&self) -> Result<U256> {
        let provider = self.provider()?;
        let data = self
            .guarded(
                "getBalance",
                self.config.request_timeout,
                methods::call(
                    provider,
                    self.contract.address(),
                    &self.contract.get_balance_calldata(),
                ),
            )
            .await?;
        Ok(self.contract.decode_balance(&data)?)
    }

    /// Contract balance as an ether decimal string.
    pub async fn read_balance(&self) -> Result<String> {
        let wei = self.read_balance_wei().await?;
        let balance = format_ether(wei);
        debug!(%balance, "balance read");
        Ok(balance)
    }

    /// Contract owner as a checksummed address.
    pub async fn read_owner(&self) -> Result<String> {
        let provider = self.provider()?;
        let data = self
            .guarded(
                "owner",
                self.config.request_timeout,
                methods::call(
                    provider,
                    self.contract.address(),
                    &self.contract.owner_calldata(),
                ),
            )
            .await?;
        let owner = self.contract.decode_owner(&data)?.to_string();
        debug!(%owner, "owner read");
        Ok(owner)
    }

    // --- Writes ---

    /// Send `amount` ether to the contract's `tip()`; returns the confirmed
    /// transaction hash.
    pub async fn send_tip(&self, amount: &str) -> Result<String> {
        let value = parse_ether(amount)?;
        let data = self.contract.tip_calldata();
        self.submit("tip", value, &data).await
    }

    /// Call `withdrawTips()`; returns the confirmed transaction hash.
    ///
    /// Ownership is not checked here. The contract rejects non-owners and the
    /// rejection surfaces as [`GatewayError::Transaction`].
    pub async fn withdraw(&self) -> Result<String> {
        let data = self.contract.withdraw_calldata();
        self.submit("withdrawTips", U256::ZERO, &data).await
    }

    async fn submit(&self, call: &'static str, value: U256, data: &[u8]) -> Result<String> {
        let provider = self.provider()?;
        let result = async {
            self.ensure_network(self.config.chain.chain_id).await?;
            let from = self.signer(provider).await?;

            let hash = self
                .guarded(
                    "eth_sendTransaction",
                    self.config.request_timeout,
                    methods::send_transaction(provider, &from, self.contract.address(), value, data),
                )
                .await?;
            info!(call, tx = %hash, from = %from, value = %format_ether(value), "transaction submitted");

            self.wait_for_receipt(provider, &hash).await
        }
        .await;

        result.map_err(|e| match e {
            GatewayError::Provider(inner) => GatewayError::Transaction(inner),
            other => other,
        })
    }

    /// Account that signs writes: an already-authorized account, otherwise
    /// whatever the wallet authorizes on request.
    async fn signer(&self, provider: &P) -> Result<String> {
        let timeout = self.config.request_timeout;
        let mut accounts = self
            .guarded("eth_accounts", timeout, methods::accounts(provider))
            .await?;
        if accounts.is_empty() {
            accounts = self
                .guarded(
                    "eth_requestAccounts",
                    timeout,
                    methods::request_accounts(provider),
                )
                .await?;
        }
        accounts.into_iter().next().ok_or(GatewayError::NoAccounts)
    }

    async fn wait_for_receipt(&self, provider: &P, hash: &str) -> Result<String> {
        let poll = self.config.receipt_poll_interval;
        let receipt = self
            .guarded(
                "transaction confirmation",
                self.config.confirmation_timeout,
                async {
                    loop {
                        if let Some(receipt) = methods::transaction_receipt(provider, hash).await? {
                            return Ok::<_, ProviderError>(receipt);
                        }
                        debug!(tx = hash, "receipt pending");
                        tokio::time::sleep(poll).await;
                    }
                },
            )
            .await?;

        if !receipt.succeeded() {
            warn!(tx = hash, "transaction reverted");
            return Err(GatewayError::Transaction(ProviderError::Reverted(
                hash.to_string(),
            )));
        }

        info!(tx = hash, block = ?receipt.block_number, "transaction confirmed");
        if receipt.transaction_hash.is_empty() {
            Ok(hash.to_string())
        } else {
            Ok(receipt.transaction_hash)
        }
    }

    /// Run `fut` under `limit`, aborting early when the gateway is cancelled.
    async fn guarded<T, E, F>(&self, operation: &'static str, limit: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<GatewayError>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(operation, "gateway call cancelled");
                Err(GatewayError::Cancelled(operation))
            }
            res = tokio::time::timeout(limit, fut) => match res {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => {
                    warn!(operation, timeout_ms = limit.as_millis() as u64, "gateway call timed out");
                    Err(GatewayError::Timeout { operation, after: limit })
                }
            },
        }
    }
}

fn describe(e: &ProviderError) -> String {
    if e.code() == Some(USER_REJECTED) {
        "request rejected in wallet".to_string()
    } else {
        e.to_string()
    }
}
