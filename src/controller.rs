//! Tip jar controller: runs user actions against the gateway and publishes
//! the resulting [`ViewState`].
//!
//! Every action follows the same shape: refuse if another action is in
//! flight, mark the state busy, run the operation, refresh session and
//! contract reads on success, then publish a status message and leave the
//! busy state whatever happened.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tipjar_gateway::{Eip1193, Gateway, GatewayError, SessionInfo};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::state::ViewState;

/// User-triggered operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    SwitchNetwork,
    SendTip,
    Withdraw,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Connect => "connect",
            Action::SwitchNetwork => "switch-network",
            Action::SendTip => "tip",
            Action::Withdraw => "withdraw",
        }
    }

    /// Shown when a failure carries no usable text.
    fn fallback_message(self) -> &'static str {
        match self {
            Action::Connect => "Wallet connection failed.",
            Action::SwitchNetwork => "Network switch failed.",
            Action::SendTip => "Sending tip failed.",
            Action::Withdraw => "Withdrawal failed.",
        }
    }

    fn success_message(self, detail: &str) -> String {
        match self {
            Action::Connect => "Wallet connected.".to_string(),
            Action::SwitchNetwork => format!("Switched to {detail}."),
            Action::SendTip => format!("Tip sent: {detail}"),
            Action::Withdraw => format!("Withdrawal complete: {detail}"),
        }
    }
}

/// How a triggered action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed,
    /// Another action was already in flight; nothing was done.
    Rejected,
}

pub struct TipJar<P> {
    gateway: Gateway<P>,
    state: watch::Sender<ViewState>,
    /// Bumped each time an action enters the busy state.
    actions_started: AtomicU64,
}

/// Result of one round of session and contract reads.
struct Reads {
    session: SessionInfo,
    /// Balance and owner, present only when both reads succeeded.
    contract: Option<(String, String)>,
}

impl Reads {
    fn apply(self, view: &mut ViewState) {
        view.session = self.session;
        if let Some((balance, owner)) = self.contract {
            view.contract.balance = balance;
            view.contract.owner = Some(owner);
        }
    }
}

impl<P: Eip1193> TipJar<P> {
    pub fn new(gateway: Gateway<P>, amount: &str) -> Self {
        let view = ViewState::new(gateway.config().chain.chain_id, amount);
        let (state, _) = watch::channel(view);
        Self {
            gateway,
            state,
            actions_started: AtomicU64::new(0),
        }
    }

    pub fn gateway(&self) -> &Gateway<P> {
        &self.gateway
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Edit the tip amount in place.
    pub fn edit_amount(&self, edit: impl FnOnce(&mut String)) {
        self.state.send_modify(|s| edit(&mut s.pending.amount));
    }

    /// Re-read session and contract state.
    ///
    /// Never fails. The session is replaced with whatever the wallet reports;
    /// balance and owner are only replaced when both reads succeed.
    pub async fn refresh(&self) {
        let reads = self.read_all().await;
        self.state.send_modify(|s| reads.apply(s));
    }

    /// Background refresh. Skipped while an action is in flight, and its
    /// reads are discarded if an action starts before they complete, so a
    /// stale read never overwrites what the action published.
    ///
    /// Returns whether the reads were applied.
    pub async fn refresh_if_idle(&self) -> bool {
        let started = self.actions_started.load(Ordering::SeqCst);
        if self.state.borrow().pending.loading {
            debug!("action in flight, skipping background refresh");
            return false;
        }

        let reads = self.read_all().await;
        let applied = self.state.send_if_modified(|s| {
            if s.pending.loading || self.actions_started.load(Ordering::SeqCst) != started {
                return false;
            }
            reads.apply(s);
            true
        });
        if !applied {
            debug!("action started during background refresh, discarding reads");
        }
        applied
    }

    async fn read_all(&self) -> Reads {
        let session = self.gateway.session_info().await;
        let (balance, owner) =
            tokio::join!(self.gateway.read_balance(), self.gateway.read_owner());

        let contract = match (balance, owner) {
            (Ok(balance), Ok(owner)) => Some((balance, owner)),
            (balance, owner) => {
                if let Err(e) = balance {
                    warn!(error = %e, "balance refresh failed");
                }
                if let Err(e) = owner {
                    warn!(error = %e, "owner refresh failed");
                }
                None
            }
        };

        Reads { session, contract }
    }

    pub async fn trigger(&self, action: Action) -> ActionOutcome {
        match action {
            Action::Connect => self.connect().await,
            Action::SwitchNetwork => self.switch_network().await,
            Action::SendTip => self.send_tip().await,
            Action::Withdraw => self.withdraw().await,
        }
    }

    pub async fn connect(&self) -> ActionOutcome {
        self.run(Action::Connect, async {
            let account = self.gateway.connect().await?;
            self.state
                .send_modify(|s| s.session.account = Some(account.clone()));
            Ok(account)
        })
        .await
    }

    pub async fn switch_network(&self) -> ActionOutcome {
        self.run(Action::SwitchNetwork, async {
            let chain = &self.gateway.config().chain;
            self.gateway.switch_network(chain).await?;
            Ok(chain.chain_name.clone())
        })
        .await
    }

    /// Tip the amount currently held in the view state.
    pub async fn send_tip(&self) -> ActionOutcome {
        self.run(Action::SendTip, async {
            let amount = self.state.borrow().pending.amount.clone();
            self.gateway.send_tip(&amount).await
        })
        .await
    }

    pub async fn withdraw(&self) -> ActionOutcome {
        self.run(Action::Withdraw, self.gateway.withdraw()).await
    }

    async fn run<F>(&self, action: Action, op: F) -> ActionOutcome
    where
        F: Future<Output = Result<String, GatewayError>>,
    {
        let Some(mut busy) = BusyGuard::acquire(&self.state, &self.actions_started) else {
            debug!(action = action.label(), "action already in flight, ignoring");
            return ActionOutcome::Rejected;
        };
        debug!(action = action.label(), "action started");

        match op.await {
            Ok(detail) => {
                self.refresh().await;
                info!(action = action.label(), "action succeeded");
                busy.finish(action.success_message(&detail));
                ActionOutcome::Succeeded
            }
            Err(e) => {
                warn!(action = action.label(), error = %e, "action failed");
                busy.finish(failure_message(action, &e));
                ActionOutcome::Failed
            }
        }
    }
}

fn failure_message(action: Action, err: &GatewayError) -> String {
    let text = err.to_string();
    let text = text.trim();
    if text.is_empty() {
        action.fallback_message().to_string()
    } else {
        text.to_string()
    }
}

/// Holds the busy flag for one action. Dropping it clears the flag, so a
/// dropped or panicking action cannot leave the state stuck in busy.
struct BusyGuard<'a> {
    state: &'a watch::Sender<ViewState>,
    message: Option<String>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(state: &'a watch::Sender<ViewState>, started: &AtomicU64) -> Option<Self> {
        let acquired = state.send_if_modified(|s| {
            if s.pending.loading {
                return false;
            }
            started.fetch_add(1, Ordering::SeqCst);
            s.pending.loading = true;
            s.pending.message.clear();
            true
        });
        acquired.then(|| Self {
            state,
            message: None,
        })
    }

    fn finish(&mut self, message: String) {
        self.message = Some(message);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let message = self.message.take();
        self.state.send_modify(|s| {
            s.pending.loading = false;
            if let Some(message) = message {
                s.pending.message = message;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{json, Value};
    use tipjar_gateway::rpc::encode_hex;
    use tipjar_gateway::{
        Address, ChainParams, GatewayConfig, ProviderError, TipJarContract, U256,
    };
    use tokio::sync::Notify;

    use super::*;
    use crate::state::Phase;

    const SEPOLIA: u64 = 11_155_111;
    const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const VISITOR: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const ONE_ETHER: u64 = 1_000_000_000_000_000_000;

    /// In-memory wallet plus chain holding one tip jar contract.
    struct FakeWallet {
        chain: Mutex<FakeChain>,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    struct FakeChain {
        accounts: Vec<String>,
        authorized: bool,
        chain_id: u64,
        known_chains: Vec<u64>,
        balance: U256,
        owner: Address,
        tx_count: u64,
        /// Forced error responses keyed by method name (or "owner").
        failures: HashMap<&'static str, (i64, String)>,
        calls: Vec<String>,
    }

    impl FakeWallet {
        fn new(account: &str, chain_id: u64) -> Self {
            Self {
                chain: Mutex::new(FakeChain {
                    accounts: vec![account.to_string()],
                    authorized: false,
                    chain_id,
                    known_chains: vec![1, chain_id],
                    balance: U256::from(ONE_ETHER),
                    owner: OWNER.parse().unwrap(),
                    tx_count: 0,
                    failures: HashMap::new(),
                    calls: Vec::new(),
                }),
                gate: Mutex::new(None),
            }
        }

        fn fail(self, method: &'static str, code: i64, message: &str) -> Self {
            self.chain
                .lock()
                .unwrap()
                .failures
                .insert(method, (code, message.to_string()));
            self
        }

        /// Hold the next request until the returned handle is notified.
        fn gated(self) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
            (self, gate)
        }

        fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
            let mut chain = self.chain.lock().unwrap();
            chain.calls.push(method.to_string());
            if let Some((code, message)) = chain.failures.get(method) {
                return Err(ProviderError::Rpc {
                    code: *code,
                    message: message.clone(),
                });
            }

            let contract = TipJarContract::new(CONTRACT.parse().unwrap());
            match method {
                "eth_requestAccounts" => {
                    chain.authorized = true;
                    Ok(json!(chain.accounts))
                }
                "eth_accounts" if chain.authorized => Ok(json!(chain.accounts)),
                "eth_accounts" => Ok(json!([])),
                "eth_chainId" => Ok(json!(format!("{:#x}", chain.chain_id))),
                "wallet_switchEthereumChain" | "wallet_addEthereumChain" => {
                    let requested = params[0]["chainId"].as_str().unwrap();
                    let id = u64::from_str_radix(requested.trim_start_matches("0x"), 16).unwrap();
                    if method == "wallet_addEthereumChain" {
                        chain.known_chains.push(id);
                    } else if !chain.known_chains.contains(&id) {
                        return Err(ProviderError::Rpc {
                            code: 4902,
                            message: "Unrecognized chain ID".to_string(),
                        });
                    }
                    chain.chain_id = id;
                    Ok(Value::Null)
                }
                "eth_call" => {
                    let data = params[0]["data"].as_str().unwrap();
                    let word = if data == encode_hex(&contract.get_balance_calldata()) {
                        chain.balance.to_be_bytes::<32>()
                    } else {
                        if let Some((code, message)) = chain.failures.get("owner") {
                            return Err(ProviderError::Rpc {
                                code: *code,
                                message: message.clone(),
                            });
                        }
                        let mut word = [0u8; 32];
                        word[12..].copy_from_slice(chain.owner.as_slice());
                        word
                    };
                    Ok(json!(encode_hex(&word)))
                }
                "eth_sendTransaction" => {
                    let tx = &params[0];
                    let from: Address = tx["from"].as_str().unwrap().parse().unwrap();
                    let data = tx["data"].as_str().unwrap();
                    if data == encode_hex(&contract.withdraw_calldata()) {
                        if from != chain.owner {
                            return Err(ProviderError::Rpc {
                                code: -32000,
                                message: "execution reverted: caller is not the owner"
                                    .to_string(),
                            });
                        }
                        chain.balance = U256::ZERO;
                    } else {
                        let value = tx["value"].as_str().unwrap();
                        chain.balance +=
                            U256::from_str_radix(value.trim_start_matches("0x"), 16).unwrap();
                    }
                    chain.tx_count += 1;
                    Ok(json!(format!("0x{:064x}", chain.tx_count)))
                }
                "eth_getTransactionReceipt" => Ok(json!({
                    "transactionHash": params[0],
                    "blockNumber": "0x1",
                    "status": "0x1"
                })),
                other => panic!("unexpected method {other}"),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.chain.lock().unwrap().calls.clone()
        }
    }

    impl Eip1193 for FakeWallet {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.handle(method, &params)
        }
    }

    /// Handle to a wallet the test keeps inspecting after the gateway owns it.
    struct SharedWallet(Arc<FakeWallet>);

    impl Eip1193 for SharedWallet {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
            self.0.request(method, params).await
        }
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::new(CONTRACT.parse().unwrap(), ChainParams::sepolia());
        config.request_timeout = Duration::from_secs(2);
        config.confirmation_timeout = Duration::from_secs(2);
        config.receipt_poll_interval = Duration::from_millis(10);
        config
    }

    fn tip_jar(wallet: FakeWallet) -> (TipJar<SharedWallet>, Arc<FakeWallet>) {
        let wallet = Arc::new(wallet);
        let gateway = Gateway::new(config(), Some(SharedWallet(Arc::clone(&wallet))));
        (TipJar::new(gateway, "0.01"), wallet)
    }

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let gateway: Gateway<FakeWallet> = Gateway::new(config(), None);
        let jar = TipJar::new(gateway, "0.01");

        assert_eq!(jar.connect().await, ActionOutcome::Failed);

        let view = jar.snapshot();
        assert!(view.pending.message.contains("no wallet detected"));
        assert!(!view.pending.loading);
        assert_eq!(view.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_connect_refreshes_state() {
        let (jar, _) = tip_jar(FakeWallet::new(OWNER, SEPOLIA));

        assert_eq!(jar.connect().await, ActionOutcome::Succeeded);

        let view = jar.snapshot();
        assert_eq!(view.session.account.as_deref(), Some(OWNER));
        assert_eq!(view.session.chain_id, Some(SEPOLIA));
        assert_eq!(view.contract.balance, "1.0");
        assert_eq!(view.contract.owner.as_deref(), Some(OWNER));
        assert!(view.is_owner());
        assert_eq!(view.pending.message, "Wallet connected.");
        assert_eq!(view.phase(), Phase::Connected);
    }

    #[tokio::test]
    async fn test_empty_error_uses_fallback_message() {
        let (jar, _) =
            tip_jar(FakeWallet::new(OWNER, SEPOLIA).fail("eth_requestAccounts", 4001, ""));

        assert_eq!(jar.connect().await, ActionOutcome::Failed);
        assert_eq!(jar.snapshot().pending.message, "Wallet connection failed.");
    }

    #[tokio::test]
    async fn test_tip_increases_balance() {
        let (jar, _) = tip_jar(FakeWallet::new(VISITOR, SEPOLIA));
        jar.connect().await;
        jar.edit_amount(|amount| *amount = "0.5".to_string());

        assert_eq!(jar.send_tip().await, ActionOutcome::Succeeded);

        let view = jar.snapshot();
        assert_eq!(view.contract.balance, "1.5");
        assert!(view.pending.message.starts_with("Tip sent: 0x"));
        assert!(!view.is_owner());
    }

    #[tokio::test]
    async fn test_tip_invalid_amount() {
        let (jar, wallet) = tip_jar(FakeWallet::new(VISITOR, SEPOLIA));
        jar.connect().await;
        jar.edit_amount(|amount| amount.push_str("abc"));

        assert_eq!(jar.send_tip().await, ActionOutcome::Failed);

        assert!(jar.snapshot().pending.message.contains("0.01abc"));
        assert!(!wallet.calls().iter().any(|m| m == "eth_sendTransaction"));
    }

    #[tokio::test]
    async fn test_tip_refused_on_wrong_network() {
        let (jar, wallet) = tip_jar(FakeWallet::new(VISITOR, 1));
        jar.connect().await;
        assert!(jar.snapshot().needs_network_switch());

        assert_eq!(jar.send_tip().await, ActionOutcome::Failed);

        let view = jar.snapshot();
        assert!(view.pending.message.contains("wrong network"));
        assert_eq!(view.contract.balance, "1.0");
        assert!(!wallet.calls().iter().any(|m| m == "eth_sendTransaction"));
    }

    #[tokio::test]
    async fn test_switch_network_adds_unknown_chain() {
        let wallet = FakeWallet::new(VISITOR, 1);
        wallet.chain.lock().unwrap().known_chains = vec![1];
        let (jar, wallet) = tip_jar(wallet);
        jar.connect().await;

        assert_eq!(jar.switch_network().await, ActionOutcome::Succeeded);

        let view = jar.snapshot();
        assert_eq!(view.session.chain_id, Some(SEPOLIA));
        assert!(!view.needs_network_switch());
        assert_eq!(view.pending.message, "Switched to Sepolia test network.");
        assert!(wallet.calls().iter().any(|m| m == "wallet_addEthereumChain"));
    }

    #[tokio::test]
    async fn test_withdraw_as_owner_empties_jar() {
        let (jar, _) = tip_jar(FakeWallet::new(OWNER, SEPOLIA));
        jar.connect().await;

        assert_eq!(jar.withdraw().await, ActionOutcome::Succeeded);

        let view = jar.snapshot();
        assert_eq!(view.contract.balance, "0.0");
        assert!(view.pending.message.starts_with("Withdrawal complete: 0x"));
    }

    #[tokio::test]
    async fn test_withdraw_as_visitor_is_rejected_by_contract() {
        let (jar, _) = tip_jar(FakeWallet::new(VISITOR, SEPOLIA));
        jar.connect().await;

        assert_eq!(jar.withdraw().await, ActionOutcome::Failed);

        let view = jar.snapshot();
        assert_eq!(
            view.pending.message,
            "transaction failed: execution reverted: caller is not the owner"
        );
        assert_eq!(view.contract.balance, "1.0");
        assert!(!view.pending.loading);
    }

    #[tokio::test]
    async fn test_second_action_rejected_while_busy() {
        let (wallet, gate) = FakeWallet::new(OWNER, SEPOLIA).gated();
        let (jar, _) = tip_jar(wallet);
        let mut rx = jar.subscribe();

        let (first, second) = tokio::join!(jar.connect(), async {
            rx.wait_for(|s| s.pending.loading).await.unwrap();
            let outcome = jar.send_tip().await;
            gate.notify_one();
            outcome
        });

        assert_eq!(second, ActionOutcome::Rejected);
        assert_eq!(first, ActionOutcome::Succeeded);
        let view = jar.snapshot();
        assert_eq!(view.pending.message, "Wallet connected.");
        assert!(!view.pending.loading);
    }

    #[tokio::test]
    async fn test_refresh_keeps_contract_reads_paired() {
        let (jar, _) = tip_jar(
            FakeWallet::new(OWNER, SEPOLIA).fail("owner", -32000, "execution reverted"),
        );

        jar.refresh().await;

        let view = jar.snapshot();
        assert_eq!(view.session.chain_id, Some(SEPOLIA));
        assert_eq!(view.contract.balance, "0");
        assert_eq!(view.contract.owner, None);
    }

    #[tokio::test]
    async fn test_background_refresh_applies_when_idle() {
        let (jar, _) = tip_jar(FakeWallet::new(OWNER, SEPOLIA));

        assert!(jar.refresh_if_idle().await);

        let view = jar.snapshot();
        assert_eq!(view.session.chain_id, Some(SEPOLIA));
        assert_eq!(view.contract.balance, "1.0");
    }

    #[tokio::test]
    async fn test_background_refresh_skipped_while_busy() {
        let (wallet, gate) = FakeWallet::new(OWNER, SEPOLIA).gated();
        let (jar, wallet) = tip_jar(wallet);
        let mut rx = jar.subscribe();

        let (connected, applied) = tokio::join!(jar.connect(), async {
            rx.wait_for(|s| s.pending.loading).await.unwrap();
            let calls_before = wallet.calls().len();
            let applied = jar.refresh_if_idle().await;
            assert_eq!(wallet.calls().len(), calls_before);
            gate.notify_one();
            applied
        });

        assert!(!applied);
        assert_eq!(connected, ActionOutcome::Succeeded);
        assert_eq!(jar.snapshot().pending.message, "Wallet connected.");
    }

    #[tokio::test]
    async fn test_background_refresh_discarded_when_action_starts() {
        let (wallet, gate) = FakeWallet::new(VISITOR, SEPOLIA).gated();
        let (jar, _) = tip_jar(wallet);

        // The background refresh parks on its first wallet request; the tip
        // then runs to completion before the refresh is released.
        let (applied, tipped) = tokio::join!(jar.refresh_if_idle(), async {
            let outcome = jar.send_tip().await;
            gate.notify_one();
            outcome
        });

        assert_eq!(tipped, ActionOutcome::Succeeded);
        assert!(!applied);
        let view = jar.snapshot();
        assert_eq!(view.contract.balance, "1.01");
        assert!(view.pending.message.starts_with("Tip sent: 0x"));
        assert_eq!(view.session.account.as_deref(), Some(VISITOR));
    }

    #[tokio::test]
    async fn test_refresh_without_wallet_is_quiet() {
        let gateway: Gateway<FakeWallet> = Gateway::new(config(), None);
        let jar = TipJar::new(gateway, "0.01");

        jar.refresh().await;

        let view = jar.snapshot();
        assert_eq!(view.session, Default::default());
        assert_eq!(view.contract.balance, "0");
        assert!(view.pending.message.is_empty());
    }
}
