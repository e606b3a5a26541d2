//! Observable view state for the tip jar UI.
//!
//! The whole state lives in one [`ViewState`] value published through a
//! `tokio::sync::watch` channel by the controller; renderers only read
//! snapshots of it.

use tipjar_gateway::SessionInfo;

/// Default tip amount in ether.
pub const DEFAULT_TIP_AMOUNT: &str = "0.01";

/// Contract reads, always updated as a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractView {
    /// Ether decimal string.
    pub balance: String,
    pub owner: Option<String>,
}

impl Default for ContractView {
    fn default() -> Self {
        Self {
            balance: "0".to_string(),
            owner: None,
        }
    }
}

/// The tip amount being edited plus the status of the last action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub amount: String,
    pub loading: bool,
    pub message: String,
}

impl Default for PendingAction {
    fn default() -> Self {
        Self {
            amount: DEFAULT_TIP_AMOUNT.to_string(),
            loading: false,
            message: String::new(),
        }
    }
}

/// Coarse interaction state derived from [`ViewState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No account known.
    Idle,
    /// An account is known and no action is running.
    Connected,
    /// An action is in flight; further actions are refused.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub session: SessionInfo,
    pub contract: ContractView,
    pub pending: PendingAction,
    /// Chain the contract is deployed on.
    pub expected_chain_id: u64,
}

impl ViewState {
    pub fn new(expected_chain_id: u64, amount: &str) -> Self {
        Self {
            session: SessionInfo::default(),
            contract: ContractView::default(),
            pending: PendingAction {
                amount: amount.to_string(),
                ..PendingAction::default()
            },
            expected_chain_id,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.pending.loading {
            Phase::Busy
        } else if self.session.account.is_some() {
            Phase::Connected
        } else {
            Phase::Idle
        }
    }

    /// Whether the connected account owns the contract. Only decides what the
    /// UI offers; the contract enforces ownership on withdraw.
    pub fn is_owner(&self) -> bool {
        is_owner(
            self.session.account.as_deref(),
            self.contract.owner.as_deref(),
        )
    }

    /// A chain is known and it is not the contract's chain.
    pub fn needs_network_switch(&self) -> bool {
        matches!(self.session.chain_id, Some(id) if id != self.expected_chain_id)
    }
}

/// Case-insensitive address comparison; false when either side is unknown.
pub fn is_owner(account: Option<&str>, owner: Option<&str>) -> bool {
    match (account, owner) {
        (Some(account), Some(owner)) => account.eq_ignore_ascii_case(owner),
        _ => false,
    }
}
