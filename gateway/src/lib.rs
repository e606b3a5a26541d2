pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod rpc;
pub mod units;

// ---- Top-level re-exports for ergonomic usage ----

pub use config::{ChainParams, GatewayConfig, NativeCurrency};
pub use contract::TipJarContract;
pub use error::{GatewayError, ProviderError, Result};
pub use gateway::{Gateway, SessionInfo};
pub use rpc::{detect_provider, Eip1193, HttpProvider};
pub use units::{format_ether, parse_ether};

pub use alloy_primitives::{Address, U256};
