//! Gateway factory: turns command-line settings into a ready [`Gateway`].

use std::time::Duration;

use tipjar_gateway::{detect_provider, Address, ChainParams, Gateway, GatewayConfig, HttpProvider};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::GatewayArgs;
use crate::error::AppError;

/// Chain the tip jar is deployed on.
pub fn deployment_chain() -> ChainParams {
    ChainParams::sepolia()
}

/// Build the gateway configuration from CLI/env settings.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the contract address is missing or
/// malformed, or a timeout is zero.
pub fn gateway_config(args: &GatewayArgs) -> Result<GatewayConfig, AppError> {
    let raw = args
        .contract
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            AppError::Config("contract address required (--contract or TIPJAR_CONTRACT)".into())
        })?;
    let address: Address = raw
        .parse()
        .map_err(|e| AppError::Config(format!("invalid contract address {raw:?}: {e}")))?;

    if args.request_timeout_secs == 0 || args.confirmation_timeout_secs == 0 {
        return Err(AppError::Config("timeouts must be at least one second".into()));
    }

    let mut config = GatewayConfig::new(address, deployment_chain());
    config.request_timeout = Duration::from_secs(args.request_timeout_secs);
    config.confirmation_timeout = Duration::from_secs(args.confirmation_timeout_secs);
    Ok(config)
}

/// Create the gateway, attaching whatever wallet the environment provides.
///
/// A missing wallet is not an error here; actions report it when triggered.
pub fn create_gateway(
    args: &GatewayArgs,
    cancel: CancellationToken,
) -> Result<Gateway<HttpProvider>, AppError> {
    let config = gateway_config(args)?;
    let provider = detect_provider(args.wallet_url.as_deref());
    match &provider {
        Some(p) => info!(wallet = p.url(), contract = %config.contract_address, "wallet found"),
        None => warn!("no wallet configured"),
    }
    Ok(Gateway::new(config, provider).with_cancellation(cancel))
}
