use clap::{Args, Parser, Subcommand};

use crate::state::DEFAULT_TIP_AMOUNT;

/// tipjar: tip an on-chain jar through your wallet.
///
/// Logs are written to stderr; redirect them (`2>tipjar.log`) when running
/// the `ui` subcommand.
#[derive(Parser, Debug)]
#[command(name = "tipjar", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub gateway: GatewayArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Wallet and contract settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GatewayArgs {
    /// EIP-1193 wallet JSON-RPC endpoint (e.g. Frame on http://127.0.0.1:1248)
    #[arg(long, env = "TIPJAR_WALLET_URL", global = true)]
    pub wallet_url: Option<String>,

    /// Deployed tip jar contract address
    #[arg(long, env = "TIPJAR_CONTRACT", global = true)]
    pub contract: Option<String>,

    /// Timeout for a single wallet request in seconds
    #[arg(long, default_value = "30", global = true)]
    pub request_timeout_secs: u64,

    /// Timeout for a transaction to be mined in seconds
    #[arg(long, default_value = "300", global = true)]
    pub confirmation_timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print wallet session and contract state
    Status(OutputArgs),

    /// Request account access from the wallet
    Connect(OutputArgs),

    /// Switch the wallet to the contract's network, adding it if unknown
    SwitchNetwork(OutputArgs),

    /// Send a tip to the contract
    Tip(TipArgs),

    /// Withdraw all tips (contract owner only)
    Withdraw(OutputArgs),

    /// Launch the interactive tip jar TUI
    Ui(UiArgs),
}

/// Output format for one-shot subcommands.
#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Output as JSON instead of TSV
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `tip` subcommand.
#[derive(Args, Debug)]
pub struct TipArgs {
    /// Amount in ether (e.g. 0.01)
    pub amount: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the `ui` subcommand.
#[derive(Args, Debug)]
pub struct UiArgs {
    /// Initial tip amount in ether
    #[arg(long, default_value = DEFAULT_TIP_AMOUNT)]
    pub amount: String,

    /// Seconds between background refreshes (0 disables)
    #[arg(long, default_value = "15")]
    pub refresh_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tip() {
        let cli = Cli::try_parse_from([
            "tipjar",
            "--contract",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "tip",
            "0.25",
            "--json",
        ])
        .unwrap();
        let Command::Tip(args) = cli.command else {
            panic!("expected tip");
        };
        assert_eq!(args.amount, "0.25");
        assert!(args.output.json);
        assert_eq!(cli.gateway.request_timeout_secs, 30);
    }

    #[test]
    fn test_parse_ui_defaults() {
        let cli = Cli::try_parse_from(["tipjar", "ui"]).unwrap();
        let Command::Ui(args) = cli.command else {
            panic!("expected ui");
        };
        assert_eq!(args.amount, "0.01");
        assert_eq!(args.refresh_secs, 15);
    }
}
