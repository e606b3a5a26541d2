use std::io::Write;

use serde::Serialize;

use crate::error::AppError;
use crate::state::ViewState;

/// One printed status record.
#[derive(Debug, Serialize)]
struct StatusRecord<'a> {
    account: Option<&'a str>,
    chain_id: Option<u64>,
    chain_name: Option<&'a str>,
    wrong_network: bool,
    balance: &'a str,
    owner: Option<&'a str>,
    is_owner: bool,
    message: &'a str,
}

impl<'a> From<&'a ViewState> for StatusRecord<'a> {
    fn from(view: &'a ViewState) -> Self {
        Self {
            account: view.session.account.as_deref(),
            chain_id: view.session.chain_id,
            chain_name: view.session.chain_name.as_deref(),
            wrong_network: view.needs_network_switch(),
            balance: &view.contract.balance,
            owner: view.contract.owner.as_deref(),
            is_owner: view.is_owner(),
            message: &view.pending.message,
        }
    }
}

/// Write `view` as one line: a JSON object, or TSV in the column order
/// account, chain_id, chain_name, balance, owner, is_owner, message.
/// Unknown values print as `-` in TSV.
pub fn write_status<W: Write>(view: &ViewState, json_mode: bool, writer: &mut W) -> Result<(), AppError> {
    let record = StatusRecord::from(view);

    if json_mode {
        serde_json::to_writer(&mut *writer, &record)?;
    } else {
        let chain_id = record.chain_id.map(|id| id.to_string());
        let columns = [
            record.account.unwrap_or("-"),
            chain_id.as_deref().unwrap_or("-"),
            record.chain_name.unwrap_or("-"),
            record.balance,
            record.owner.unwrap_or("-"),
            if record.is_owner { "owner" } else { "-" },
            record.message,
        ];
        // Tabs and newlines in wallet messages would break the columns.
        let line = columns
            .iter()
            .map(|c| c.replace(['\t', '\n'], " "))
            .collect::<Vec<_>>()
            .join("\t");
        writer.write_all(line.as_bytes())?;
    }

    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
