use anyhow::{anyhow, ensure};
use solana_address_lookup_table_interface::state::AddressLookupTable;
use solana_program::message::AddressLookupTableAccount;
use solana_pubkey::Pubkey;
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    request::{RpcError, RpcResponseErrorData},
    response::RpcSimulateTransactionResult,
};

pub fn find_failed_instruction(err: &ClientError) -> Option<usize> {
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError { message, .. }) = &err.kind {
        if let Some(s) =
            message.strip_prefix("Transaction simulation failed: Error processing Instruction ")
        {
            let index = s
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>();
            index.parse().ok()
        } else {
            None
        }
    } else {
        None
    }
}

/// Logs of a failed preflight simulation.
pub fn preflight_logs(err: &ClientError) -> Option<&[String]> {
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError {
        data:
            RpcResponseErrorData::SendTransactionPreflightFailure(RpcSimulateTransactionResult {
                logs: Some(logs),
                ..
            }),
        ..
    }) = &err.kind
    {
        Some(logs)
    } else {
        None
    }
}

pub fn verbose_solana_error(err: &ClientError) -> String {
    use std::fmt::Write;
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) = &err.kind
    {
        let mut s = String::new();
        writeln!(s, "{} ({})", message, code).ok();
        for (i, log) in preflight_logs(err).unwrap_or_default().iter().enumerate() {
            writeln!(s, "{}: {}", i + 1, log).ok();
        }
        s
    } else {
        err.to_string()
    }
}

/// Message of the last program error in `logs`, anchor errors first.
pub fn program_error_message(logs: &[String]) -> Option<String> {
    logs.iter().rev().find_map(|log| {
        let log = log.strip_prefix("Program log: ")?;
        if let Some((_, message)) = log.split_once("Error Message: ") {
            Some(message.trim_end_matches('.').to_owned())
        } else {
            log.strip_prefix("Error: ").map(str::to_owned)
        }
    })
}

pub fn decode_lookup_table(
    address: &Pubkey,
    data: &[u8],
) -> Result<AddressLookupTableAccount, anyhow::Error> {
    let table = AddressLookupTable::deserialize(data).map_err(|error| anyhow!("{}", error))?;
    ensure!(!table.addresses.is_empty(), "lookup table is empty");
    Ok(AddressLookupTableAccount {
        key: *address,
        addresses: table.addresses.to_vec(),
    })
}
