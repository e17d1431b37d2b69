use crate::chain::RevertProbe;
use alloy::sol_types::decode_revert_reason;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevertReason {
    /// ABI-decoded `Error(string)` or `Panic(uint256)` payload.
    Decoded(String),
    /// Reason text recovered from the node's error message.
    Message(String),
    Unknown,
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Decoded(reason) | RevertReason::Message(reason) => {
                f.write_str(reason)
            }
            RevertReason::Unknown => {
                f.write_str("Transaction reverted. Please check the transaction details.")
            }
        }
    }
}

type Strategy = fn(&RevertProbe) -> Option<RevertReason>;

const STRATEGIES: [Strategy; 2] = [abi_payload, message_text];

/// Tries each decoding strategy in order, first hit wins.
pub fn decode(probe: &RevertProbe) -> RevertReason {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(probe))
        .unwrap_or(RevertReason::Unknown)
}

fn abi_payload(probe: &RevertProbe) -> Option<RevertReason> {
    let data = probe.data.as_ref().filter(|data| !data.is_empty())?;
    decode_revert_reason(data).map(RevertReason::Decoded)
}

fn message_text(probe: &RevertProbe) -> Option<RevertReason> {
    probe
        .message
        .as_deref()
        .and_then(revert_text)
        .map(RevertReason::Message)
}

/// Text following `revert`/`reverted` in a node error message.
pub fn revert_text(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    let start = lower.find("revert")? + "revert".len();
    let rest = &message[start..];
    let rest = rest.strip_prefix("ed").unwrap_or(rest);
    let text = rest
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
        .split(", data:")
        .next()
        .unwrap_or_default()
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}
