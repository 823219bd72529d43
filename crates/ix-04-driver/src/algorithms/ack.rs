//! Mapping state machine outcomes onto acknowledgements.

use ix_02_asset_exchange::TransitionOutcome;
use shared_types::{Ack, ContractTransaction};

/// `Ack` for a successful state machine call. Replays are still OK.
pub fn ack_for_outcome(outcome: &TransitionOutcome) -> Ack {
    match outcome {
        TransitionOutcome::Applied { to, .. } => Ack::ok_with(to.as_str()),
        TransitionOutcome::Duplicate { state } => Ack::ok_with(format!("duplicate: {}", state)),
        TransitionOutcome::Recorded { state } => Ack::ok_with(state.as_str()),
    }
}

/// Key a delivered view is stored under. Equals `Query::view_key` for
/// views served in answer to a query.
pub fn view_key_for(ctx: &ContractTransaction) -> String {
    format!("{}#{}", ctx.ledger, ctx.contract_address)
}
