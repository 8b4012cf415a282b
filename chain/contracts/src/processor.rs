//! Escrow program entrypoint

use crate::context::InvokeContext;
use crate::errors::EscrowError;
use crate::instruction::EscrowInstruction;
use crate::instructions::{make, refund, take};

/// Decode `data` and run the matching handler.
pub fn process_instruction(ctx: &mut InvokeContext<'_>, data: &[u8]) -> Result<(), EscrowError> {
    match EscrowInstruction::unpack(data)? {
        EscrowInstruction::Make {
            seed,
            deposit_amount,
            receive_amount,
        } => make::process(ctx, seed, deposit_amount, receive_amount),
        EscrowInstruction::Take => take::process(ctx),
        EscrowInstruction::Refund => refund::process(ctx),
    }
}
