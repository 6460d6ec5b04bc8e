//! Compute-budget instructions.

use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_instruction::Instruction;

use crate::fees::DEFAULT_PRIORITY_FEE_MICROLAMPORTS;

/// Compute-unit limit used when a caller does not pick one.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Errors raised while building compute-budget instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ComputeBudgetError {
    /// A compute-unit limit of zero was requested.
    #[error("cuLimit must be a positive number")]
    NonPositiveLimit,
}

/// Builds the `[limit, price]` pair placed at the front of a transaction.
///
/// # Errors
///
/// Returns [`ComputeBudgetError::NonPositiveLimit`] if `cu_limit` is zero.
pub fn compute_budget_instructions(
    cu_limit: u32,
    cu_price_micro_lamports: u64,
) -> Result<[Instruction; 2], ComputeBudgetError> {
    if cu_limit == 0 {
        return Err(ComputeBudgetError::NonPositiveLimit);
    }
    #[cfg(feature = "telemetry")]
    tracing::debug!(
        cu_limit,
        cu_price_micro_lamports,
        "[compute] compute budget instructions"
    );
    Ok([
        ComputeBudgetInstruction::set_compute_unit_limit(cu_limit),
        ComputeBudgetInstruction::set_compute_unit_price(cu_price_micro_lamports),
    ])
}

/// A price instruction when `micro_lamports` is given, otherwise a limit instruction for `units`.
#[must_use]
pub fn with_compute_budget(units: Option<u32>, micro_lamports: Option<u64>) -> Instruction {
    match micro_lamports {
        Some(micro_lamports) => ComputeBudgetInstruction::set_compute_unit_price(micro_lamports),
        None => ComputeBudgetInstruction::set_compute_unit_limit(
            units.unwrap_or(DEFAULT_COMPUTE_UNIT_LIMIT),
        ),
    }
}

/// Static priority-fee configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityFeeConfig {
    /// Explicit price, used when positive.
    pub micro_lamports: Option<u64>,
    /// Fallback price, used when positive and no explicit price is set.
    pub default_micro_lamports: Option<u64>,
}

/// Resolves a static priority fee: explicit, then default, then
/// [`DEFAULT_PRIORITY_FEE_MICROLAMPORTS`].
#[must_use]
pub fn resolve_priority_fee(config: &PriorityFeeConfig) -> u64 {
    config
        .micro_lamports
        .filter(|fee| *fee > 0)
        .or_else(|| config.default_micro_lamports.filter(|fee| *fee > 0))
        .unwrap_or(DEFAULT_PRIORITY_FEE_MICROLAMPORTS)
}

/// A price instruction carrying [`resolve_priority_fee`].
#[must_use]
pub fn with_priority_fee(config: &PriorityFeeConfig) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(resolve_priority_fee(config))
}

/// Whether `ix` belongs to the compute-budget program.
#[must_use]
pub fn is_compute_budget_instruction(ix: &Instruction) -> bool {
    ix.program_id == solana_compute_budget_interface::ID
}
