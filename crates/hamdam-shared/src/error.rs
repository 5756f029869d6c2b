use thiserror::Error;

/// Validation failures raised by the pure ledger inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Please enter a valid amount (a whole number greater than zero)")]
    InvalidAmount,

    #[error("Please enter a valid number of days (greater than zero)")]
    InvalidDays,
}
