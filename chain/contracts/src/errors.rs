//! Contract-specific error types
//!
//! One taxonomy per layer: address derivation, the token primitive, the
//! escrow program, and the ledger runtime that wraps them.

use escrow_types::pubkey::Pubkey;
use thiserror::Error;

/// Address derivation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PdaError {
    #[error("seed of {len} bytes exceeds the 32-byte limit")]
    MaxSeedLengthExceeded { len: usize },

    #[error("{count} seeds exceed the limit of 16")]
    TooManySeeds { count: usize },

    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    #[error("no bump in 0..=255 yields an off-curve address")]
    NoViableBump,
}

/// Token primitive errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient token balance: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("token account mint does not match")]
    MintMismatch,

    #[error("decimals mismatch: mint has {expected}, caller passed {actual}")]
    DecimalsMismatch { expected: u8, actual: u8 },

    #[error("authority does not own the token account")]
    OwnerMismatch,

    #[error("cannot close a token account holding {amount} units")]
    NonZeroBalance { amount: u64 },

    #[error("account is not a token-program account")]
    InvalidAccountData,

    #[error("token state is not initialized")]
    UninitializedState,

    #[error("address is not the associated token address for this wallet and mint")]
    InvalidAssociatedAddress,

    #[error("arithmetic overflow in token balance")]
    Overflow,
}

/// Program errors, shared by the escrow and lamport vault programs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("invalid amount")]
    InvalidAmount,

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("unauthorized: signer does not hold the required identity")]
    Unauthorized,

    #[error("supplied mint does not match the escrow record")]
    MintMismatch,

    #[error("escrow record not found")]
    RecordNotFound,

    #[error("escrow record already exists at the derived address")]
    RecordAlreadyExists,

    #[error("vault already holds lamports")]
    VaultAlreadyExists,

    #[error("address derivation failed: {0}")]
    DerivationFailed(#[from] PdaError),

    #[error("account address does not match its derivation seeds")]
    InvalidSeeds,

    #[error("vault is not the escrow's associated token account")]
    InvalidVault,

    #[error("token account does not belong to the expected wallet and mint")]
    InvalidTokenAccount,

    #[error("invalid instruction data")]
    InvalidInstructionData,

    #[error("invalid account data")]
    InvalidAccountData,

    #[error("not enough account keys for instruction")]
    NotEnoughAccountKeys,

    #[error("incorrect program id")]
    IncorrectProgramId,

    #[error("account {0} is not writable")]
    AccountNotWritable(Pubkey),

    #[error("missing required signature for {0}")]
    MissingSignature(Pubkey),

    #[error("account {0} is already initialized")]
    AccountAlreadyInitialized(Pubkey),

    #[error("cannot close account with a non-zero token balance")]
    NonZeroBalance,

    #[error("the same account was passed where distinct accounts are required")]
    DuplicateAccount,

    #[error("arithmetic overflow")]
    Overflow,
}

impl From<TokenError> for EscrowError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientFunds {
                required,
                available,
            } => EscrowError::InsufficientFunds {
                required,
                available,
            },
            TokenError::MintMismatch | TokenError::DecimalsMismatch { .. } => {
                EscrowError::MintMismatch
            }
            TokenError::OwnerMismatch => EscrowError::Unauthorized,
            TokenError::NonZeroBalance { .. } => EscrowError::NonZeroBalance,
            TokenError::InvalidAccountData | TokenError::UninitializedState => {
                EscrowError::InvalidAccountData
            }
            TokenError::InvalidAssociatedAddress => EscrowError::InvalidTokenAccount,
            TokenError::Overflow => EscrowError::Overflow,
        }
    }
}

/// Ledger runtime errors. A transaction that fails with any of these has
/// written nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no instructions")]
    EmptyTransaction,

    #[error("signature verification failed for {0}")]
    SignatureFailure(Pubkey),

    #[error("transaction already processed")]
    AlreadyProcessed,

    #[error("account {0} is locked by an in-flight transaction")]
    AccountInUse(Pubkey),

    #[error("transaction references {count} accounts, limit is {limit}")]
    TooManyAccounts { count: usize, limit: usize },

    #[error("instruction {index} failed: {error}")]
    InstructionError { index: usize, error: EscrowError },

    #[error("lamports not conserved: before {before}, after {after}")]
    UnbalancedTransaction { before: u128, after: u128 },

    #[error("read-only account {0} was modified")]
    ReadonlyModified(Pubkey),

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("address derivation failed: {0}")]
    Derivation(#[from] PdaError),

    #[error("arithmetic overflow in ledger balance")]
    Overflow,
}

impl TransactionError {
    /// The program error, if the transaction failed inside an instruction.
    pub fn instruction_error(&self) -> Option<&EscrowError> {
        match self {
            TransactionError::InstructionError { error, .. } => Some(error),
            _ => None,
        }
    }
}
