use thiserror::Error;

/// Why a consumption target could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortfallCause {
    /// Pool is already at zero and a positive cost was requested.
    NoneAvailable,
    /// Pool has some value but not enough to cover the cost.
    NotEnough,
    /// The referenced denomination/ring/item does not exist.
    MissingPool,
}

/// Raised when a resolution pass cannot pay a cost; aborts the whole pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}: {pool} (cost {cost}, available {available})", cause_label(*.cause))]
pub struct ConsumptionError {
    pub cause: ShortfallCause,
    pub pool: String,
    pub cost: i32,
    pub available: i32,
}

impl ConsumptionError {
    pub fn none_available(pool: impl Into<String>, cost: i32) -> Self {
        Self {
            cause: ShortfallCause::NoneAvailable,
            pool: pool.into(),
            cost,
            available: 0,
        }
    }

    pub fn not_enough(pool: impl Into<String>, cost: i32, available: i32) -> Self {
        Self {
            cause: ShortfallCause::NotEnough,
            pool: pool.into(),
            cost,
            available,
        }
    }

    pub fn missing_pool(pool: impl Into<String>, cost: i32) -> Self {
        Self {
            cause: ShortfallCause::MissingPool,
            pool: pool.into(),
            cost,
            available: 0,
        }
    }
}

fn cause_label(cause: ShortfallCause) -> &'static str {
    match cause {
        ShortfallCause::NoneAvailable => "no uses remaining",
        ShortfallCause::NotEnough => "not enough remaining",
        ShortfallCause::MissingPool => "no such pool",
    }
}

/// Malformed or unevaluable dice expression. These indicate data-authoring
/// bugs and are never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("empty formula")]
    Empty,
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("expected {0} at offset {1}")]
    Expected(&'static str, usize),
    #[error("unknown reference '@{0}'")]
    UnknownReference(String),
    #[error("invalid die: {0}")]
    InvalidDie(String),
    #[error("dice count/faces must be deterministic, got '{0}'")]
    UnresolvedDice(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Everything that can abort one resolution pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Consumption(#[from] ConsumptionError),
    #[error("bad cost formula: {0}")]
    Formula(#[from] FormulaError),
}
