use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Plan not found")]
    PlanNotFound,

    /// The plan a pending payment was bought for has since been removed from the catalog.
    #[error("Plan of this payment is no longer available")]
    PlanUnavailable,

    #[error("User not found")]
    UserNotFound,

    #[error("Payment record not found")]
    RecordNotFound,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment is being reconciled by another request")]
    ReconcileBusy,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidInput,
    PlanNotFound,
    PlanUnavailable,
    UserNotFound,
    RecordNotFound,
    GatewayError,
    Conflict,
    ReconcileBusy,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::PlanNotFound => "PLAN_NOT_FOUND",
            ErrorCode::PlanUnavailable => "PLAN_UNAVAILABLE",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ReconcileBusy => "RECONCILE_BUSY",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
