//! Pricing error types.

use thiserror::Error;

/// Pricing errors
#[derive(Debug, Error)]
pub enum PricingError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No base rate configured for the court/sport/time combination
    #[error("No rate configured for court {court_id} ({sport}, {time_of_day})")]
    NoPricingConfigured {
        court_id: i64,
        sport: String,
        time_of_day: String,
    },
}

impl PricingError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            PricingError::Database(_) => "Internal server error".to_string(),
            PricingError::NoPricingConfigured { .. } => self.to_string(),
        }
    }

    /// Machine-readable error kind for the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::Database(_) => "internal",
            PricingError::NoPricingConfigured { .. } => "no_pricing_configured",
        }
    }
}

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
