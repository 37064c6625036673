//! Pricing and tariff eligibility.
//!
//! Base rates are configured per court, sport, and time of day; approved
//! tariff enrollments grant percentage discounts. The best applicable
//! discount wins and the result never goes below zero.

pub mod errors;
pub mod models;
pub mod resolver;

pub use errors::{PricingError, PricingResult};
pub use models::{PriceQuote, Tariff, TimeOfDay, UserProfile, best_tariff};
pub use resolver::PricingResolver;
