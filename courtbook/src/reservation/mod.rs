//! Reservation lifecycle: the state machine over court bookings.
//!
//! A reservation moves through
//! `PENDING -> PAID -> IN_PROGRESS -> COMPLETED`, with `CANCELLED` and
//! `NO_SHOW` as the other terminal states. Status and payment status are
//! independent axes; every transition is status-gated inside a single
//! database transaction so no terminal state ever mutates again and no
//! two non-terminal reservations on the same court overlap in time.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ReservationError, ReservationResult};
pub use manager::ReservationManager;
pub use models::{
    Court, CourtId, CreateReservation, PaymentMethod, PaymentStatus, Reservation, ReservationId,
    ReservationStatus, UserId,
};
