//! Booking domain module

pub mod model;
pub mod service;
pub mod settlement;

pub use model::*;
pub use service::BookingService;
pub use settlement::Settlement;
