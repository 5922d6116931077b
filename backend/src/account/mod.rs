//! Account domain module
//!
//! Contains the account model, capability profiles, credit ledger and service.

pub mod model;
pub mod service;

pub use model::*;
pub use service::AccountService;
