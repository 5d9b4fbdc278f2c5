//! Domain models for the Inventory ERP Platform

mod catalog;
mod company;
mod ledger;
mod order;
mod user;

pub use catalog::*;
pub use company::*;
pub use ledger::*;
pub use order::*;
pub use user::*;
