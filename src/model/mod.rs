//! Pure data structures shared by every stage of the accrual pipeline.

pub mod balance;
pub mod order;

pub use balance::*;
pub use order::*;
