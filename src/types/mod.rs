//! Shared primitive types.

mod balance;
pub use balance::*;

mod contracts;
pub use contracts::*;

mod intent;
pub use intent::*;

mod registry;
pub use registry::*;

pub mod usdc;
