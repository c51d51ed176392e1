//! Data models for Innkeep

mod guest;
mod payment;
mod reservation;
mod room;
mod staff;

pub use guest::*;
pub use payment::*;
pub use reservation::*;
pub use room::*;
pub use staff::*;
