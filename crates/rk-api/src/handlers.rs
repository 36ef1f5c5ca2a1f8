//! Request handlers.

pub mod health;
pub mod recipes;
pub mod social;
pub mod users;

pub use health::*;
pub use recipes::*;
pub use social::*;
pub use users::*;
