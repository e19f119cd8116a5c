//! # Spirit Rules
//!
//! The "World Bible" crate - the data model, the mutable world document and the
//! small rule systems every other layer leans on: the condition mini-language,
//! the seeded random generator and the ghost lifecycle tracker.
//! This crate holds no story flow and no UI concerns.

pub mod conditions;
pub mod config;
pub mod entities;
pub mod error;
pub mod ghost_tracker;
pub mod mechanics;
pub mod seed;
pub mod world_state;

pub use conditions::*;
pub use config::*;
pub use entities::*;
pub use error::*;
pub use ghost_tracker::*;
pub use mechanics::*;
pub use seed::*;
pub use world_state::*;
