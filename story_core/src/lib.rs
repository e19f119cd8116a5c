//! # Story Core
//!
//! The interpretive core of the spirit story game. This crate reads the world
//! bible from `spirit_rules`, runs data-defined story scripts and the ghost
//! negotiation mini-game against the world, and decides what the player can
//! reach and what they should try next.
//!
//! ## Core Components
//!
//! - **interpreter**: Story scripts with addressable jumps and sub-flow calls
//! - **negotiation**: Ghost negotiation, option providers and mediation
//! - **spawn**: Reachable anchors and startable stories, over the **services** index
//! - **hints**: Ranked player hints from flags and unresolved obsessions
//! - **save**: Slot saves over a pluggable store
//! - **integrity**: Authoring checks over loaded data
//!
//! Presentation stays outside: every point where a story waits on the player
//! goes through [`SubFlowInvoker`].

pub mod data;
pub mod error;
pub mod hints;
pub mod integrity;
pub mod interpreter;
pub mod negotiation;
pub mod save;
pub mod services;
pub mod spawn;
pub mod subflow;

pub use data::*;
pub use error::*;
pub use hints::*;
pub use integrity::*;
pub use interpreter::*;
pub use negotiation::*;
pub use save::*;
pub use services::*;
pub use spawn::*;
pub use subflow::*;
