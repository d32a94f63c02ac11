//! Entity layer on top of the control core: characters that live in a
//! location graph and answer a small command vocabulary, plus declarative
//! world construction from serde specs.
//!
//! Nothing here extends the control contract. A [`Character`] is an
//! ordinary [`control::Receiver`] that drains gated commands during
//! `update` and reports back through whatever controller happens to drive
//! it, which is exactly what makes the composite topologies from the
//! `control` crate work unchanged on real entities.

pub mod character;
pub mod location;
pub mod worldfile;

pub use character::{Character, CommandError, CommandSpec};
pub use location::Location;
pub use worldfile::{demo_spec, ExitSpec, LocationSpec, World, WorldError, WorldSpec};
