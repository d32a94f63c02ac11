//! # Actor/Entity Control Core
//!
//! This crate decouples an input/output *actor* (a human at a console, an
//! AI, another program) from the *entity* it drives. The two sides only ever
//! meet through a narrow two-queue contract:
//!
//! - [`Controller`]: the actor's endpoint. Commands flow in through one FIFO
//!   queue, feedback messages flow out through another.
//! - [`Receiver`]: the entity's endpoint. It can be attached to a controller,
//!   detached from it, and updated, at which point it drains queued commands
//!   and pushes messages back.
//!
//! On top of the contract sit the composite topologies that make the design
//! worthwhile:
//!
//! - [`MultiController`] fans several controllers into one, so multiple
//!   actors can jointly drive a single entity.
//! - [`Multireceiver`] puts several member receivers under one external
//!   controller, fanning commands out to all of them and routing their
//!   messages back deduplicated and labeled by speaker.
//!
//! Everything runs on a single cooperative thread of control. The object
//! graph is `Rc`-based and deliberately `!Send`; queues are unbounded
//! channels so the blocking and polling read paths both exist. The design is
//! push-triggered: [`PlayerRegistry::send_command`] synchronously runs one
//! update pass of the attached receiver before returning, so the documented
//! call pattern never suspends on an empty queue.

pub mod controller;
pub mod multi_controller;
pub mod multi_receiver;
pub mod player;
pub mod receiver;
pub mod registry;

pub use controller::{assume_control, Command, Controller, ControllerId, ControllerRef, Message};
pub use multi_controller::MultiController;
pub use multi_receiver::Multireceiver;
pub use player::{Player, SessionId};
pub use receiver::{ControlLink, Monoreceiver, Receiver, ReceiverId, ReceiverRef};
pub use registry::{ControlError, PlayerRegistry};
