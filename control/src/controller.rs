//! The controller side of the control contract.
//!
//! A controller is a two-queue endpoint: commands flow in from an actor,
//! messages flow back out to it. The entity on the far side drains the
//! command queue and fills the message queue during its update pass. This
//! module holds the trait itself plus the identity plumbing every concrete
//! endpoint shares.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::receiver::{Receiver, ReceiverRef};

/// An instruction for the entity under control. Opaque to the routing layer.
pub type Command = String;

/// Feedback for the actor behind a controller. Opaque to the routing layer.
pub type Message = String;

/// Shared handle to any controller.
pub type ControllerRef = Rc<dyn Controller>;

/// Identity token for a controller.
///
/// Attach guards and takeover detection compare controllers by id rather
/// than by pointer, so a controller keeps a stable identity no matter how
/// many handles to it exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Two-queue endpoint mediating between an external actor and a driven
/// entity.
///
/// `read_cmd` suspends the caller while the command queue is empty, so code
/// running on the cooperative thread must gate it behind
/// [`has_cmd`](Controller::has_cmd) or use
/// [`try_read_cmd`](Controller::try_read_cmd) instead.
pub trait Controller {
    /// Identity token, compared by attach guards and takeover detection.
    fn id(&self) -> ControllerId;

    /// Removes and returns the oldest queued command, blocking while the
    /// queue is empty.
    fn read_cmd(&self) -> Command;

    /// Non-blocking variant of [`read_cmd`](Controller::read_cmd).
    fn try_read_cmd(&self) -> Option<Command>;

    /// Appends a message to the outbound queue. Never blocks, never fails.
    fn write_msg(&self, message: Message);

    /// True iff the command queue is non-empty.
    fn has_cmd(&self) -> bool;

    /// True iff the message queue is non-empty.
    fn has_msg(&self) -> bool;

    /// The receiver this controller currently drives, if any.
    fn receiver(&self) -> Option<ReceiverRef>;

    /// Stores the receiver back-reference.
    ///
    /// Part of the attach/detach protocol. User code goes through
    /// [`Receiver::attach`] and [`Receiver::detach`] so the two sides stay
    /// symmetric; calling this directly leaves the other side stale.
    fn set_receiver(&self, receiver: Option<Weak<dyn Receiver>>);

    /// Downcast hook, used by [`MultiController`](crate::MultiController)
    /// to flatten nested composites.
    fn as_any(&self) -> &dyn Any;
}

/// Detaches `receiver` from whatever currently drives it, then attaches it
/// to `controller`.
pub fn assume_control(controller: &ControllerRef, receiver: &ReceiverRef) {
    receiver.detach();
    receiver.attach(controller);
}
