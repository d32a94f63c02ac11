//! The receiver side of the control contract, plus the single-controller
//! attachment slot concrete entities embed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::controller::{Controller, ControllerRef};

/// Shared handle to any receiver.
pub type ReceiverRef = Rc<dyn Receiver>;

/// Identity token for a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

impl ReceiverId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attachable, updatable entity driven by a controller.
pub trait Receiver {
    /// Identity token, compared by attach guards and takeover detection.
    fn id(&self) -> ReceiverId;

    /// Human-readable name, used in router labels and log lines.
    fn name(&self) -> &str;

    /// The controller currently driving this receiver, if any.
    fn controller(&self) -> Option<ControllerRef>;

    /// Binds this receiver to `controller`, keeping back-references on both
    /// sides in sync. Re-attaching the current controller is a no-op.
    fn attach(&self, controller: &ControllerRef);

    /// Severs the control association in both directions. No-op when
    /// already detached.
    fn detach(&self);

    /// One tick of entity behavior: drain gated commands, write messages.
    fn update(&self);
}

/// Single-controller attachment slot.
///
/// Concrete receivers embed one of these and delegate `attach`, `detach`,
/// and `controller` to it. The slot maintains the symmetric-attach
/// invariant: `receiver.controller()` is `c` exactly when `c.receiver()` is
/// that receiver, compared by id, with no observable half-states outside
/// the attach/detach calls themselves.
pub struct ControlLink {
    owner: Weak<dyn Receiver>,
    controller: RefCell<Option<Weak<dyn Controller>>>,
}

impl ControlLink {
    /// Creates a detached slot for `owner`. Owners under construction pass
    /// the weak handle given out by `Rc::new_cyclic`.
    pub fn new(owner: Weak<dyn Receiver>) -> Self {
        Self {
            owner,
            controller: RefCell::new(None),
        }
    }

    /// The controller currently bound to the owner, if any.
    pub fn controller(&self) -> Option<ControllerRef> {
        self.controller.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Binds `controller` to the owner.
    ///
    /// Re-attaching the bound controller returns immediately; the identity
    /// guard is what stops the recursion started by
    /// [`assume_control`](crate::assume_control). Any previous pairing on
    /// either side is severed first, so the symmetric invariant holds once
    /// this returns.
    pub fn attach(&self, controller: &ControllerRef) {
        if self.controller().map(|current| current.id()) == Some(controller.id()) {
            return;
        }
        self.detach();
        if let Some(previous) = controller.receiver() {
            previous.detach();
        }
        *self.controller.borrow_mut() = Some(Rc::downgrade(controller));
        controller.set_receiver(Some(self.owner.clone()));
        if let Some(owner) = self.owner.upgrade() {
            debug!("{} attached to controller {}", owner.name(), controller.id());
        }
    }

    /// Clears the pairing in both directions. No-op when detached.
    pub fn detach(&self) {
        let current = self.controller.borrow_mut().take();
        if let Some(controller) = current.as_ref().and_then(Weak::upgrade) {
            controller.set_receiver(None);
            if let Some(owner) = self.owner.upgrade() {
                debug!("{} detached from controller {}", owner.name(), controller.id());
            }
        }
    }
}

/// Receiver listening to at most one controller, with a no-op update.
///
/// Usable directly as a stub entity; richer entities embed the same
/// [`ControlLink`] and supply a real `update`.
pub struct Monoreceiver {
    id: ReceiverId,
    name: String,
    link: ControlLink,
}

impl Monoreceiver {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let owner: Weak<dyn Receiver> = weak.clone();
            Self {
                id: ReceiverId::next(),
                name: name.to_string(),
                link: ControlLink::new(owner),
            }
        })
    }
}

impl Receiver for Monoreceiver {
    fn id(&self) -> ReceiverId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn controller(&self) -> Option<ControllerRef> {
        self.link.controller()
    }

    fn attach(&self, controller: &ControllerRef) {
        self.link.attach(controller);
    }

    fn detach(&self) {
        self.link.detach();
    }

    fn update(&self) {}
}
