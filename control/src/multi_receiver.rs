//! Group-controlled aggregator.
//!
//! A [`Multireceiver`] puts N member receivers under one external
//! controller. Commands from the external controller are copied to every
//! member; member messages are routed back deduplicated and labeled with
//! the emitting member's name. Each member is driven through a private
//! [`MemberAdapter`] rather than the external controller itself, which is
//! also how out-of-band takeovers are detected: a member whose visible
//! controller is no longer its own adapter has been grabbed by something
//! else and is evicted on the next update.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crossbeam::channel;
use log::{debug, warn};

use crate::controller::{
    assume_control, Command, Controller, ControllerId, ControllerRef, Message,
};
use crate::receiver::{ControlLink, Receiver, ReceiverId, ReceiverRef};

/// Receiver composed of N member receivers under one external controller.
pub struct Multireceiver {
    id: ReceiverId,
    name: String,
    link: ControlLink,
    members: RefCell<Vec<(ReceiverRef, Rc<MemberAdapter>)>>,
    window: RefCell<VecDeque<(ReceiverId, Message)>>,
    capacity: Cell<usize>,
}

/// Dedup window capacity for a given active member count.
fn capacity_for(members: usize) -> usize {
    members * 3 / 2
}

impl Multireceiver {
    pub fn new(name: &str, members: impl IntoIterator<Item = ReceiverRef>) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let members: Vec<(ReceiverRef, Rc<MemberAdapter>)> = members
                .into_iter()
                .map(|member| {
                    let adapter = MemberAdapter::new(weak.clone(), &member);
                    (member, adapter)
                })
                .collect();
            let capacity = capacity_for(members.len());
            let owner: Weak<dyn Receiver> = weak.clone();
            Self {
                id: ReceiverId::next(),
                name: name.to_string(),
                link: ControlLink::new(owner),
                members: RefCell::new(members),
                window: RefCell::new(VecDeque::new()),
                capacity: Cell::new(capacity),
            }
        })
    }

    /// Names of the active members, in fan-out order.
    pub fn member_names(&self) -> Vec<String> {
        self.members
            .borrow()
            .iter()
            .map(|(member, _)| member.name().to_string())
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.borrow().len()
    }

    /// Current dedup window capacity, `active members * 3 / 2`.
    pub fn window_capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Evicts members whose controller is neither absent nor their own
    /// adapter: something else has taken them over out-of-band. Per member:
    /// notice to the external controller, removal, capacity recompute.
    fn check_members(&self) {
        let pairs: Vec<(ReceiverRef, Rc<MemberAdapter>)> = self.members.borrow().clone();
        for (member, adapter) in pairs {
            let taken_over = member
                .controller()
                .map(|controller| controller.id() != adapter.id())
                .unwrap_or(false);
            if taken_over {
                warn!("{}: lost member {}", self.name, member.name());
                if let Some(controller) = self.link.controller() {
                    controller.write_msg(format!("Lost connection with {}", member.name()));
                }
                self.members.borrow_mut().retain(|(m, _)| m.id() != member.id());
                self.capacity.set(capacity_for(self.member_count()));
            }
        }
    }

    /// Drains the external controller, copying each command into every
    /// remaining member's private queue.
    fn fan_out(&self) {
        let Some(controller) = self.link.controller() else {
            return;
        };
        while let Some(command) = controller.try_read_cmd() {
            for (_, adapter) in self.members.borrow().iter() {
                adapter.push_command(command.clone());
            }
        }
    }

    /// Routes one member message toward the external controller.
    ///
    /// The bounded window of recently routed (member, message) pairs drives
    /// two rules: a message equal to a windowed entry from a different
    /// member is suppressed, and a forwarded message is preceded by a
    /// `[<member>]` header only when the speaker changed since the last
    /// routed line.
    fn route(&self, member: &ReceiverRef, message: Message) {
        {
            let mut window = self.window.borrow_mut();
            // Trim first: capacity may have shrunk since the last route.
            while window.len() >= self.capacity.get() && !window.is_empty() {
                window.pop_front();
            }
            let duplicate = window
                .iter()
                .any(|(source, seen)| *seen == message && *source != member.id());
            if duplicate {
                debug!("{}: suppressed duplicate from {}", self.name, member.name());
                return;
            }
        }
        let Some(controller) = self.link.controller() else {
            return;
        };
        let speaker_changed = self
            .window
            .borrow()
            .back()
            .map(|(source, _)| *source != member.id())
            .unwrap_or(true);
        if speaker_changed {
            controller.write_msg(format!("[{}]", member.name()));
        }
        controller.write_msg(message.clone());
        self.window.borrow_mut().push_back((member.id(), message));
    }
}

impl Receiver for Multireceiver {
    fn id(&self) -> ReceiverId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn controller(&self) -> Option<ControllerRef> {
        self.link.controller()
    }

    /// Stores the external controller, then has every member's private
    /// adapter take control of that member, whatever drove it before. The
    /// member grab runs even when the store short-circuits on re-attach.
    fn attach(&self, controller: &ControllerRef) {
        self.link.attach(controller);
        let pairs: Vec<(ReceiverRef, Rc<MemberAdapter>)> = self.members.borrow().clone();
        for (member, adapter) in pairs {
            let adapter: ControllerRef = adapter;
            assume_control(&adapter, &member);
        }
    }

    fn detach(&self) {
        self.link.detach();
        let pairs: Vec<(ReceiverRef, Rc<MemberAdapter>)> = self.members.borrow().clone();
        for (member, _) in pairs {
            member.detach();
        }
    }

    /// One tick, in fixed order: evict taken-over members, fan queued
    /// commands out to the survivors, then update every member.
    fn update(&self) {
        self.check_members();
        self.fan_out();
        let members: Vec<ReceiverRef> = self
            .members
            .borrow()
            .iter()
            .map(|(member, _)| Rc::clone(member))
            .collect();
        for member in members {
            member.update();
        }
    }
}

/// Private per-member controller inside a [`Multireceiver`].
///
/// Holds the member's share of fanned-out commands in its own queue and
/// forwards the member's messages into the owning group's routing, tagged
/// with the member they came from.
struct MemberAdapter {
    id: ControllerId,
    owner: Weak<Multireceiver>,
    receiver: RefCell<Option<Weak<dyn Receiver>>>,
    command_tx: channel::Sender<Command>,
    command_rx: channel::Receiver<Command>,
}

impl MemberAdapter {
    fn new(owner: Weak<Multireceiver>, member: &ReceiverRef) -> Rc<Self> {
        let (command_tx, command_rx) = channel::unbounded();
        Rc::new(Self {
            id: ControllerId::next(),
            owner,
            receiver: RefCell::new(Some(Rc::downgrade(member))),
            command_tx,
            command_rx,
        })
    }

    fn push_command(&self, command: Command) {
        let _ = self.command_tx.send(command);
    }
}

impl Controller for MemberAdapter {
    fn id(&self) -> ControllerId {
        self.id
    }

    fn read_cmd(&self) -> Command {
        // Both halves live in this adapter, so the channel cannot disconnect.
        self.command_rx.recv().unwrap_or_default()
    }

    fn try_read_cmd(&self) -> Option<Command> {
        self.command_rx.try_recv().ok()
    }

    /// Forwards into the owning group's routing, tagged with the member
    /// this adapter drives.
    fn write_msg(&self, message: Message) {
        let (Some(owner), Some(member)) = (self.owner.upgrade(), self.receiver()) else {
            return;
        };
        owner.route(&member, message);
    }

    fn has_cmd(&self) -> bool {
        !self.command_rx.is_empty()
    }

    /// Diagnostic only: whether the group's external controller has unread
    /// messages, false when the group is detached. The update loop never
    /// relies on this.
    fn has_msg(&self) -> bool {
        self.owner
            .upgrade()
            .and_then(|owner| owner.link.controller())
            .map(|controller| controller.has_msg())
            .unwrap_or(false)
    }

    fn receiver(&self) -> Option<ReceiverRef> {
        self.receiver.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn set_receiver(&self, receiver: Option<Weak<dyn Receiver>>) {
        *self.receiver.borrow_mut() = receiver;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
