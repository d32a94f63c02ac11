//! Session-backed controller endpoint.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crossbeam::channel;

use crate::controller::{Command, Controller, ControllerId, Message};
use crate::receiver::{Receiver, ReceiverRef};

/// Stable external key identifying one player's connection.
pub type SessionId = u32;

/// Concrete controller backed by a session id and two FIFO queues.
///
/// The transport side of each queue is exposed separately from the
/// [`Controller`] contract: whatever owns the connection enqueues raw
/// command text with [`push_command`](Player::push_command) and drains
/// feedback with [`take_message`](Player::take_message), while the entity
/// side works the opposite ends through the trait. Construction is
/// infallible; duplicate-session detection happens at registration in
/// [`PlayerRegistry`](crate::PlayerRegistry).
pub struct Player {
    session: SessionId,
    id: ControllerId,
    command_tx: channel::Sender<Command>,
    command_rx: channel::Receiver<Command>,
    message_tx: channel::Sender<Message>,
    message_rx: channel::Receiver<Message>,
    receiver: RefCell<Option<Weak<dyn Receiver>>>,
}

impl Player {
    /// Creates a detached player for `session`.
    pub fn new(session: SessionId) -> Rc<Self> {
        let (command_tx, command_rx) = channel::unbounded();
        let (message_tx, message_rx) = channel::unbounded();
        Rc::new(Self {
            session,
            id: ControllerId::next(),
            command_tx,
            command_rx,
            message_tx,
            message_rx,
            receiver: RefCell::new(None),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Transport side: enqueues one raw command line.
    pub fn push_command(&self, command: Command) {
        let _ = self.command_tx.send(command);
    }

    /// Transport side: removes the oldest outbound message, if any.
    pub fn take_message(&self) -> Option<Message> {
        self.message_rx.try_recv().ok()
    }
}

impl Controller for Player {
    fn id(&self) -> ControllerId {
        self.id
    }

    fn read_cmd(&self) -> Command {
        // Both halves live in this player, so the channel cannot disconnect.
        self.command_rx.recv().unwrap_or_default()
    }

    fn try_read_cmd(&self) -> Option<Command> {
        self.command_rx.try_recv().ok()
    }

    fn write_msg(&self, message: Message) {
        let _ = self.message_tx.send(message);
    }

    fn has_cmd(&self) -> bool {
        !self.command_rx.is_empty()
    }

    fn has_msg(&self) -> bool {
        !self.message_rx.is_empty()
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
