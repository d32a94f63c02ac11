//! Fan-in/fan-out composite controller.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::controller::{Command, Controller, ControllerId, ControllerRef, Message};
use crate::receiver::{Receiver, ReceiverRef};

/// Composite controller treating an ordered set of controllers as one.
///
/// Commands come from whichever member has one queued first, messages are
/// broadcast to every member. Nested composites are flattened at
/// construction, so fan-out order is always the leaf registration order no
/// matter how the set was assembled.
pub struct MultiController {
    id: ControllerId,
    controllers: Vec<ControllerRef>,
    receiver: RefCell<Option<Weak<dyn Receiver>>>,
}

impl MultiController {
    /// Builds a composite over `controllers`, splicing the members of any
    /// nested composite in place of the composite itself.
    pub fn new(controllers: impl IntoIterator<Item = ControllerRef>) -> Rc<Self> {
        let mut flattened: Vec<ControllerRef> = Vec::new();
        for controller in controllers {
            match controller.as_any().downcast_ref::<MultiController>() {
                Some(composite) => flattened.extend(composite.controllers.iter().cloned()),
                None => flattened.push(controller),
            }
        }
        Rc::new(Self {
            id: ControllerId::next(),
            controllers: flattened,
            receiver: RefCell::new(None),
        })
    }

    /// Flattened members, in fan-out order.
    pub fn controllers(&self) -> impl Iterator<Item = &ControllerRef> {
        self.controllers.iter()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl Controller for MultiController {
    fn id(&self) -> ControllerId {
        self.id
    }

    /// Returns the first queued command in flattened member order.
    ///
    /// There is no single queue to suspend on, so callers must gate this
    /// behind [`has_cmd`](Controller::has_cmd); calling it with no command
    /// queued anywhere is a contract violation and panics.
    fn read_cmd(&self) -> Command {
        match self.try_read_cmd() {
            Some(command) => command,
            None => panic!("read_cmd on a MultiController with no queued command"),
        }
    }

    fn try_read_cmd(&self) -> Option<Command> {
        self.controllers
            .iter()
            .find(|controller| controller.has_cmd())
            .and_then(|controller| controller.try_read_cmd())
    }

    fn write_msg(&self, message: Message) {
        for controller in &self.controllers {
            controller.write_msg(message.clone());
        }
    }

    fn has_cmd(&self) -> bool {
        self.controllers.iter().any(|controller| controller.has_cmd())
    }

    fn has_msg(&self) -> bool {
        self.controllers.iter().any(|controller| controller.has_msg())
    }

    fn receiver(&self) -> Option<ReceiverRef> {
        self.receiver.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Stores the back-reference and propagates it to every member, so each
    /// constituent sees the entity the composite drives.
    fn set_receiver(&self, receiver: Option<Weak<dyn Receiver>>) {
        for controller in &self.controllers {
            controller.set_receiver(receiver.clone());
        }
        *self.receiver.borrow_mut() = receiver;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
