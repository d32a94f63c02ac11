//! Nodes of the world graph.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use control::Receiver;

use crate::character::Character;

/// One location in the world.
///
/// Exits and occupants are held weakly: the [`World`](crate::World) owns
/// every location strongly, so the graph stays acyclic for ownership, and a
/// location never keeps a character alive by itself.
pub struct Location {
    name: String,
    description: String,
    exits: RefCell<Vec<Exit>>,
    occupants: RefCell<Vec<Weak<Character>>>,
}

struct Exit {
    name: String,
    destination: Weak<Location>,
}

impl Location {
    pub fn new(name: &str, description: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            description: description.to_string(),
            exits: RefCell::new(Vec::new()),
            occupants: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Adds a one-way exit toward `destination`.
    pub fn add_exit(&self, name: &str, destination: &Rc<Location>) {
        self.exits.borrow_mut().push(Exit {
            name: name.to_string(),
            destination: Rc::downgrade(destination),
        });
    }

    /// Resolves an exit by name.
    pub fn exit(&self, name: &str) -> Option<Rc<Location>> {
        self.exits
            .borrow()
            .iter()
            .find(|exit| exit.name == name)
            .and_then(|exit| exit.destination.upgrade())
    }

    /// Exit names, in declaration order.
    pub fn exit_names(&self) -> Vec<String> {
        self.exits.borrow().iter().map(|exit| exit.name.clone()).collect()
    }

    /// The header and description shown by `look`.
    pub fn describe(&self) -> String {
        format!("{}\n{}", self.name, self.description)
    }

    pub(crate) fn add_occupant(&self, character: &Rc<Character>) {
        self.occupants.borrow_mut().push(Rc::downgrade(character));
    }

    pub(crate) fn remove_occupant(&self, character: &Character) {
        self.occupants.borrow_mut().retain(|occupant| {
            occupant
                .upgrade()
                .map(|live| live.id() != character.id())
                .unwrap_or(false)
        });
    }

    /// Live occupants, dropping the entries of characters that no longer
    /// exist along the way.
    pub fn occupants(&self) -> Vec<Rc<Character>> {
        let mut live = Vec::new();
        self.occupants.borrow_mut().retain(|occupant| match occupant.upgrade() {
            Some(character) => {
                live.push(character);
                true
            }
            None => false,
        });
        live
    }

    /// Sends `message` to every occupant's controller.
    pub fn broadcast(&self, message: &str) {
        for occupant in self.occupants() {
            occupant.message(message.to_string());
        }
    }
}
