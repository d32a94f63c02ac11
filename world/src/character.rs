//! Playable characters and their command vocabulary.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;
use thiserror::Error;

use control::{ControlLink, ControllerRef, Message, Receiver, ReceiverId};

use crate::location::Location;

/// Errors a command handler can report to the issuing actor.
///
/// None of these are fatal: the text goes back as a message through the
/// character's controller and the update pass moves on to the next queued
/// command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command '{0}' not recognized.")]
    Unrecognized(String),
    #[error("No exit '{0}' from here.")]
    NoSuchExit(String),
    #[error("You are nowhere.")]
    Nowhere,
}

/// One entry of the command table.
pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub handler: fn(&Character, &str) -> Result<(), CommandError>,
}

/// The command table, built at compile time. `help` renders its menu
/// straight from this slice, so adding an entry here is the whole
/// registration.
const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        summary: "Show relevant help information for a particular command.",
        usage: "help [command]",
        handler: Character::cmd_help,
    },
    CommandSpec {
        name: "look",
        summary: "Provide information about the current location.",
        usage: "look",
        handler: Character::cmd_look,
    },
    CommandSpec {
        name: "say",
        summary: "Say a message aloud, sent to everyone in your current location.",
        usage: "say [message]",
        handler: Character::cmd_say,
    },
    CommandSpec {
        name: "walk",
        summary: "Walk to an accessible location.",
        usage: "walk [exit name]",
        handler: Character::cmd_walk,
    },
];

/// A named entity occupying a location.
///
/// Characters are ordinary receivers: attach any controller and its queued
/// commands are executed on the next update pass, with feedback written
/// back through the same controller.
pub struct Character {
    id: ReceiverId,
    name: String,
    link: ControlLink,
    self_handle: Weak<Character>,
    location: RefCell<Option<Rc<Location>>>,
}

impl Character {
    /// Creates a character that is nowhere yet.
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let owner: Weak<dyn Receiver> = weak.clone();
            Self {
                id: ReceiverId::next(),
                name: name.to_string(),
                link: ControlLink::new(owner),
                self_handle: weak.clone(),
                location: RefCell::new(None),
            }
        })
    }

    /// Creates a character and places it at `location`, silently.
    pub fn spawn(name: &str, location: &Rc<Location>) -> Rc<Self> {
        let character = Self::new(name);
        *character.location.borrow_mut() = Some(Rc::clone(location));
        location.add_occupant(&character);
        character
    }

    pub fn location(&self) -> Option<Rc<Location>> {
        self.location.borrow().clone()
    }

    /// Sends a message to whoever controls this character. Dropped when
    /// detached.
    pub fn message(&self, message: Message) {
        if let Some(controller) = self.link.controller() {
            controller.write_msg(message);
        }
    }

    /// Moves the character to `destination`.
    ///
    /// With a `traversed_exit`, the move is announced: the old location hears
    /// a departure line naming the exit, the new one hears an arrival line.
    /// Without one, the move is silent. Moving to the current location is a
    /// no-op.
    pub fn set_location(&self, destination: &Rc<Location>, traversed_exit: Option<&str>) {
        if let Some(current) = self.location() {
            if Rc::ptr_eq(&current, destination) {
                return;
            }
            current.remove_occupant(self);
            if let Some(exit) = traversed_exit {
                current.broadcast(&format!("{} leaves through {}.", self.name, exit));
            }
        }
        if traversed_exit.is_some() {
            destination.broadcast(&format!("{} arrives.", self.name));
        }
        *self.location.borrow_mut() = Some(Rc::clone(destination));
        if let Some(this) = self.self_handle.upgrade() {
            destination.add_occupant(&this);
        }
    }

    fn dispatch(&self, line: &str) -> Result<(), CommandError> {
        let (name, args) = match line.split_once(' ') {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let spec = COMMANDS
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| CommandError::Unrecognized(name.to_string()))?;
        (spec.handler)(self, args)
    }

    fn cmd_help(&self, args: &str) -> Result<(), CommandError> {
        if args.is_empty() {
            let menu = COMMANDS
                .iter()
                .map(|spec| spec.name)
                .collect::<Vec<_>>()
                .join("\t");
            self.message(format!("[Character Commands]\n{}", menu));
            return Ok(());
        }
        let name = args.split_whitespace().next().unwrap_or(args);
        let spec = COMMANDS
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| CommandError::Unrecognized(name.to_string()))?;
        self.message(format!("{}\nusage: {}", spec.summary, spec.usage));
        Ok(())
    }

    fn cmd_look(&self, _args: &str) -> Result<(), CommandError> {
        let location = self.location().ok_or(CommandError::Nowhere)?;
        self.message(location.describe());
        let exits = location.exit_names();
        let listing = if exits.is_empty() {
            "None".to_string()
        } else {
            exits.join(", ")
        };
        self.message(format!("Exits Available:\n{}", listing));
        Ok(())
    }

    fn cmd_say(&self, args: &str) -> Result<(), CommandError> {
        let location = self.location().ok_or(CommandError::Nowhere)?;
        location.broadcast(&format!("{} : {}", self.name, args));
        Ok(())
    }

    fn cmd_walk(&self, args: &str) -> Result<(), CommandError> {
        let location = self.location().ok_or(CommandError::Nowhere)?;
        let exit_name = args.split_whitespace().next().unwrap_or("");
        let destination = location
            .exit(exit_name)
            .ok_or_else(|| CommandError::NoSuchExit(exit_name.to_string()))?;
        self.set_location(&destination, Some(exit_name));
        self.cmd_look("")
    }
}

impl Receiver for Character {
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

    /// Drains every gated command. Blank lines are skipped; a failing
    /// command reports its error text to the controller and the pass
    /// continues with the next command.
    fn update(&self) {
        let Some(controller) = self.link.controller() else {
            return;
        };
        while let Some(line) = controller.try_read_cmd() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("{} runs '{}'", self.name, line);
            if let Err(error) = self.dispatch(line) {
                controller.write_msg(error.to_string());
            }
        }
    }
}
