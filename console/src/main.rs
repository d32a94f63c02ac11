//! Interactive console driver: the local stand-in for a network transport.
//!
//! Line protocol, one request per line:
//! `connect <id> <name>` creates a session and a character for it,
//! `quit <id>` tears the session down, and any line starting with a
//! session id sends the rest to that session's entity. After every line
//! all pending feedback is drained and printed as `[id] message`.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::info;

use control::{
    assume_control, ControlError, ControllerRef, MultiController, Multireceiver, PlayerRegistry,
    ReceiverRef, SessionId,
};
use world::{demo_spec, Character, World};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON world file; the built-in demo world when omitted
    #[arg(short, long)]
    world: Option<PathBuf>,

    /// Run a scripted tour of the control topologies and exit
    #[arg(long)]
    demo: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Request {
    Connect { session: SessionId, name: String },
    Quit { session: SessionId },
    Send { session: SessionId, text: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let world = match &args.world {
        Some(path) => World::load(path)?,
        None => World::build(&demo_spec())?,
    };
    info!("world ready");

    if args.demo {
        return run_demo(&world);
    }
    run_console(&world)
}

fn run_console(world: &World) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = PlayerRegistry::new();
    let mut characters: HashMap<SessionId, Rc<Character>> = HashMap::new();

    println!("commands: connect <id> <name> | quit <id> | <id> <command...> | exit");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }
        match parse_request(trimmed) {
            Ok(request) => {
                if let Err(error) = apply(request, world, &mut registry, &mut characters) {
                    println!("error: {}", error);
                }
            }
            Err(reason) => println!("error: {}", reason),
        }
        drain(&registry);
    }
    Ok(())
}

fn apply(
    request: Request,
    world: &World,
    registry: &mut PlayerRegistry,
    characters: &mut HashMap<SessionId, Rc<Character>>,
) -> Result<(), ControlError> {
    match request {
        Request::Connect { session, name } => {
            let player = registry.connect(session)?;
            let character = world.spawn(&name);
            let controller: ControllerRef = player;
            let receiver: ReceiverRef = character.clone();
            assume_control(&controller, &receiver);
            characters.insert(session, character);
            println!("{} joined as session {}", name, session);
            Ok(())
        }
        Request::Quit { session } => {
            registry.remove_player(session)?;
            characters.remove(&session);
            println!("session {} left", session);
            Ok(())
        }
        Request::Send { session, text } => registry.send_command(session, &text),
    }
}

fn parse_request(line: &str) -> Result<Request, String> {
    let mut parts = line.splitn(2, ' ');
    let head = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    match head {
        "connect" => {
            let mut fields = rest.splitn(2, ' ');
            let session = parse_session(fields.next().unwrap_or(""))?;
            let name = fields.next().unwrap_or("").trim();
            if name.is_empty() {
                return Err("usage: connect <id> <name>".to_string());
            }
            Ok(Request::Connect {
                session,
                name: name.to_string(),
            })
        }
        "quit" => Ok(Request::Quit {
            session: parse_session(rest)?,
        }),
        _ => {
            let session = parse_session(head)?;
            if rest.is_empty() {
                return Err(format!("usage: {} <command...>", session));
            }
            Ok(Request::Send {
                session,
                text: rest.to_string(),
            })
        }
    }
}

fn parse_session(token: &str) -> Result<SessionId, String> {
    token
        .parse::<SessionId>()
        .map_err(|_| format!("'{}' is not a session id", token))
}

fn drain(registry: &PlayerRegistry) {
    for (session, message) in registry.receive_messages() {
        for line in message.lines() {
            println!("[{}] {}", session, line);
        }
    }
}

/// Scripted tour: plain sessions, joint control, group control, takeover.
fn run_demo(world: &World) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = PlayerRegistry::new();

    println!("== two sessions, two characters ==");
    let alice_player = registry.connect(1)?;
    let alice = world.spawn("Alice");
    assume_control(
        &(alice_player.clone() as ControllerRef),
        &(alice.clone() as ReceiverRef),
    );
    let bob_player = registry.connect(2)?;
    let bob = world.spawn("Bob");
    assume_control(
        &(bob_player.clone() as ControllerRef),
        &(bob.clone() as ReceiverRef),
    );
    registry.send_command(1, "look")?;
    registry.send_command(2, "say good morning")?;
    drain(&registry);

    println!("== joint control: both sessions drive one golem ==");
    let golem = world.spawn("Golem");
    let joint: ControllerRef = MultiController::new(vec![
        alice_player.clone() as ControllerRef,
        bob_player.clone() as ControllerRef,
    ]);
    assume_control(&joint, &(golem.clone() as ReceiverRef));
    registry.send_command(1, "say i speak for both of you")?;
    registry.send_command(2, "walk north")?;
    drain(&registry);

    println!("== group control: one session drives the twins ==");
    let market = world
        .location("Market Row")
        .ok_or("demo world has no Market Row")?;
    let castor = Character::spawn("Castor", market);
    let pollux = Character::spawn("Pollux", market);
    let twins: ReceiverRef = Multireceiver::new(
        "Twins",
        vec![castor.clone() as ReceiverRef, pollux.clone() as ReceiverRef],
    );
    let carol_player = registry.connect(3)?;
    assume_control(&(carol_player.clone() as ControllerRef), &twins);
    registry.send_command(3, "look")?;
    drain(&registry);

    println!("== takeover: session 1 grabs Pollux, the group notices ==");
    assume_control(
        &(alice_player.clone() as ControllerRef),
        &(pollux.clone() as ReceiverRef),
    );
    registry.send_command(3, "say did you hear something")?;
    drain(&registry);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect() {
        assert_eq!(
            parse_request("connect 4 Alice the Bold"),
            Ok(Request::Connect {
                session: 4,
                name: "Alice the Bold".to_string()
            })
        );
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_request("quit 4"), Ok(Request::Quit { session: 4 }));
    }

    #[test]
    fn test_parse_command_line() {
        assert_eq!(
            parse_request("4 say hello there"),
            Ok(Request::Send {
                session: 4,
                text: "say hello there".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_session_id() {
        assert!(parse_request("alice say hi").is_err());
        assert!(parse_request("quit soon").is_err());
    }

    #[test]
    fn test_parse_rejects_connect_without_name() {
        assert!(parse_request("connect 4").is_err());
        assert!(parse_request("connect 4   ").is_err());
    }

    #[test]
    fn test_parse_rejects_bare_session_id() {
        assert!(parse_request("4").is_err());
    }
}
