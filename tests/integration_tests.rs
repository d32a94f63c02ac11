//! Integration tests for the control core and the world layer
//!
//! These tests validate cross-crate behavior through the public API only:
//! sessions in a registry, characters in a built world, and the composite
//! controller/receiver topologies wired together the way the console
//! binary wires them.

use control::{
    assume_control, ControlError, ControllerRef, MultiController, Multireceiver, Player,
    PlayerRegistry, Receiver, ReceiverRef, SessionId,
};
use std::rc::Rc;
use world::{demo_spec, Character, World};

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    /// Tests the full connect, command, feedback cycle for one session
    #[test]
    fn connect_command_feedback_cycle() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (_player, _character) = connect_character(&mut registry, &world, 1, "Alice");

        registry.send_command(1, "look").unwrap();

        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 1),
            vec![
                "Fountain Square\nA broad plaza around a dry stone fountain.".to_string(),
                "Exits Available:\nnorth, east".to_string(),
            ]
        );
    }

    /// Tests FIFO processing with error reports kept in command order
    #[test]
    fn commands_before_trigger_run_in_fifo_order() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (player, _character) = connect_character(&mut registry, &world, 1, "Alice");

        player.push_command("say one".to_string());
        player.push_command("frobnicate".to_string());
        registry.send_command(1, "say two").unwrap();

        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 1),
            vec![
                "Alice : one".to_string(),
                "Command 'frobnicate' not recognized.".to_string(),
                "Alice : two".to_string(),
            ],
            "errors must be reported in place, not at the end"
        );
    }

    /// Tests that a send to an unknown session fails without side effects
    #[test]
    fn unknown_session_is_rejected_without_side_effects() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (_player, _character) = connect_character(&mut registry, &world, 1, "Alice");

        let result = registry.send_command(99, "look");

        assert_eq!(result, Err(ControlError::UnknownSession(99)));
        assert!(
            drain(&registry).is_empty(),
            "no queue may change on a failed send"
        );
    }

    /// Tests that disconnecting releases the character in both directions
    #[test]
    fn quit_releases_the_character() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (_player, character) = connect_character(&mut registry, &world, 1, "Alice");

        registry.remove_player(1).unwrap();

        assert!(character.controller().is_none());
        assert_eq!(
            registry.send_command(1, "look"),
            Err(ControlError::UnknownSession(1))
        );
    }

    /// Tests that a session id can be reused after a disconnect
    #[test]
    fn session_id_is_reusable_after_quit() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (_player, _character) = connect_character(&mut registry, &world, 1, "Alice");

        registry.remove_player(1).unwrap();
        let (_second_player, _second_character) =
            connect_character(&mut registry, &world, 1, "Anna");

        registry.send_command(1, "say back again").unwrap();
        let drained = drain(&registry);
        assert!(messages_for(&drained, 1).contains(&"Anna : back again".to_string()));
    }
}

/// JOINT CONTROL TESTS
mod joint_control_tests {
    use super::*;

    /// Tests two sessions jointly driving one entity with broadcast feedback
    #[test]
    fn two_sessions_drive_one_character() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let first = registry.connect(1).unwrap();
        let second = registry.connect(2).unwrap();
        let golem = world.spawn("Golem");
        let joint: ControllerRef =
            MultiController::new(vec![first as ControllerRef, second as ControllerRef]);
        assume_control(&joint, &(golem.clone() as ReceiverRef));

        registry.send_command(1, "say one speaks").unwrap();
        registry.send_command(2, "say two speaks").unwrap();

        let drained = drain(&registry);
        let expected = vec![
            "Golem : one speaks".to_string(),
            "Golem : two speaks".to_string(),
        ];
        assert_eq!(messages_for(&drained, 1), expected, "feedback reaches member 1");
        assert_eq!(messages_for(&drained, 2), expected, "feedback reaches member 2");
    }

    /// Tests that one trigger drains nested composites in flattened order
    #[test]
    fn nested_composite_drains_in_flattened_order() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let first = registry.connect(1).unwrap();
        let second = registry.connect(2).unwrap();
        let third = registry.connect(3).unwrap();
        let golem = world.spawn("Golem");
        let inner: ControllerRef = MultiController::new(vec![
            second.clone() as ControllerRef,
            third.clone() as ControllerRef,
        ]);
        let joint: ControllerRef =
            MultiController::new(vec![first.clone() as ControllerRef, inner]);
        assume_control(&joint, &(golem.clone() as ReceiverRef));

        second.push_command("say two".to_string());
        third.push_command("say three".to_string());
        registry.send_command(1, "say one").unwrap();

        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 1),
            vec![
                "Golem : one".to_string(),
                "Golem : two".to_string(),
                "Golem : three".to_string(),
            ],
            "flattened registration order, no matter how the set was nested"
        );
    }
}

/// GROUP CONTROL TESTS
mod group_control_tests {
    use super::*;

    /// Tests that identical member reports collapse into one labeled block
    #[test]
    fn identical_member_reports_merge_into_one_labeled_block() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let market = world.location("Market Row").unwrap();
        let castor = Character::spawn("Castor", market);
        let pollux = Character::spawn("Pollux", market);
        let twins =
            Multireceiver::new("Twins", vec![castor as ReceiverRef, pollux as ReceiverRef]);
        let carol = registry.connect(3).unwrap();
        assume_control(&(carol as ControllerRef), &(twins.clone() as ReceiverRef));

        registry.send_command(3, "look").unwrap();

        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 3),
            vec![
                "[Castor]".to_string(),
                "Market Row\nEmpty stalls and the smell of old spice.".to_string(),
                "Exits Available:\nwest".to_string(),
            ],
            "the second twin's identical report is suppressed"
        );
    }

    /// Tests header grouping: one per speaker run, a new one per change
    #[test]
    fn distinct_member_reports_get_their_own_headers() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let market = world.location("Market Row").unwrap();
        let library = world.location("Old Library").unwrap();
        let castor = Character::spawn("Castor", market);
        let walker = Character::spawn("Walker", library);
        let pair =
            Multireceiver::new("Pair", vec![castor as ReceiverRef, walker as ReceiverRef]);
        let carol = registry.connect(3).unwrap();
        assume_control(&(carol as ControllerRef), &(pair.clone() as ReceiverRef));

        registry.send_command(3, "look").unwrap();

        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 3),
            vec![
                "[Castor]".to_string(),
                "Market Row\nEmpty stalls and the smell of old spice.".to_string(),
                "Exits Available:\nwest".to_string(),
                "[Walker]".to_string(),
                "Old Library\nShelves lean together under a cracked skylight.".to_string(),
                "Exits Available:\nsouth".to_string(),
            ]
        );
    }

    /// Tests eviction on takeover and rerouting to the new controller
    #[test]
    fn takeover_evicts_member_and_rival_hears_it_instead() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let rival = registry.connect(1).unwrap();
        let market = world.location("Market Row").unwrap();
        let castor = Character::spawn("Castor", market);
        let pollux = Character::spawn("Pollux", market);
        let twins = Multireceiver::new(
            "Twins",
            vec![castor as ReceiverRef, pollux.clone() as ReceiverRef],
        );
        let carol = registry.connect(3).unwrap();
        assume_control(&(carol as ControllerRef), &(twins.clone() as ReceiverRef));

        assume_control(&(rival as ControllerRef), &(pollux.clone() as ReceiverRef));
        registry.send_command(3, "say psst").unwrap();

        assert_eq!(twins.member_count(), 1);
        assert_eq!(twins.window_capacity(), 1);
        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 3),
            vec![
                "Lost connection with Pollux".to_string(),
                "[Castor]".to_string(),
                "Castor : psst".to_string(),
            ]
        );
        assert_eq!(
            messages_for(&drained, 1),
            vec!["Castor : psst".to_string()],
            "the grabbed member now reports to its new controller"
        );
    }
}

/// WORLD CONSTRUCTION TESTS
mod world_tests {
    use super::*;

    /// Tests that a world parsed from JSON is fully walkable
    #[test]
    fn world_built_from_json_is_walkable() {
        let text = r#"{
            "start": "Gate",
            "locations": [
                { "name": "Gate", "description": "A rusted gate.",
                  "exits": [ { "name": "in", "to": "Yard" } ] },
                { "name": "Yard", "description": "Knee-high grass.",
                  "exits": [ { "name": "out", "to": "Gate" } ] }
            ]
        }"#;
        let spec: world::WorldSpec = serde_json::from_str(text).unwrap();
        let world = World::build(&spec).unwrap();
        let mut registry = PlayerRegistry::new();
        let (_player, character) = connect_character(&mut registry, &world, 1, "Alice");

        registry.send_command(1, "walk in").unwrap();

        assert_eq!(
            character.location().map(|l| l.name().to_string()),
            Some("Yard".to_string())
        );
        let drained = drain(&registry);
        assert_eq!(
            messages_for(&drained, 1),
            vec![
                "Yard\nKnee-high grass.".to_string(),
                "Exits Available:\nout".to_string(),
            ]
        );
    }

    /// Tests that construction rejects an exit to a missing location
    #[test]
    fn world_validation_rejects_dangling_exit() {
        let mut spec = demo_spec();
        spec.locations[1].exits.push(world::ExitSpec {
            name: "trapdoor".to_string(),
            to: "The Vault".to_string(),
        });

        assert!(World::build(&spec).is_err());
    }

    /// Tests location broadcast between independently controlled characters
    #[test]
    fn colocated_characters_hear_each_other() {
        let world = demo_world();
        let mut registry = PlayerRegistry::new();
        let (_first_player, _alice) = connect_character(&mut registry, &world, 1, "Alice");
        let (_second_player, _bob) = connect_character(&mut registry, &world, 2, "Bob");

        registry.send_command(1, "say anyone here").unwrap();

        let drained = drain(&registry);
        assert_eq!(messages_for(&drained, 1), vec!["Alice : anyone here".to_string()]);
        assert_eq!(messages_for(&drained, 2), vec!["Alice : anyone here".to_string()]);
    }
}

// HELPER FUNCTIONS

fn demo_world() -> World {
    World::build(&demo_spec()).unwrap()
}

fn connect_character(
    registry: &mut PlayerRegistry,
    world: &World,
    session: SessionId,
    name: &str,
) -> (Rc<Player>, Rc<Character>) {
    let player = registry.connect(session).unwrap();
    let character = world.spawn(name);
    let controller: ControllerRef = player.clone();
    let receiver: ReceiverRef = character.clone();
    assume_control(&controller, &receiver);
    (player, character)
}

fn drain(registry: &PlayerRegistry) -> Vec<(SessionId, String)> {
    registry.receive_messages().collect()
}

fn messages_for(drained: &[(SessionId, String)], session: SessionId) -> Vec<String> {
    drained
        .iter()
        .filter(|(from, _)| *from == session)
        .map(|(_, message)| message.clone())
        .collect()
}
