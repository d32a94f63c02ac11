//! Explicit session registry and the push-triggered update cycle.

use std::rc::Rc;

use indexmap::IndexMap;
use log::info;
use thiserror::Error;

use crate::controller::{Controller, Message};
use crate::player::{Player, SessionId};

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("session id {0} already taken")]
    SessionTaken(SessionId),
    #[error("unknown session id {0}")]
    UnknownSession(SessionId),
}

/// Insertion-ordered mapping from session id to [`Player`].
///
/// The registry is an explicit object owned by the caller; there is no
/// ambient process-wide player table. It does no locking either: the whole
/// crate assumes a single cooperative thread of control, and callers
/// serialize access externally.
#[derive(Default)]
pub struct PlayerRegistry {
    players: IndexMap<SessionId, Rc<Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: IndexMap::new(),
        }
    }

    /// Registers an existing player under its session id.
    ///
    /// Fails with [`ControlError::SessionTaken`] when the id is already
    /// present; the registry is unchanged on failure.
    pub fn register(&mut self, player: Rc<Player>) -> Result<(), ControlError> {
        let session = player.session_id();
        if self.players.contains_key(&session) {
            return Err(ControlError::SessionTaken(session));
        }
        info!("session {} connected", session);
        self.players.insert(session, player);
        Ok(())
    }

    /// Creates and registers a player in one step; the usual connect path.
    pub fn connect(&mut self, session: SessionId) -> Result<Rc<Player>, ControlError> {
        let player = Player::new(session);
        self.register(Rc::clone(&player))?;
        Ok(player)
    }

    /// Enqueues one command line for `session`, then synchronously runs one
    /// full update pass of the attached receiver before returning.
    ///
    /// The trigger is what keeps the blocking `read_cmd` path cold: every
    /// command enqueued before this call has been offered to the receiver
    /// by the time it returns. A player with no receiver keeps the command
    /// queued for the first trigger after attachment.
    pub fn send_command(&self, session: SessionId, text: &str) -> Result<(), ControlError> {
        let player = self
            .players
            .get(&session)
            .ok_or(ControlError::UnknownSession(session))?;
        player.push_command(text.to_string());
        if let Some(receiver) = player.receiver() {
            receiver.update();
        }
        Ok(())
    }

    /// Drains every registered player's outbound queue once, in
    /// registration order.
    ///
    /// The iterator is lazy: pairs not consumed stay queued, so dropping it
    /// early loses nothing.
    pub fn receive_messages(&self) -> impl Iterator<Item = (SessionId, Message)> + '_ {
        self.players.iter().flat_map(|(session, player)| {
            let session = *session;
            let player = Rc::clone(player);
            std::iter::from_fn(move || player.take_message().map(|message| (session, message)))
        })
    }

    /// Detaches the player's receiver if present, then deletes the entry.
    ///
    /// Only the lookup can fail, so removing the same session twice errors
    /// the second time.
    pub fn remove_player(&mut self, session: SessionId) -> Result<(), ControlError> {
        let player = self
            .players
            .get(&session)
            .cloned()
            .ok_or(ControlError::UnknownSession(session))?;
        if let Some(receiver) = player.receiver() {
            receiver.detach();
        }
        self.players.shift_remove(&session);
        info!("session {} disconnected", session);
        Ok(())
    }

    pub fn get(&self, session: SessionId) -> Option<Rc<Player>> {
        self.players.get(&session).cloned()
    }

    /// Registered session ids, in registration order.
    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.players.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
