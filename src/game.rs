use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::generator::{GenerateError, PlacedNumber};
use crate::template::CardTemplate;

/// Lifecycle of a game: joinable while active, frozen once ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Inactive,
}

/// Audit record kept per generated card: the numbers that were stamped on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAudit {
    pub numbers: Vec<PlacedNumber>,
}

/// One admitted player. `psid` is the delivery channel's sender id; the PIN is
/// the player's credential for the live game page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub psid: String,
    pub name: String,
    pub pin: String,
    pub cards: Vec<CardAudit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub gid: String,
    pub template: CardTemplate,
    pub player_limit: usize,
    pub max_cards_per_player: usize,
    pub status: GameStatus,
    pub players: Vec<Player>,
    pub winner: Option<String>,
    pub live_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Everything that can go wrong between "join Alice game1" and a recorded
/// player holding cards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("no game with id {0:?}")]
    NotFound(String),
    #[error("game {0} is no longer active")]
    Inactive(String),
    #[error("player already joined this game")]
    AlreadyJoined,
    #[error("game is full")]
    Full,
    #[error("player name cannot be empty")]
    EmptyName,
    #[error("must request at least one card")]
    NoCardsRequested,
    #[error("requested {requested} cards, the limit is {max} per player")]
    TooManyCards { requested: usize, max: usize },
    #[error("card generation failed: {0}")]
    Generation(#[from] GenerateError),
}

impl Game {
    pub fn new(gid: String, template: CardTemplate, player_limit: usize, max_cards_per_player: usize) -> Self {
        Self {
            gid,
            template,
            player_limit,
            max_cards_per_player,
            status: GameStatus::Active,
            players: Vec::new(),
            winner: None,
            live_url: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn slots_left(&self) -> usize {
        self.player_limit.saturating_sub(self.players.len())
    }

    /// Admission rules, shared by the preflight check and the final commit.
    pub fn check_join(&self, psid: &str, requested_cards: usize) -> Result<(), JoinError> {
        if !self.is_active() {
            return Err(JoinError::Inactive(self.gid.clone()));
        }
        if self.players.iter().any(|p| p.psid == psid) {
            return Err(JoinError::AlreadyJoined);
        }
        if self.slots_left() == 0 {
            return Err(JoinError::Full);
        }
        if requested_cards == 0 {
            return Err(JoinError::NoCardsRequested);
        }
        if requested_cards > self.max_cards_per_player {
            return Err(JoinError::TooManyCards {
                requested: requested_cards,
                max: self.max_cards_per_player,
            });
        }
        Ok(())
    }

    /// Re-check admission and record the player. The check runs again here so
    /// that a player who lost a race since preflight is turned away with
    /// nothing recorded.
    pub fn admit(&mut self, player: Player) -> Result<(), JoinError> {
        self.check_join(&player.psid, player.cards.len())?;
        self.players.push(player);
        Ok(())
    }

    pub fn end(&mut self, winner: Option<&str>) {
        self.status = GameStatus::Inactive;
        self.winner = winner.map(str::to_string);
        self.ended_at = Some(Utc::now());
    }

    pub fn player(&self, psid: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.psid == psid)
    }

    pub fn remove_player(&mut self, psid: &str) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.psid == psid)?;
        Some(self.players.remove(idx))
    }
}

/// Four-digit access PIN for the live game page. Not globally unique; a PIN
/// only identifies a player together with their game.
pub fn new_pin<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.random_range(1000..10000).to_string()
}
