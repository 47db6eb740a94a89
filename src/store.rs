use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::game::{Game, JoinError, Player};
use crate::template::CardTemplate;

/// Listing row for the open-games view (chat lists, dashboards).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub gid: String,
    pub player_count: usize,
    pub player_limit: usize,
    pub slots_left: usize,
    pub live_url: Option<String>,
}

/// Row for the ended-games history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub gid: String,
    pub winner: Option<String>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("game id cannot be empty")]
    EmptyGameId,
    #[error("a game with id {0:?} already exists")]
    DuplicateGame(String),
    #[error("no game with id {0:?}")]
    NotFound(String),
    #[error("game {0:?} has already ended")]
    AlreadyEnded(String),
    #[error("no player {psid:?} in game {gid:?}")]
    NoSuchPlayer { gid: String, psid: String },
}

/// In-memory registry of games. Every read and write goes through one lock,
/// and every lifecycle transition is an explicit operation; nothing else in
/// the crate holds game state.
#[derive(Debug, Default)]
pub struct GameStore {
    games: Mutex<HashMap<String, Game>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new game. Ended games keep their id reserved, so a gid can
    /// never refer to two different games over the store's lifetime.
    pub fn create(&self, game: Game) -> Result<(), StoreError> {
        if game.gid.trim().is_empty() {
            return Err(StoreError::EmptyGameId);
        }
        let mut games = self.games.lock();
        if games.contains_key(&game.gid) {
            return Err(StoreError::DuplicateGame(game.gid));
        }
        info!(
            "game {} created (player limit {}, up to {} cards per player)",
            game.gid, game.player_limit, game.max_cards_per_player
        );
        games.insert(game.gid.clone(), game);
        Ok(())
    }

    pub fn get(&self, gid: &str) -> Option<Game> {
        self.games.lock().get(gid).cloned()
    }

    pub fn active_games(&self) -> Vec<GameSummary> {
        let games = self.games.lock();
        let mut summaries: Vec<GameSummary> = games
            .values()
            .filter(|g| g.is_active())
            .map(|g| GameSummary {
                gid: g.gid.clone(),
                player_count: g.players.len(),
                player_limit: g.player_limit,
                slots_left: g.slots_left(),
                live_url: g.live_url.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.gid.cmp(&b.gid));
        summaries
    }

    /// Admission check plus a template clone, so card generation can run
    /// outside the lock. `commit_join` re-validates before recording anything.
    pub fn join_preflight(&self, gid: &str, psid: &str, requested_cards: usize) -> Result<CardTemplate, JoinError> {
        let games = self.games.lock();
        let game = games.get(gid).ok_or_else(|| JoinError::NotFound(gid.to_string()))?;
        game.check_join(psid, requested_cards)?;
        Ok(game.template.clone())
    }

    /// Atomically re-validate admission and record the player. A player who
    /// lost a race since preflight is rejected here with nothing recorded.
    pub fn commit_join(&self, gid: &str, player: Player) -> Result<(), JoinError> {
        let mut games = self.games.lock();
        let game = games.get_mut(gid).ok_or_else(|| JoinError::NotFound(gid.to_string()))?;
        let psid = player.psid.clone();
        let cards = player.cards.len();
        game.admit(player)?;
        info!("player {} joined game {} with {} cards", psid, gid, cards);
        Ok(())
    }

    /// Flip a game to inactive, record the winner, and hand back the player
    /// list so the caller can notify everyone.
    pub fn end(&self, gid: &str, winner: Option<&str>) -> Result<Vec<Player>, StoreError> {
        let mut games = self.games.lock();
        let game = games.get_mut(gid).ok_or_else(|| StoreError::NotFound(gid.to_string()))?;
        if !game.is_active() {
            return Err(StoreError::AlreadyEnded(gid.to_string()));
        }
        game.end(winner);
        info!("game {} ended, winner: {}", gid, winner.unwrap_or("none"));
        Ok(game.players.clone())
    }

    pub fn remove_player(&self, gid: &str, psid: &str) -> Result<Player, StoreError> {
        let mut games = self.games.lock();
        let game = games.get_mut(gid).ok_or_else(|| StoreError::NotFound(gid.to_string()))?;
        let player = game.remove_player(psid).ok_or_else(|| StoreError::NoSuchPlayer {
            gid: gid.to_string(),
            psid: psid.to_string(),
        })?;
        info!("player {} removed from game {}", psid, gid);
        Ok(player)
    }

    pub fn set_live_url(&self, gid: &str, url: &str) -> Result<(), StoreError> {
        let mut games = self.games.lock();
        let game = games.get_mut(gid).ok_or_else(|| StoreError::NotFound(gid.to_string()))?;
        game.live_url = Some(url.to_string());
        Ok(())
    }

    /// Look a player up by PIN across all games. PINs are not globally unique;
    /// the first match wins, which is all the live page needs.
    pub fn find_by_pin(&self, pin: &str) -> Option<(String, Player)> {
        let games = self.games.lock();
        for game in games.values() {
            if let Some(player) = game.players.iter().find(|p| p.pin == pin) {
                return Some((game.gid.clone(), player.clone()));
            }
        }
        None
    }

    /// Ended games, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let games = self.games.lock();
        let mut entries: Vec<HistoryEntry> = games
            .values()
            .filter_map(|g| {
                let ended_at = g.ended_at?;
                Some(HistoryEntry { gid: g.gid.clone(), winner: g.winner.clone(), ended_at })
            })
            .collect();
        entries.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        entries
    }
}
