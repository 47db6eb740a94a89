use crate::game::{self, CardAudit, Game, JoinError, Player};
use crate::generator::{CardGenerator, GeneratedCard};
use crate::store::{GameStore, GameSummary, HistoryEntry, StoreError};
use crate::template::CardTemplate;

/// Everything an organizer runs a night of bingo with: the game registry plus
/// a card generator. Safe to share across threads; concurrent joins generate
/// their cards in parallel and only the final commit is serialized.
pub struct GameHost {
    store: GameStore,
    generator: CardGenerator,
}

/// Parameters for registering a new game.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub gid: String,
    pub template: CardTemplate,
    pub player_limit: usize,
    pub max_cards_per_player: usize,
}

/// What a successful join hands back: the player's PIN and their finished
/// cards, ready for the delivery channel.
#[derive(Debug)]
pub struct JoinReceipt {
    pub pin: String,
    pub cards: Vec<GeneratedCard>,
}

/// Snapshot returned by `end_game`, for broadcasting the result.
#[derive(Debug)]
pub struct EndedGame {
    pub gid: String,
    pub winner: Option<String>,
    pub players: Vec<Player>,
}

impl GameHost {
    pub fn new(generator: CardGenerator) -> Self {
        Self { store: GameStore::new(), generator }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn create_game(&self, new_game: NewGame) -> Result<(), StoreError> {
        let NewGame { gid, template, player_limit, max_cards_per_player } = new_game;
        self.store.create(Game::new(gid, template, player_limit, max_cards_per_player))
    }

    /// The whole join flow: admission preflight, card generation outside the
    /// store lock, PIN issue, atomic commit. Nothing is recorded unless every
    /// requested card generated and the admission checks still hold.
    pub fn join_game(&self, gid: &str, psid: &str, name: &str, cards: usize) -> Result<JoinReceipt, JoinError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JoinError::EmptyName);
        }
        let template = self.store.join_preflight(gid, psid, cards)?;

        let mut generated = Vec::with_capacity(cards);
        for _ in 0..cards {
            generated.push(self.generator.generate(&template, name)?);
        }

        let pin = game::new_pin(&mut rand::rng());
        let player = Player {
            psid: psid.to_string(),
            name: name.to_string(),
            pin: pin.clone(),
            cards: generated.iter().map(|c| CardAudit { numbers: c.numbers.clone() }).collect(),
        };
        self.store.commit_join(gid, player)?;
        Ok(JoinReceipt { pin, cards: generated })
    }

    pub fn end_game(&self, gid: &str, winner: Option<&str>) -> Result<EndedGame, StoreError> {
        let players = self.store.end(gid, winner)?;
        Ok(EndedGame {
            gid: gid.to_string(),
            winner: winner.map(str::to_string),
            players,
        })
    }

    pub fn list_active(&self) -> Vec<GameSummary> {
        self.store.active_games()
    }

    /// Resolve a live-page PIN to its game and player.
    pub fn validate_pin(&self, pin: &str) -> Option<(String, Player)> {
        self.store.find_by_pin(pin)
    }

    pub fn remove_player(&self, gid: &str, psid: &str) -> Result<Player, StoreError> {
        self.store.remove_player(gid, psid)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.store.history()
    }
}
