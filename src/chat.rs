use rand::Rng;

use crate::game::JoinError;
use crate::generator::GeneratedCard;
use crate::host::{EndedGame, GameHost};
use crate::store::GameSummary;

/// Transport boundary for outbound messages: a messenger API, an HTTP
/// response, a test recorder. The bot never sends anything except through
/// this trait.
pub trait Delivery {
    fn send_text(&self, psid: &str, text: &str);
    fn send_card(&self, psid: &str, card: &GeneratedCard);
}

pub const NO_ACTIVE_GAMES_MSG: &str =
    "There are no active games right now. Please check back later!";
pub const GAME_FULL_MSG: &str =
    "Sorry, that game is full! Please try another game or check back later.";
pub const INVALID_GAME_ID_MSG: &str =
    "Sorry, that game ID is not valid. Please check the ID and try again.";
pub const GAME_ENDED_MSG: &str =
    "Sorry, that game has already ended. Type anything to see what's open!";
pub const ALREADY_JOINED_MSG: &str =
    "You've already joined that game! Your cards were sent when you joined.";
pub const JOIN_INSTRUCTION_MSG: &str = "To join, please type 'join [Your Name] [Game ID]'";
pub const GENERATION_FAILED_MSG: &str = "Sorry, I couldn't generate your card. Please try again.";

const GREETINGS: [&str; 3] = [
    "Hey there! We currently have these games open:",
    "Hi! Here are the active games:",
    "Hello! Ready to play? Here's what's open:",
];

pub fn game_over_message(winner: &str) -> String {
    format!("Congratulations, {winner} is the winner! Hope you all had a blast!")
}

/// What an inbound text asks for. The grammar is
/// `join <Name> <GameId> [cards]`; anything else lists the open games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Join { name: String, gid: String, cards: usize },
    JoinHelp,
    ListGames,
}

pub fn parse_command(text: &str) -> ChatCommand {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if !parts.first().is_some_and(|t| t.eq_ignore_ascii_case("join")) {
        return ChatCommand::ListGames;
    }
    if parts.len() < 3 {
        return ChatCommand::JoinHelp;
    }
    // trailing tokens beyond the optional card count are ignored
    let cards = parts.get(3).and_then(|t| t.parse::<usize>().ok()).unwrap_or(1);
    ChatCommand::Join {
        name: parts[1].to_string(),
        gid: parts[2].to_string(),
        cards,
    }
}

/// The rotating open-games list the bot answers small talk with.
pub fn game_list_message<R: Rng + ?Sized>(summaries: &[GameSummary], rng: &mut R) -> String {
    if summaries.is_empty() {
        return NO_ACTIVE_GAMES_MSG.to_string();
    }
    let greeting = GREETINGS[rng.random_range(0..GREETINGS.len())];
    let blocks: Vec<String> = summaries
        .iter()
        .map(|s| {
            format!(
                "Game ID: {}\nPlayers: {}/{}\nSlots Left: {}",
                s.gid, s.player_count, s.player_limit, s.slots_left
            )
        })
        .collect();
    format!("{greeting}\n\n{}", blocks.join("\n\n"))
}

/// Map a join failure onto the bot's canned replies.
pub fn join_error_reply(err: &JoinError) -> String {
    match err {
        JoinError::NotFound(_) => INVALID_GAME_ID_MSG.to_string(),
        JoinError::Inactive(_) => GAME_ENDED_MSG.to_string(),
        JoinError::Full => GAME_FULL_MSG.to_string(),
        JoinError::AlreadyJoined => ALREADY_JOINED_MSG.to_string(),
        JoinError::EmptyName | JoinError::NoCardsRequested => JOIN_INSTRUCTION_MSG.to_string(),
        JoinError::TooManyCards { max, .. } => {
            format!("You can ask for at most {max} cards in this game.")
        }
        JoinError::Generation(_) => GENERATION_FAILED_MSG.to_string(),
    }
}

/// Webhook-shaped entry point: one inbound text from `psid`, zero or more
/// outbound sends through `delivery`.
pub fn handle_message<D: Delivery>(host: &GameHost, delivery: &D, psid: &str, text: &str) {
    match parse_command(text) {
        ChatCommand::ListGames => {
            let reply = game_list_message(&host.list_active(), &mut rand::rng());
            delivery.send_text(psid, &reply);
        }
        ChatCommand::JoinHelp => delivery.send_text(psid, JOIN_INSTRUCTION_MSG),
        ChatCommand::Join { name, gid, cards } => match host.join_game(&gid, psid, &name, cards) {
            Ok(receipt) => {
                for card in &receipt.cards {
                    delivery.send_card(psid, card);
                }
                let cards = match receipt.cards.len() {
                    1 => "Here is your card".to_string(),
                    n => format!("Here are your {n} cards"),
                };
                delivery.send_text(
                    psid,
                    &format!("You're in, {name}! {cards}. Your PIN is {}.", receipt.pin),
                );
            }
            Err(err) => delivery.send_text(psid, &join_error_reply(&err)),
        },
    }
}

/// Tell every player the game is over (and who won, when there is a winner).
pub fn broadcast_game_over<D: Delivery>(delivery: &D, ended: &EndedGame) {
    let text = match &ended.winner {
        Some(winner) => game_over_message(winner),
        None => format!("Game {} has ended. Thanks for playing!", ended.gid),
    };
    for player in &ended.players {
        delivery.send_text(&player.psid, &text);
    }
}
