//! Bingo party-game backend: per-card number drawing and card image
//! rendering, the in-memory game registry around them, and the chat-bot
//! join flow on top.

pub mod card_renderer;
pub mod chat;
pub mod column;
pub mod draw;
pub mod game;
pub mod generator;
pub mod host;
pub mod store;
pub mod template;

pub use column::{Column, InvalidColumn, POOL_SIZE};
pub use generator::{CardGenerator, GenerateError, GeneratedCard, PlacedNumber, draw_card_numbers};
pub use host::{GameHost, JoinReceipt, NewGame};
pub use store::GameStore;
pub use template::{BallSlot, CardTemplate, NameSlot, TemplateError};
