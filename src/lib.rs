//! Roborace - deterministic engine for a robot racing board game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (cards, decks, board, robots, resolver)
//! - `engine`: Round state machine and client barriers
//! - `client`: Abstract client contract (bots, local players, remote players)
//! - `settings`: Data-driven game configuration
//! - `gamelog`: Human-readable match log

pub mod bot;
pub mod client;
pub mod engine;
pub mod gamelog;
pub mod settings;
pub mod sim;

pub use client::{AnimationKind, Client};
pub use engine::{EngineState, GameEngine, PendingInput, RoundStep};
pub use gamelog::{GameLog, LogKind};
pub use settings::{GameConfig, GameMode, StartPosition};

/// Rule constants
pub mod consts {
    /// Max number of life tokens a robot can carry
    pub const MAX_LIFE_TOKENS: u8 = 6;
    /// A robot is destroyed when it collects this many damage tokens
    pub const MAX_DAMAGE_TOKENS: u8 = 10;
    /// Hand slots per participant
    pub const HAND_SIZE: usize = 9;
    /// Program slots per participant
    pub const PROGRAM_SIZE: usize = 5;
    /// Cards dealt per round before the damage malus
    pub const CARDS_PER_ROUND: u8 = 9;
    /// Program phases resolved per round
    pub const PHASES_PER_ROUND: u8 = 5;
    /// Max participants on one board
    pub const MAX_PLAYERS: usize = 8;
    /// Total cards in a freshly loaded supply
    pub const SUPPLY_SIZE: usize = 84;
}
