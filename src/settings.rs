//! Game configuration
//!
//! Everything that tunes a match is collected here and handed to the engine
//! at construction time. There is no ambient/global configuration.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_LIFE_TOKENS, MAX_PLAYERS};

/// What kind of game will be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameMode {
    /// Default game, the robots race along a sequence of flag points
    #[default]
    HuntTheFlag,
    /// No flags, hunt-and-destroy; first to the kill threshold wins
    DeadOrAlive,
    /// One robot carries the flag and gains points for every round held
    KingOfTheFlag,
    /// Points for every round spent standing on the hill point
    KingOfTheHill,
}

/// Which set of starting positions is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StartPosition {
    #[default]
    Normal,
    Deathmatch,
    Virtual,
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// The game mode to play
    pub mode: GameMode,
    /// Number of players for the game
    pub player_count: u8,
    /// Which starting positions the robots are placed on
    pub start_position: StartPosition,
    /// Fill empty player slots with bots on start
    pub fill_with_bots: bool,

    // === Robot durability ===
    /// Life tokens each participant starts with (1..=MAX_LIFE_TOKENS)
    pub starting_life_tokens: u8,
    /// Robots can die as often as they like
    pub infinite_lives: bool,
    /// Damage tokens applied to a freshly respawned robot
    pub damage_on_respawn: u8,
    /// Robots take no damage at all
    pub invulnerable_robots: bool,

    // === Win thresholds ===
    /// Kills needed to win in DeadOrAlive mode
    pub kills_to_win: u16,
    /// Points needed to win KingOfTheFlag / KingOfTheHill
    pub points_to_win_king_of: f32,

    // === Rule switches ===
    /// Robots cannot push each other away
    pub pushing_disabled: bool,
    /// Robots respawn as virtual robots after each death
    pub virtual_robot_mode: bool,

    // === Presentation ===
    /// Request client animations and wait for every acknowledgement.
    /// Disabled, the machine runs each phase to completion synchronously.
    pub use_animation: bool,

    /// Seed for the engine RNG (shuffles, bot names)
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::HuntTheFlag,
            player_count: 2,
            start_position: StartPosition::Normal,
            fill_with_bots: true,

            starting_life_tokens: 3,
            infinite_lives: false,
            damage_on_respawn: 2,
            invulnerable_robots: false,

            kills_to_win: 5,
            points_to_win_king_of: 2.0,

            pushing_disabled: false,
            virtual_robot_mode: false,

            use_animation: false,

            seed: 0,
        }
    }
}

impl GameConfig {
    /// Checks the ranges a game can actually be started with
    pub fn is_valid(&self) -> bool {
        self.starting_life_tokens >= 1
            && self.starting_life_tokens <= MAX_LIFE_TOKENS
            && self.player_count >= 1
            && self.player_count as usize <= MAX_PLAYERS
    }
}
