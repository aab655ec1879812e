//! Deterministic simulation module
//!
//! All gameplay state and board interaction lives here. This module must be
//! pure and deterministic:
//! - Seeded RNG only (shuffles take the caller's RNG)
//! - Stable iteration order (by participant index)
//! - No client, transport or presentation dependencies

pub mod board;
pub mod cards;
pub mod deck;
pub mod resolver;
pub mod robot;

pub use board::{
    Direction, FloorKind, Laser, Rotation, Scenario, ScenarioBuilder, SpecialPoint, Tile, WallKind,
};
pub use cards::{Card, CardKind, CardSupply};
pub use deck::ProgramDeck;
pub use robot::{DamageReason, Robot};
