//! Abstract client contract
//!
//! The engine never assumes a transport. Every participant is driven by a
//! [`Client`]: a bot, the local player's UI, or a network proxy. Calls that
//! need an answer may respond immediately (bots do) or leave the engine
//! blocked on a barrier; late answers arrive through the engine's
//! `submit_program` / `acknowledge_animation` / `choose_start_point` /
//! `choose_start_orientation` entry points.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::sim::board::Direction;
use crate::sim::deck::ProgramDeck;

/// Animated phases of the game; clients acknowledge each before the state
/// machine continues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationKind {
    RobotMovement,
    Lasers,
    Gears,
    ExpressBelts,
    AllBelts,
    Pushers,
    Crushers,
}

pub trait Client {
    fn name(&self) -> String;

    fn is_bot(&self) -> bool {
        false
    }

    /// The programming phase started. The client arranges its hand into the
    /// program slots and returns `true` once the program is committed, or
    /// `false` to commit later via [`GameEngine::submit_program`].
    ///
    /// [`GameEngine::submit_program`]: crate::engine::GameEngine::submit_program
    fn start_programming(&mut self, deck: &mut ProgramDeck) -> bool;

    /// Pick a spawn tile. `None` defers the answer to
    /// [`GameEngine::choose_start_point`].
    ///
    /// [`GameEngine::choose_start_point`]: crate::engine::GameEngine::choose_start_point
    fn select_start_point(&mut self, candidates: &[IVec2]) -> Option<IVec2>;

    /// Pick a spawn heading. `None` defers the answer to
    /// [`GameEngine::choose_start_orientation`].
    ///
    /// [`GameEngine::choose_start_orientation`]: crate::engine::GameEngine::choose_start_orientation
    fn select_start_orientation(&mut self, candidates: &[Direction]) -> Option<Direction>;

    /// An animation request for the given phase. Returning `true`
    /// acknowledges immediately; `false` leaves the engine waiting for
    /// [`GameEngine::acknowledge_animation`].
    ///
    /// [`GameEngine::acknowledge_animation`]: crate::engine::GameEngine::acknowledge_animation
    fn animation_started(&mut self, kind: AnimationKind, phase: u8) -> bool;

    fn phase_changed(&mut self, _phase: u8) {}

    fn game_started(&mut self) {}

    /// The match ended. `winner` is the winning participant index, or
    /// `None` when every participant was eliminated.
    fn game_over(&mut self, _winner: Option<usize>) {}
}
