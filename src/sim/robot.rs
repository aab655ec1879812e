//! Robot state
//!
//! The physical piece of each participant on the board. The engine owns all
//! robots exclusively during simulation; presentation layers read them
//! between phases only.
//!
//! Destruction is two-staged for robots that fall: a falling robot is set
//! to one damage token below the maximum and keeps its tile until the
//! current sub-step ends (clients get to show the fall), then it is
//! finalized and removed from the board.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_DAMAGE_TOKENS;
use crate::gamelog::{GameLog, LogKind};
use crate::settings::GameConfig;
use crate::sim::board::{Direction, Rotation, Scenario};

/// What caused damage to a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageReason {
    Unknown,
    /// Board laser or another robot's laser
    Laser,
    /// Hazard floor
    Hazard,
    /// Fell into a pit or off the board
    Falling,
    /// Pusher that could not push the robot anywhere
    Pusher,
    Crusher,
    /// Flame thrower wall
    Flame,
}

impl DamageReason {
    fn describe(self) -> &'static str {
        match self {
            DamageReason::Unknown => "unknown",
            DamageReason::Laser => "laser",
            DamageReason::Hazard => "hazard",
            DamageReason::Falling => "falling",
            DamageReason::Pusher => "pusher",
            DamageReason::Crusher => "crusher",
            DamageReason::Flame => "flame",
        }
    }
}

/// Off-board marker position for destroyed robots
pub const OFF_BOARD: IVec2 = IVec2::new(-1, -1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    /// Participant index this robot belongs to
    pub id: usize,
    /// Participant name, carried for log entries
    pub name: String,

    pub pos: IVec2,
    pub dir: Direction,

    pub lives: u8,
    pub damage: u8,

    /// Respawn location; updated on repair/flag/start tiles
    pub archive_marker: IVec2,
    /// Next flag number this robot has to reach
    pub next_flag_goal: u16,

    pub kills: u16,
    pub deaths: u16,
    pub suicides: u16,
    pub king_of_points: f32,

    pub powered_down: bool,
    pub has_flag: bool,
    /// Virtual robots share tiles and cannot push or be pushed
    pub is_virtual: bool,

    pub destroyed: bool,
    /// Mid-fall: max-1 damage applied, final destruction deferred to the
    /// end of the sub-step
    pub falling: bool,

    /// Robot that last pushed this one, for kill attribution
    pub pushed_by: Option<usize>,
    /// Robot that last shot this one, for kill attribution
    pub shot_by: Option<usize>,
}

impl Robot {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pos: OFF_BOARD,
            dir: Direction::East,
            lives: 1,
            damage: 0,
            archive_marker: OFF_BOARD,
            next_flag_goal: 1,
            kills: 0,
            deaths: 0,
            suicides: 0,
            king_of_points: 0.0,
            powered_down: false,
            has_flag: false,
            is_virtual: false,
            destroyed: false,
            falling: false,
            pushed_by: None,
            shot_by: None,
        }
    }

    /// Robots that claim their tile: destroyed and virtual robots do not
    pub fn occupies_tile(&self) -> bool {
        !self.destroyed && !self.is_virtual
    }

    /// Out of the game for good
    pub fn is_dead(&self) -> bool {
        self.destroyed && self.lives == 0
    }

    pub fn rotate(&mut self, rotation: Rotation) {
        self.dir = self.dir.rotated(rotation);
    }

    /// Brings a destroyed robot back at its current position
    pub fn resurrect(&mut self) {
        self.destroyed = false;
        self.falling = false;
    }

    /// Removes one damage token. Dead robots are not repaired.
    pub fn repair(&mut self, log: &mut GameLog) {
        if self.damage > 0 && self.damage <= MAX_DAMAGE_TOKENS {
            self.damage -= 1;
            log.add(LogKind::ParticipantPositive, format!("{} repaired", self.name));
        }
    }
}

/// Shared mutable context for one simulation sub-step
pub(crate) struct SimCtx<'a> {
    pub board: &'a mut Scenario,
    pub cfg: &'a GameConfig,
    pub log: &'a mut GameLog,
    /// Current program phase, 1..=5
    pub phase: u8,
}

pub(crate) fn set_lives(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, lives: u8) {
    let robot = &mut robots[idx];
    robot.lives = if ctx.cfg.infinite_lives { 1 } else { lives };
    if robot.lives == 0 {
        ctx.log.add(
            LogKind::ParticipantNegative,
            format!("{} dead and out of game", robot.name),
        );
    }
}

/// Adds one damage token and runs the destruction path when the maximum is
/// reached.
pub(crate) fn apply_damage(
    ctx: &mut SimCtx,
    robots: &mut [Robot],
    idx: usize,
    reason: DamageReason,
) {
    if ctx.cfg.invulnerable_robots {
        robots[idx].damage = 0;
        return;
    }

    robots[idx].damage += 1;
    ctx.log.add(
        LogKind::ParticipantNegative,
        format!("{} got hit by {}", robots[idx].name, reason.describe()),
    );

    if robots[idx].damage >= MAX_DAMAGE_TOKENS {
        destroy(ctx, robots, idx);
    }
}

/// Sets the damage count directly (falling finalization, crushers) and runs
/// the destruction path when the maximum is reached.
pub(crate) fn set_damage(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, damage: u8) {
    robots[idx].damage = damage;
    if robots[idx].damage >= MAX_DAMAGE_TOKENS {
        destroy(ctx, robots, idx);
    }
}

/// Marks the robot as falling: damage goes to max-1, the actual destruction
/// happens in [`finalize_falling`] after the sub-step completes.
pub(crate) fn start_falling(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize) {
    if robots[idx].falling || robots[idx].destroyed {
        return;
    }
    robots[idx].falling = true;
    set_damage(ctx, robots, idx, MAX_DAMAGE_TOKENS - 1);
}

/// Kills every robot still mid-fall. Called when a sub-step (and its
/// animation) has completed.
pub(crate) fn finalize_falling(ctx: &mut SimCtx, robots: &mut [Robot]) {
    for idx in 0..robots.len() {
        if robots[idx].falling {
            set_damage(ctx, robots, idx, MAX_DAMAGE_TOKENS);
        }
    }
}

fn destroy(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize) {
    if robots[idx].destroyed {
        return;
    }

    let death_pos = robots[idx].pos;
    robots[idx].destroyed = true;
    robots[idx].falling = false;

    let lives = robots[idx].lives;
    if lives > 0 {
        set_lives(ctx, robots, idx, lives - 1);
    }

    robots[idx].pos = OFF_BOARD;
    robots[idx].deaths += 1;
    ctx.log.add(
        LogKind::ParticipantNegative,
        format!("{} destroyed", robots[idx].name),
    );

    // kill attribution: shooter first, then pusher, otherwise a suicide
    match (robots[idx].shot_by, robots[idx].pushed_by) {
        (Some(shooter), _) if shooter != idx => credit_kill(ctx, robots, shooter, idx),
        (_, Some(pusher)) if pusher != idx => credit_kill(ctx, robots, pusher, idx),
        _ => robots[idx].suicides += 1,
    }

    // a dying flag carrier drops the flag where it died; the flag returns
    // home when that spot is a pit or the rim
    if robots[idx].has_flag {
        robots[idx].has_flag = false;
        let tile = ctx.board.tile(death_pos);
        let open_autopit =
            tile.floor == crate::sim::board::FloorKind::AutoPit && !tile.floor_active_in(ctx.phase);
        if tile.floor.is_lethal() || open_autopit {
            ctx.board.reset_king_flag();
        } else {
            ctx.board.drop_king_flag(death_pos);
        }
    }
}

fn credit_kill(ctx: &mut SimCtx, robots: &mut [Robot], killer: usize, victim: usize) {
    robots[killer].kills += 1;
    ctx.log.add(
        LogKind::ParticipantPositive,
        format!("{} killed {}", robots[killer].name, robots[victim].name),
    );
}
