//! Movement and board-interaction resolver
//!
//! One function per atomic sub-step kind: a single card movement, a belt
//! pass, a gear/pusher/crusher/laser pass. Card moves and pusher shoves
//! resolve one push chain at a time (front robot first, all-or-nothing);
//! belt passes are computed collectively and committed afterwards so the
//! outcome never depends on iteration order.

use glam::IVec2;

use crate::consts::MAX_DAMAGE_TOKENS;
use crate::gamelog::LogKind;
use crate::sim::board::{Direction, FloorKind, Rotation};
use crate::sim::cards::CardKind;
use crate::sim::robot::{self, DamageReason, Robot, SimCtx};

/// First robot claiming this tile. Destroyed and virtual robots never do.
pub(crate) fn robot_at(robots: &[Robot], pos: IVec2) -> Option<usize> {
    robots.iter().position(|r| r.occupies_tile() && r.pos == pos)
}

pub(crate) fn all_robots_destroyed(robots: &[Robot]) -> bool {
    robots.iter().all(|r| r.destroyed)
}

/// Result of one attempted tile step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepOutcome {
    pub moved: bool,
    /// The step climbed a ramp and cost one extra tile of movement force
    pub up_ramp: bool,
}

impl StepOutcome {
    const BLOCKED: StepOutcome = StepOutcome { moved: false, up_ramp: false };
}

/// Moves a robot one tile, pushing whatever chain of robots stands in the
/// way. The chain resolves from the front: if its head cannot move, nothing
/// moves. `force` is the remaining movement budget of this card, relevant
/// only for climbing ramps. `pusher` carries the chain originator for kill
/// attribution.
pub(crate) fn try_step(
    ctx: &mut SimCtx,
    robots: &mut [Robot],
    idx: usize,
    dir: Direction,
    force: u8,
    can_push: bool,
    pusher: Option<usize>,
) -> StepOutcome {
    if robots[idx].destroyed || robots[idx].falling {
        return StepOutcome::BLOCKED;
    }

    let from = robots[idx].pos;
    let to = from + dir.offset();

    let up_ramp = ctx.board.ramp_up(from, to);
    if up_ramp && force < 2 {
        return StepOutcome::BLOCKED;
    }
    if ctx.board.wall_blocks(from, to) {
        return StepOutcome::BLOCKED;
    }

    match robot_at(robots, to) {
        // virtual robots move through everyone and push nobody
        Some(_) if robots[idx].is_virtual => {}
        Some(occupant) => {
            if !can_push || ctx.cfg.pushing_disabled {
                return StepOutcome::BLOCKED;
            }
            let chain_head = pusher.unwrap_or(idx);
            robots[occupant].pushed_by = Some(chain_head);
            let pushed = try_step(ctx, robots, occupant, dir, 1, true, Some(chain_head));
            if !pushed.moved {
                return StepOutcome::BLOCKED;
            }
            ctx.log.add(
                LogKind::Debug,
                format!("{} pushed {}", robots[chain_head].name, robots[occupant].name),
            );
        }
        None => {}
    }

    move_to(ctx, robots, idx, to, dir);
    StepOutcome { moved: true, up_ramp }
}

/// Commits a single-tile move and resolves what the new tile does
fn move_to(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, to: IVec2, move_dir: Direction) {
    let from = robots[idx].pos;
    robots[idx].pos = to;

    if ctx.board.edge_drop(from, to) {
        robot::apply_damage(ctx, robots, idx, DamageReason::Falling);
        robot::apply_damage(ctx, robots, idx, DamageReason::Falling);
    }

    tile_interaction(ctx, robots, idx, move_dir);
}

/// Applies the effect of the tile a robot just arrived on (or turned on)
pub(crate) fn tile_interaction(
    ctx: &mut SimCtx,
    robots: &mut [Robot],
    idx: usize,
    move_dir: Direction,
) {
    tile_interaction_inner(ctx, robots, idx, move_dir, 0);
}

fn tile_interaction_inner(
    ctx: &mut SimCtx,
    robots: &mut [Robot],
    idx: usize,
    move_dir: Direction,
    depth: u8,
) {
    if robots[idx].destroyed || robots[idx].falling {
        return;
    }

    let tile = ctx.board.tile(robots[idx].pos);
    match tile.floor {
        // trapdoor open while the floor is flagged inactive
        FloorKind::AutoPit if !tile.floor_active_in(ctx.phase) => {
            robot::start_falling(ctx, robots, idx);
        }
        FloorKind::Pit | FloorKind::WaterPit | FloorKind::HazardPit | FloorKind::Edge => {
            robot::start_falling(ctx, robots, idx);
        }
        FloorKind::Hazard => {
            robot::apply_damage(ctx, robots, idx, DamageReason::Hazard);
        }
        FloorKind::Teleporter if depth < 4 => {
            robots[idx].pos += move_dir.offset() * 2;
            ctx.log.add(
                LogKind::ParticipantNegative,
                format!("{} teleported", robots[idx].name),
            );
            tile_interaction_inner(ctx, robots, idx, move_dir, depth + 1);
            return;
        }
        _ => {}
    }

    if robots[idx].destroyed || robots[idx].falling {
        return;
    }

    for side in Direction::ALL {
        if tile.wall(side) == crate::sim::board::WallKind::Fire
            && tile.wall_active_in(side, ctx.phase)
        {
            robot::apply_damage(ctx, robots, idx, DamageReason::Flame);
        }
    }
}

/// Rotates a robot in place; the tile still reacts (hazard floors, flame
/// walls fire again)
pub(crate) fn rotate_robot(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, rotation: Rotation) {
    if robots[idx].destroyed || robots[idx].falling {
        return;
    }
    robots[idx].rotate(rotation);
    let dir = robots[idx].dir;
    tile_interaction(ctx, robots, idx, dir);
}

/// Weakened card effect for robots starting their move in water or oil
fn hindered(kind: CardKind) -> CardKind {
    match kind {
        CardKind::MoveForward1 | CardKind::MoveBackward => CardKind::Empty,
        CardKind::MoveForward2 => CardKind::MoveForward1,
        CardKind::MoveForward3 => CardKind::MoveForward2,
        other => other,
    }
}

/// Resolves one program card for one robot
pub(crate) fn play_card(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, kind: CardKind) {
    if robots[idx].destroyed || robots[idx].falling {
        return;
    }

    let mut kind = kind;
    if ctx.board.tile(robots[idx].pos).floor.hinders_movement() {
        kind = hindered(kind);
    }

    match kind {
        CardKind::TurnLeft => rotate_robot(ctx, robots, idx, Rotation::Left),
        CardKind::TurnRight => rotate_robot(ctx, robots, idx, Rotation::Right),
        CardKind::TurnAround => {
            rotate_robot(ctx, robots, idx, Rotation::Left);
            rotate_robot(ctx, robots, idx, Rotation::Left);
        }
        CardKind::MoveBackward => {
            let dir = robots[idx].dir.opposite();
            try_step(ctx, robots, idx, dir, 1, true, None);
            slide_on_oil(ctx, robots, idx, dir);
        }
        CardKind::MoveForward1 => {
            let dir = robots[idx].dir;
            try_step(ctx, robots, idx, dir, 1, true, None);
            slide_on_oil(ctx, robots, idx, dir);
        }
        CardKind::MoveForward2 => {
            let dir = robots[idx].dir;
            let first = try_step(ctx, robots, idx, dir, 2, true, None);
            if first.moved && !first.up_ramp {
                try_step(ctx, robots, idx, dir, 1, true, None);
            }
            slide_on_oil(ctx, robots, idx, dir);
        }
        CardKind::MoveForward3 => {
            let dir = robots[idx].dir;
            let first = try_step(ctx, robots, idx, dir, 3, true, None);
            if first.moved {
                let budget = if first.up_ramp { 1 } else { 2 };
                let second = try_step(ctx, robots, idx, dir, budget, true, None);
                if second.moved && !first.up_ramp && !second.up_ramp {
                    try_step(ctx, robots, idx, dir, 1, true, None);
                }
            }
            slide_on_oil(ctx, robots, idx, dir);
        }
        CardKind::Empty | CardKind::Back => {}
    }
}

/// Slides a robot that ended its movement on oil until it leaves the slick
/// or something stops it. Sliding cannot push.
pub(crate) fn slide_on_oil(ctx: &mut SimCtx, robots: &mut [Robot], idx: usize, dir: Direction) {
    loop {
        if robots[idx].destroyed || robots[idx].falling {
            return;
        }
        if ctx.board.tile(robots[idx].pos).floor != FloorKind::Oil {
            return;
        }
        let outcome = try_step(ctx, robots, idx, dir, 1, false, None);
        if !outcome.moved {
            return;
        }
    }
}

/// Which belts transport robots in this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BeltPass {
    /// Express belts only
    ExpressOnly,
    /// Express and normal belts together
    All,
}

#[derive(Debug, Clone, Copy)]
struct BeltMove {
    idx: usize,
    from: IVec2,
    to: IVec2,
    move_dir: Direction,
    rotation: Option<Rotation>,
}

/// One conveyor pass. Candidate moves are computed for every robot on an
/// active belt, conflicting candidates are discarded collectively, then the
/// survivors are committed; no belt ever pushes a robot.
pub(crate) fn belt_pass(ctx: &mut SimCtx, robots: &mut [Robot], pass: BeltPass) {
    let mut moves: Vec<BeltMove> = Vec::new();

    for (idx, r) in robots.iter().enumerate() {
        if r.destroyed {
            continue;
        }
        let tile = ctx.board.tile(r.pos);
        if !tile.floor_active_in(ctx.phase) {
            continue;
        }
        let riding = match pass {
            BeltPass::ExpressOnly => tile.floor.is_express_belt(),
            BeltPass::All => tile.floor.is_belt(),
        };
        if !riding {
            continue;
        }
        let Some(move_dir) = tile.floor.belt_exit(tile.alignment) else {
            continue;
        };
        let to = r.pos + move_dir.offset();
        if ctx.board.wall_blocks(r.pos, to) {
            continue;
        }

        let dest = ctx.board.tile(to);
        let rotation = match pass {
            BeltPass::All => dest.floor.belt_entry_rotation(dest.alignment, move_dir),
            // the express pass only rotates when the belt continues express
            BeltPass::ExpressOnly => dest
                .floor
                .is_express_belt()
                .then(|| dest.floor.belt_entry_rotation(dest.alignment, move_dir))
                .flatten(),
        };

        moves.push(BeltMove { idx, from: r.pos, to, move_dir, rotation });
    }

    // two robots transported onto the same tile: both stay (virtual robots
    // share tiles and conflict with nobody)
    let mut discarded = vec![false; moves.len()];
    for i in 0..moves.len() {
        for j in (i + 1)..moves.len() {
            let solid = !robots[moves[i].idx].is_virtual && !robots[moves[j].idx].is_virtual;
            if !solid {
                continue;
            }
            let same_dest = moves[i].to == moves[j].to;
            let swap = moves[i].to == moves[j].from && moves[j].to == moves[i].from;
            if same_dest || swap {
                discarded[i] = true;
                discarded[j] = true;
            }
        }
    }
    let mut moves: Vec<BeltMove> = moves
        .into_iter()
        .zip(discarded)
        .filter_map(|(m, d)| (!d).then_some(m))
        .collect();

    // belts cannot push: drop moves onto tiles whose occupant is not
    // itself moving away, repeating until stable since every drop can
    // strand another candidate
    loop {
        let before = moves.len();
        let moving: Vec<usize> = moves.iter().map(|m| m.idx).collect();
        moves.retain(|m| match robot_at(robots, m.to) {
            None => true,
            Some(occupant) => moving.contains(&occupant),
        });
        if moves.len() == before {
            break;
        }
    }

    // commit: positions first, then rotations, then tile effects
    for m in &moves {
        robots[m.idx].pos = m.to;
    }
    for m in &moves {
        if let Some(rotation) = m.rotation {
            robots[m.idx].rotate(rotation);
        }
    }
    for m in &moves {
        tile_interaction(ctx, robots, m.idx, m.move_dir);
    }
}

/// Rotates every robot standing on an active gear tile
pub(crate) fn rotate_gears(ctx: &mut SimCtx, robots: &mut [Robot]) {
    for idx in 0..robots.len() {
        if robots[idx].destroyed {
            continue;
        }
        let tile = ctx.board.tile(robots[idx].pos);
        if !tile.floor_active_in(ctx.phase) {
            continue;
        }
        match tile.floor {
            FloorKind::GearLeft => rotate_robot(ctx, robots, idx, Rotation::Left),
            FloorKind::GearRight => rotate_robot(ctx, robots, idx, Rotation::Right),
            _ => {}
        }
    }
}

/// Fires every pusher wall active in the current phase. A pusher that
/// cannot move its robot deals one damage token instead.
pub(crate) fn fire_pushers(ctx: &mut SimCtx, robots: &mut [Robot]) {
    for idx in 0..robots.len() {
        if robots[idx].destroyed {
            continue;
        }
        let tile = ctx.board.tile(robots[idx].pos);

        let push_dir = Direction::ALL.into_iter().find_map(|side| {
            (tile.wall(side) == crate::sim::board::WallKind::Pusher
                && tile.wall_active_in(side, ctx.phase))
            .then(|| side.opposite())
        });
        let Some(dir) = push_dir else {
            continue;
        };

        let outcome = try_step(ctx, robots, idx, dir, 1, true, None);
        if !outcome.moved {
            robot::apply_damage(ctx, robots, idx, DamageReason::Pusher);
        } else {
            slide_on_oil(ctx, robots, idx, dir);
        }
    }
}

/// Destroys every robot under a crusher active in the current phase
pub(crate) fn fire_crushers(ctx: &mut SimCtx, robots: &mut [Robot]) {
    for idx in 0..robots.len() {
        if robots[idx].destroyed {
            continue;
        }
        let tile = ctx.board.tile(robots[idx].pos);
        let crushed = Direction::ALL
            .into_iter()
            .any(|side| tile.wall(side).is_crusher() && tile.wall_active_in(side, ctx.phase));
        if !crushed {
            continue;
        }

        robot::apply_damage(ctx, robots, idx, DamageReason::Crusher);
        if !robots[idx].destroyed {
            robot::set_damage(ctx, robots, idx, MAX_DAMAGE_TOKENS);
        }
    }
}

/// Board lasers and robot-mounted lasers fire; every beam damages the first
/// robot it reaches. Returns whether anything was hit (the phase skips its
/// animation otherwise).
pub(crate) fn fire_lasers(ctx: &mut SimCtx, robots: &mut [Robot]) -> bool {
    let mut any_hit = false;

    let lasers = ctx.board.lasers().to_vec();
    for laser in lasers {
        if !laser.active[ctx.phase as usize - 1] {
            continue;
        }
        let mut pos = laser.start;
        loop {
            if let Some(target) = robot_at(robots, pos) {
                for _ in 0..laser.kind.laser_damage() {
                    robot::apply_damage(ctx, robots, target, DamageReason::Laser);
                }
                any_hit = true;
                break;
            }
            if pos == laser.end {
                break;
            }
            pos += laser.direction.offset();
        }
    }

    // robot lasers fire along the heading; powered-down and virtual robots
    // don't shoot
    for idx in 0..robots.len() {
        if robots[idx].destroyed || robots[idx].powered_down || robots[idx].is_virtual {
            continue;
        }
        let dir = robots[idx].dir;
        let mut from = robots[idx].pos;
        loop {
            let to = from + dir.offset();
            if ctx.board.wall_blocks(from, to) || !ctx.board.in_bounds(to) {
                break;
            }
            if let Some(target) = robot_at(robots, to) {
                robot::apply_damage(ctx, robots, target, DamageReason::Laser);
                robots[target].shot_by = Some(idx);
                ctx.log.add(
                    LogKind::ParticipantPositive,
                    format!("{} shoots at {}", robots[idx].name, robots[target].name),
                );
                any_hit = true;
                break;
            }
            if ctx.board.tile(to).floor == FloorKind::Edge {
                break;
            }
            from = to;
        }
    }

    any_hit
}
