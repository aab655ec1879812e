//! Board model
//!
//! A scenario is a rectangular grid of tiles. Each tile has one floor, four
//! walls and per-phase activity flags for the floor and every wall; a
//! pusher wall that only fires in phases 2 and 4 simply has the other
//! phases flagged inactive. Tile lookups outside the grid produce an edge
//! tile, so the board behaves as if surrounded by a bottomless rim.
//!
//! Scenario files are parsed elsewhere; this module consumes an already
//! validated model and offers a builder for programmatic construction.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::consts::PHASES_PER_ROUND;
use crate::settings::StartPosition;

const PHASES: usize = PHASES_PER_ROUND as usize;

/// Cardinal points, used for tile alignment and robot heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// A quarter turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit offset in tile coordinates; north is negative y
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::South => IVec2::new(0, 1),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    pub fn left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn right(self) -> Self {
        self.left().opposite()
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::Left => self.left(),
            Rotation::Right => self.right(),
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Direction of a single-tile step, `None` if the points are not
    /// orthogonally adjacent in exactly one axis
    pub fn between(from: IVec2, to: IVec2) -> Option<Direction> {
        match (to.x - from.x, to.y - from.y) {
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (0, 1) => Some(Direction::South),
            (0, -1) => Some(Direction::North),
            _ => None,
        }
    }
}

/// The type of a tile floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FloorKind {
    /// Rim of the board, robots fall here
    Edge,
    #[default]
    Normal,
    Pit,
    WaterPit,
    HazardPit,
    /// Trapdoor pit: open (lethal) in phases where the floor is inactive
    AutoPit,

    Belt1Straight,
    Belt1CurveLeft,
    Belt1CurveRight,
    Belt1TLeft,
    Belt1TRight,
    Belt1TBoth,
    Belt2Straight,
    Belt2CurveLeft,
    Belt2CurveRight,
    Belt2TLeft,
    Belt2TRight,
    Belt2TBoth,
    /// Moves like a normal belt and hinders movement like water
    WaterDrain,

    GearLeft,
    GearRight,
    Repair,
    RepairOptions,

    /// Wheels spin on the first move out; movement is one tile short
    Water,
    /// Robots ending a move here slide on until a non-oil tile or obstacle
    Oil,
    /// One damage token for every move onto it
    Hazard,
    /// Replaces the current program card with a random one at phase start
    Randomizer,
    /// Displaces a robot two further tiles in its travel direction
    Teleporter,
}

impl FloorKind {
    pub fn is_pit(self) -> bool {
        matches!(self, FloorKind::Pit | FloorKind::WaterPit | FloorKind::HazardPit)
    }

    /// Entering this floor always drops the robot (auto pits depend on the
    /// phase and are handled separately)
    pub fn is_lethal(self) -> bool {
        self.is_pit() || self == FloorKind::Edge
    }

    pub fn is_express_belt(self) -> bool {
        matches!(
            self,
            FloorKind::Belt2Straight
                | FloorKind::Belt2CurveLeft
                | FloorKind::Belt2CurveRight
                | FloorKind::Belt2TLeft
                | FloorKind::Belt2TRight
                | FloorKind::Belt2TBoth
        )
    }

    pub fn is_belt(self) -> bool {
        self.is_express_belt()
            || matches!(
                self,
                FloorKind::Belt1Straight
                    | FloorKind::Belt1CurveLeft
                    | FloorKind::Belt1CurveRight
                    | FloorKind::Belt1TLeft
                    | FloorKind::Belt1TRight
                    | FloorKind::Belt1TBoth
                    | FloorKind::WaterDrain
            )
    }

    /// Floors that weaken the first programmed move of a robot standing on
    /// them (spinning wheels)
    pub fn hinders_movement(self) -> bool {
        matches!(self, FloorKind::Water | FloorKind::WaterDrain | FloorKind::Oil)
    }

    pub fn is_repair(self) -> bool {
        matches!(self, FloorKind::Repair | FloorKind::RepairOptions)
    }

    /// Transport direction for a robot standing on this belt
    pub fn belt_exit(self, alignment: Direction) -> Option<Direction> {
        match self {
            FloorKind::Belt1Straight
            | FloorKind::Belt2Straight
            | FloorKind::WaterDrain
            | FloorKind::Belt1TLeft
            | FloorKind::Belt2TLeft
            | FloorKind::Belt1TRight
            | FloorKind::Belt2TRight => Some(alignment),
            FloorKind::Belt1CurveRight | FloorKind::Belt2CurveRight => Some(alignment.right()),
            FloorKind::Belt1CurveLeft | FloorKind::Belt2CurveLeft => Some(alignment.left()),
            FloorKind::Belt1TBoth | FloorKind::Belt2TBoth => Some(alignment.opposite()),
            _ => None,
        }
    }

    /// Rotation applied to a robot transported *onto* this belt, given the
    /// direction it was moving. Curves always rotate; T pieces only when
    /// entered through the side arm.
    pub fn belt_entry_rotation(self, alignment: Direction, move_dir: Direction) -> Option<Rotation> {
        match self {
            FloorKind::Belt1CurveRight | FloorKind::Belt2CurveRight => Some(Rotation::Right),
            FloorKind::Belt1CurveLeft | FloorKind::Belt2CurveLeft => Some(Rotation::Left),
            FloorKind::Belt1TRight | FloorKind::Belt2TRight => {
                (move_dir == alignment.left()).then_some(Rotation::Right)
            }
            FloorKind::Belt1TLeft | FloorKind::Belt2TLeft => {
                (move_dir == alignment.right()).then_some(Rotation::Left)
            }
            FloorKind::Belt1TBoth | FloorKind::Belt2TBoth => {
                if move_dir == alignment.right() {
                    Some(Rotation::Right)
                } else if move_dir == alignment.left() {
                    Some(Rotation::Left)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// The type of a wall on a tile edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WallKind {
    #[default]
    None,
    /// Blocks robots and lasers
    Standard,
    /// Pushes the robot one tile away in its firing phases; deals one
    /// damage instead when the push is blocked
    Pusher,
    /// Crushes the robot outright in its firing phases
    Crusher,
    /// Crusher variant without blocking side walls
    Crusher2,
    Laser1,
    Laser2,
    Laser3,
    /// Flame thrower; damages robots moving through while active
    Fire,
    /// Passable ramp; moving up needs movement force of at least two
    Ramp,
    /// Passable rim; robots crossing it fall
    Edge,
}

impl WallKind {
    pub fn is_laser(self) -> bool {
        matches!(self, WallKind::Laser1 | WallKind::Laser2 | WallKind::Laser3)
    }

    /// Damage tokens per beam hit
    pub fn laser_damage(self) -> u8 {
        match self {
            WallKind::Laser1 => 1,
            WallKind::Laser2 => 2,
            WallKind::Laser3 => 3,
            _ => 0,
        }
    }

    pub fn is_crusher(self) -> bool {
        matches!(self, WallKind::Crusher | WallKind::Crusher2)
    }
}

/// One board tile: a floor, four walls, and the phases they are live in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub floor: FloorKind,
    /// Rotation of the floor element, defines belt transport directions
    pub alignment: Direction,
    /// Walls by side, indexed north/east/south/west
    pub walls: [WallKind; 4],
    pub floor_active: [bool; PHASES],
    pub wall_active: [[bool; PHASES]; 4],
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            floor: FloorKind::Normal,
            alignment: Direction::North,
            walls: [WallKind::None; 4],
            floor_active: [true; PHASES],
            wall_active: [[true; PHASES]; 4],
        }
    }
}

impl Tile {
    /// The blank rim tile returned for out-of-bounds lookups
    pub fn edge() -> Self {
        Self {
            floor: FloorKind::Edge,
            ..Self::default()
        }
    }

    pub fn wall(&self, side: Direction) -> WallKind {
        self.walls[side.index()]
    }

    pub fn floor_active_in(&self, phase: u8) -> bool {
        self.floor_active[phase as usize - 1]
    }

    pub fn wall_active_in(&self, side: Direction, phase: u8) -> bool {
        self.wall_active[side.index()][phase as usize - 1]
    }
}

/// A numbered point of interest: flag positions, starting points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPoint {
    pub pos: IVec2,
    pub number: u16,
}

/// A board laser: start wall, firing direction and the precomputed beam end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub kind: WallKind,
    pub start: IVec2,
    pub end: IVec2,
    pub direction: Direction,
    pub active: [bool; PHASES],
}

/// A complete, validated board scenario plus its board-scoped mutable state
/// (the king-of-the-flag token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    size: IVec2,
    tiles: Vec<Tile>,

    start_points: Vec<SpecialPoint>,
    start_points_deathmatch: Vec<SpecialPoint>,
    virtual_start: IVec2,
    flags: Vec<SpecialPoint>,
    king_of_flag_start: IVec2,
    king_of_hill_point: IVec2,
    start_orientation: Direction,
    max_players: u8,

    lasers: Vec<Laser>,

    king_flag_pos: IVec2,
    king_flag_dropped: bool,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn in_bounds(&self, pos: IVec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.size.x && pos.y < self.size.y
    }

    /// Tile lookup; positions off the grid resolve to the rim
    pub fn tile(&self, pos: IVec2) -> Tile {
        if self.in_bounds(pos) {
            self.tiles[(pos.y * self.size.x + pos.x) as usize]
        } else {
            Tile::edge()
        }
    }

    /// A scenario the engine can start on
    pub fn is_playable(&self) -> bool {
        !self.tiles.is_empty() && !self.start_points.is_empty()
    }

    pub fn max_players(&self) -> u8 {
        self.max_players
    }

    pub fn start_orientation(&self) -> Direction {
        self.start_orientation
    }

    pub fn flags(&self) -> &[SpecialPoint] {
        &self.flags
    }

    pub fn lasers(&self) -> &[Laser] {
        &self.lasers
    }

    /// Starting point for participant number `nr` (1-based) under the
    /// configured placement rule
    pub fn start_point(&self, nr: u16, placement: StartPosition) -> IVec2 {
        let list = match placement {
            StartPosition::Normal => &self.start_points,
            StartPosition::Deathmatch => &self.start_points_deathmatch,
            StartPosition::Virtual => return self.virtual_start,
        };
        list.iter()
            .find(|sp| sp.number == nr)
            .map(|sp| sp.pos)
            .unwrap_or(IVec2::ZERO)
    }

    /// Checks the walls between two adjacent tiles. Ramp walls are passable
    /// (the force cost is the mover's problem) and edge walls let the robot
    /// through to fall. Crushers span both sides of their wall slot.
    pub fn wall_blocks(&self, from: IVec2, to: IVec2) -> bool {
        let Some(dir) = Direction::between(from, to) else {
            return true;
        };
        let tile_from = self.tile(from);
        let tile_to = self.tile(to);

        let leaving = tile_from.wall(dir);
        let entering = tile_to.wall(dir.opposite());
        let far_side = tile_to.wall(dir);

        let blocked = leaving != WallKind::None
            || entering != WallKind::None
            || far_side == WallKind::Crusher;
        let passable =
            leaving == WallKind::Ramp || entering == WallKind::Ramp || entering == WallKind::Edge;

        blocked && !passable
    }

    /// Whether stepping from `from` to `to` climbs a ramp
    pub fn ramp_up(&self, from: IVec2, to: IVec2) -> bool {
        Direction::between(from, to)
            .map(|dir| self.tile(from).wall(dir) == WallKind::Ramp)
            .unwrap_or(false)
    }

    /// Whether stepping from `from` to `to` crosses an edge wall and drops
    /// the robot
    pub fn edge_drop(&self, from: IVec2, to: IVec2) -> bool {
        Direction::between(from, to)
            .map(|dir| self.tile(to).wall(dir.opposite()) == WallKind::Edge)
            .unwrap_or(false)
    }

    /// Points around a blocked starting point a robot may respawn on.
    /// `occupied` holds the tiles other robots currently claim.
    pub fn allowed_start_points(&self, seed: IVec2, occupied: &[IVec2]) -> Vec<IVec2> {
        if !occupied.contains(&seed) {
            return vec![seed];
        }

        let mut points = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                let candidate = seed + IVec2::new(dx, dy);
                if occupied.contains(&candidate) {
                    continue;
                }
                let tile = self.tile(candidate);
                if tile.floor.is_pit() || tile.floor == FloorKind::Edge {
                    continue;
                }
                if self.allowed_start_orientations(candidate, occupied).is_empty() {
                    continue;
                }
                points.push(candidate);
            }
        }
        points
    }

    /// Headings a freshly placed robot may take: it must not look straight
    /// at an adjacent robot
    pub fn allowed_start_orientations(&self, pos: IVec2, occupied: &[IVec2]) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|dir| !occupied.contains(&(pos + dir.offset())))
            .collect()
    }

    // === King-of-the-flag token ===

    pub fn reset_king_flag(&mut self) {
        self.king_flag_dropped = true;
        self.king_flag_pos = self.king_of_flag_start;
    }

    /// Drops the flag where its carrier died
    pub fn drop_king_flag(&mut self, pos: IVec2) {
        self.king_flag_dropped = true;
        self.king_flag_pos = pos;
    }

    pub fn pickup_king_flag(&mut self) {
        self.king_flag_dropped = false;
    }

    /// Position of the dropped flag, `None` while a robot carries it
    pub fn king_flag_position(&self) -> Option<IVec2> {
        self.king_flag_dropped.then_some(self.king_flag_pos)
    }

    pub fn king_of_hill_point(&self) -> IVec2 {
        self.king_of_hill_point
    }

    fn laser_end_point(&self, start: IVec2, direction: Direction) -> IVec2 {
        let mut end = start;
        loop {
            let next = end + direction.offset();
            if !self.in_bounds(next) || self.wall_blocks(end, next) {
                return end;
            }
            end = next;
        }
    }

    fn generate_lasers(&mut self) {
        let mut lasers = Vec::new();
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let pos = IVec2::new(x, y);
                let tile = self.tile(pos);
                for side in Direction::ALL {
                    let wall = tile.wall(side);
                    if !wall.is_laser() {
                        continue;
                    }
                    // a laser mounted on the north wall fires south
                    let direction = side.opposite();
                    lasers.push(Laser {
                        kind: wall,
                        start: pos,
                        end: IVec2::ZERO,
                        direction,
                        active: tile.wall_active[side.index()],
                    });
                }
            }
        }
        for laser in &mut lasers {
            laser.end = self.laser_end_point(laser.start, laser.direction);
        }
        self.lasers = lasers;
    }
}

/// Programmatic scenario construction, mainly for integrations and tests
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            scenario: Scenario {
                name: name.into(),
                size: IVec2::new(width, height),
                tiles: vec![Tile::default(); (width * height) as usize],
                start_points: Vec::new(),
                start_points_deathmatch: Vec::new(),
                virtual_start: IVec2::ZERO,
                flags: Vec::new(),
                king_of_flag_start: IVec2::ZERO,
                king_of_hill_point: IVec2::ZERO,
                start_orientation: Direction::East,
                max_players: crate::consts::MAX_PLAYERS as u8,
                lasers: Vec::new(),
                king_flag_pos: IVec2::ZERO,
                king_flag_dropped: false,
            },
        }
    }

    fn tile_mut(&mut self, x: i32, y: i32) -> &mut Tile {
        let w = self.scenario.size.x;
        &mut self.scenario.tiles[(y * w + x) as usize]
    }

    pub fn floor(mut self, x: i32, y: i32, floor: FloorKind, alignment: Direction) -> Self {
        let tile = self.tile_mut(x, y);
        tile.floor = floor;
        tile.alignment = alignment;
        self
    }

    pub fn floor_active(mut self, x: i32, y: i32, active: [bool; PHASES]) -> Self {
        self.tile_mut(x, y).floor_active = active;
        self
    }

    pub fn wall(mut self, x: i32, y: i32, side: Direction, wall: WallKind) -> Self {
        self.tile_mut(x, y).walls[side.index()] = wall;
        self
    }

    pub fn wall_active(
        mut self,
        x: i32,
        y: i32,
        side: Direction,
        active: [bool; PHASES],
    ) -> Self {
        self.tile_mut(x, y).wall_active[side.index()] = active;
        self
    }

    pub fn start_point(mut self, number: u16, x: i32, y: i32) -> Self {
        self.scenario.start_points.push(SpecialPoint {
            pos: IVec2::new(x, y),
            number,
        });
        self
    }

    pub fn deathmatch_start_point(mut self, number: u16, x: i32, y: i32) -> Self {
        self.scenario.start_points_deathmatch.push(SpecialPoint {
            pos: IVec2::new(x, y),
            number,
        });
        self
    }

    pub fn virtual_start(mut self, x: i32, y: i32) -> Self {
        self.scenario.virtual_start = IVec2::new(x, y);
        self
    }

    pub fn flag(mut self, number: u16, x: i32, y: i32) -> Self {
        self.scenario.flags.push(SpecialPoint {
            pos: IVec2::new(x, y),
            number,
        });
        self
    }

    pub fn king_of_flag_point(mut self, x: i32, y: i32) -> Self {
        self.scenario.king_of_flag_start = IVec2::new(x, y);
        self
    }

    pub fn king_of_hill_point(mut self, x: i32, y: i32) -> Self {
        self.scenario.king_of_hill_point = IVec2::new(x, y);
        self
    }

    pub fn start_orientation(mut self, direction: Direction) -> Self {
        self.scenario.start_orientation = direction;
        self
    }

    pub fn max_players(mut self, max: u8) -> Self {
        self.scenario.max_players = max;
        self
    }

    pub fn build(mut self) -> Scenario {
        self.scenario.king_flag_pos = self.scenario.king_of_flag_start;
        self.scenario.generate_lasers();
        self.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_board(w: i32, h: i32) -> ScenarioBuilder {
        let mut builder = ScenarioBuilder::new("test", w, h);
        for nr in 1..=8 {
            builder = builder.start_point(nr, (nr as i32 - 1).min(w - 1), 0);
        }
        builder
    }

    #[test]
    fn out_of_bounds_is_edge() {
        let board = open_board(4, 4).build();
        assert_eq!(board.tile(IVec2::new(-1, 0)).floor, FloorKind::Edge);
        assert_eq!(board.tile(IVec2::new(4, 2)).floor, FloorKind::Edge);
        assert_eq!(board.tile(IVec2::new(1, 1)).floor, FloorKind::Normal);
    }

    #[test]
    fn walls_block_from_both_sides() {
        let board = open_board(3, 1)
            .wall(1, 0, Direction::East, WallKind::Standard)
            .build();
        let a = IVec2::new(1, 0);
        let b = IVec2::new(2, 0);
        assert!(board.wall_blocks(a, b));
        assert!(board.wall_blocks(b, a));
        assert!(!board.wall_blocks(IVec2::new(0, 0), a));
    }

    #[test]
    fn ramp_and_edge_walls_are_passable() {
        let board = open_board(3, 1)
            .wall(0, 0, Direction::East, WallKind::Ramp)
            .wall(2, 0, Direction::West, WallKind::Edge)
            .build();
        assert!(!board.wall_blocks(IVec2::new(0, 0), IVec2::new(1, 0)));
        assert!(board.ramp_up(IVec2::new(0, 0), IVec2::new(1, 0)));
        assert!(!board.wall_blocks(IVec2::new(1, 0), IVec2::new(2, 0)));
        assert!(board.edge_drop(IVec2::new(1, 0), IVec2::new(2, 0)));
    }

    #[test]
    fn belt_exit_directions() {
        use Direction::*;
        assert_eq!(FloorKind::Belt1Straight.belt_exit(North), Some(North));
        assert_eq!(FloorKind::Belt2CurveRight.belt_exit(North), Some(East));
        assert_eq!(FloorKind::Belt1CurveLeft.belt_exit(North), Some(West));
        assert_eq!(FloorKind::Belt2TBoth.belt_exit(North), Some(South));
        assert_eq!(FloorKind::Normal.belt_exit(North), None);
    }

    #[test]
    fn t_belts_rotate_only_from_the_side_arm() {
        use Direction::*;
        // entering a TRight aligned north while moving west: side arm
        assert_eq!(
            FloorKind::Belt1TRight.belt_entry_rotation(North, West),
            Some(Rotation::Right)
        );
        // entering along the stem does not rotate
        assert_eq!(FloorKind::Belt1TRight.belt_entry_rotation(North, North), None);
        assert_eq!(
            FloorKind::Belt2TBoth.belt_entry_rotation(North, East),
            Some(Rotation::Right)
        );
        assert_eq!(
            FloorKind::Belt2TBoth.belt_entry_rotation(North, West),
            Some(Rotation::Left)
        );
    }

    #[test]
    fn laser_beam_stops_at_walls() {
        let board = open_board(5, 1)
            .wall(0, 0, Direction::West, WallKind::Laser1)
            .wall(3, 0, Direction::East, WallKind::Standard)
            .build();
        assert_eq!(board.lasers().len(), 1);
        let laser = board.lasers()[0];
        assert_eq!(laser.direction, Direction::East);
        assert_eq!(laser.start, IVec2::new(0, 0));
        assert_eq!(laser.end, IVec2::new(3, 0));
    }

    #[test]
    fn laser_beam_runs_to_board_rim() {
        let board = open_board(4, 3)
            .wall(2, 0, Direction::North, WallKind::Laser2)
            .build();
        let laser = board.lasers()[0];
        assert_eq!(laser.direction, Direction::South);
        assert_eq!(laser.end, IVec2::new(2, 2));
        assert_eq!(laser.kind.laser_damage(), 2);
    }

    #[test]
    fn free_start_point_is_its_own_candidate_list() {
        let board = open_board(4, 4).build();
        let seed = IVec2::new(1, 1);
        assert_eq!(board.allowed_start_points(seed, &[]), vec![seed]);
    }

    #[test]
    fn occupied_start_point_expands_to_neighbourhood() {
        let board = open_board(4, 4)
            .floor(0, 1, FloorKind::Pit, Direction::North)
            .build();
        let seed = IVec2::new(1, 1);
        let occupied = [seed];
        let candidates = board.allowed_start_points(seed, &occupied);
        assert!(!candidates.contains(&seed));
        assert!(!candidates.contains(&IVec2::new(0, 1)), "pit tile offered");
        assert!(candidates.contains(&IVec2::new(2, 1)));
    }

    #[test]
    fn start_orientations_avoid_facing_robots() {
        let board = open_board(4, 4).build();
        let pos = IVec2::new(1, 1);
        let occupied = [IVec2::new(2, 1)];
        let dirs = board.allowed_start_orientations(pos, &occupied);
        assert!(!dirs.contains(&Direction::East));
        assert_eq!(dirs.len(), 3);
    }

    #[test]
    fn king_flag_token_life_cycle() {
        let mut board = open_board(4, 4).king_of_flag_point(2, 2).build();
        assert_eq!(board.king_flag_position(), None);
        board.reset_king_flag();
        assert_eq!(board.king_flag_position(), Some(IVec2::new(2, 2)));
        board.pickup_king_flag();
        assert_eq!(board.king_flag_position(), None);
        board.drop_king_flag(IVec2::new(3, 1));
        assert_eq!(board.king_flag_position(), Some(IVec2::new(3, 1)));
    }
}
