//! Round state machine
//!
//! Connects the board, the card supply, the participant decks and the
//! clients, and drives a match through its states:
//!
//! ```text
//! SetUpNewGame -> DealCards -> ProgramRobots -> PlayRound{
//!     MoveRobots -> ExpressBelts -> AllBelts -> Gears -> Pushers
//!       -> Crushers -> Lasers -> ArchiveMarker -> GameOverCheck
//!       -> [phase < 5 ? MoveRobots : exit]
//! } -> RepairAndOptions -> CleanUp -> [game continues ? DealCards : GameFinished]
//! ```
//!
//! All mutation happens on one logical thread. Where the rules need every
//! participant to report in (programming done, animation done, respawn
//! placement), the machine parks on an explicit [`PendingInput`] barrier
//! and resumes when the last answer arrives. Bots answer inline, so a
//! bots-only match runs to completion inside [`GameEngine::run`].

use glam::IVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::bot::SimpleBot;
use crate::client::{AnimationKind, Client};
use crate::consts::{CARDS_PER_ROUND, HAND_SIZE, PHASES_PER_ROUND};
use crate::gamelog::{GameLog, LogKind};
use crate::settings::{GameConfig, GameMode, StartPosition};
use crate::sim::board::{Direction, FloorKind, Scenario};
use crate::sim::cards::{Card, CardSupply};
use crate::sim::deck::ProgramDeck;
use crate::sim::resolver::{self, BeltPass};
use crate::sim::robot::{self, OFF_BOARD, Robot, SimCtx};

/// Sub-states of the five-phase round loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStep {
    MoveRobots,
    ExpressBelts,
    AllBelts,
    Gears,
    Pushers,
    Crushers,
    Lasers,
    ArchiveMarker,
    GameOverCheck,
    NextPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Before `start()`
    Idle,
    SetUpNewGame,
    DealCards,
    ProgramRobots,
    PlayRound(RoundStep),
    RepairAndOptions,
    CleanUp,
    GameFinished,
}

/// What the machine is currently blocked on. Keyed by participant index;
/// the barrier clears when the listed participants have all answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingInput {
    /// Participants that have not committed their program yet
    Programs { waiting: Vec<usize> },
    /// Clients that have not acknowledged the running animation
    Animation { kind: AnimationKind, waiting: Vec<usize> },
    /// One participant picking a spawn tile
    StartPoint { participant: usize, candidates: Vec<IVec2> },
    /// One participant picking a spawn heading
    StartOrientation { participant: usize, candidates: Vec<Direction> },
}

/// Stalemate protection: one `run()` call never executes more state steps
/// than this. A bots-only match that cannot end would otherwise spin
/// forever.
const MAX_STEPS_PER_RUN: u32 = 100_000;

pub struct GameEngine {
    cfg: GameConfig,
    board: Scenario,
    supply: CardSupply,
    log: GameLog,
    rng: Pcg32,

    clients: Vec<Box<dyn Client>>,
    robots: Vec<Robot>,
    decks: Vec<ProgramDeck>,

    state: EngineState,
    /// Current program card index, 1..=5
    phase: u8,
    pending: Option<PendingInput>,
    running: bool,
    cleanup_started: bool,

    /// Robots that asked to power down next round
    power_down_queue: Vec<usize>,

    finished: bool,
    winner: Option<usize>,
}

impl GameEngine {
    pub fn new(board: Scenario, cfg: GameConfig) -> Self {
        let rng = Pcg32::seed_from_u64(cfg.seed);
        let mut log = GameLog::new();
        log.add(LogKind::General, format!("Board {} loaded.", board.name()));

        Self {
            cfg,
            board,
            supply: CardSupply::new(),
            log,
            rng,
            clients: Vec::new(),
            robots: Vec::new(),
            decks: Vec::new(),
            state: EngineState::Idle,
            phase: 1,
            pending: None,
            running: false,
            cleanup_started: false,
            power_down_queue: Vec::new(),
            finished: false,
            winner: None,
        }
    }

    // === Introspection ===

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current_phase(&self) -> u8 {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingInput> {
        self.pending.as_ref()
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn deck(&self, participant: usize) -> &ProgramDeck {
        &self.decks[participant]
    }

    /// Mutable deck access for the local player's UI during programming
    pub fn deck_mut(&mut self, participant: usize) -> &mut ProgramDeck {
        &mut self.decks[participant]
    }

    pub fn board(&self) -> &Scenario {
        &self.board
    }

    pub fn card_supply(&self) -> &CardSupply {
        &self.supply
    }

    pub fn game_log(&self) -> &GameLog {
        &self.log
    }

    pub fn participant_count(&self) -> usize {
        self.clients.len()
    }

    pub fn participant_name(&self, participant: usize) -> &str {
        &self.robots[participant].name
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Winning participant, `None` for a running game or a loss-for-all
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    // === Lobby ===

    /// Adds a participant. Only possible before the game starts; a full
    /// seat list turns the request down.
    pub fn join(&mut self, client: Box<dyn Client>) -> bool {
        if self.state != EngineState::Idle {
            log::warn!("client tried to join a running game");
            return false;
        }
        if self.clients.len() >= self.cfg.player_count as usize {
            self.log.add(
                LogKind::General,
                format!("{} can't join the game. Already full.", client.name()),
            );
            return false;
        }

        let idx = self.clients.len();
        let name = client.name();
        self.robots.push(Robot::new(idx, name.clone()));
        self.decks.push(ProgramDeck::new());
        self.clients.push(client);
        self.log.add(LogKind::General, format!("{name} joined."));
        true
    }

    pub fn add_bot(&mut self) -> bool {
        let bot = SimpleBot::with_random_name(&mut self.rng);
        self.join(Box::new(bot))
    }

    /// Starts the match. Fails (with a log entry) on invalid settings, an
    /// unplayable board, or a wrong participant count.
    pub fn start(&mut self) -> bool {
        if self.cfg.fill_with_bots {
            while self.clients.len() < self.cfg.player_count as usize {
                self.add_bot();
            }
        }

        if !self.cfg.is_valid() {
            self.log.add(LogKind::Setup, "Invalid game settings, can't start the game");
            return false;
        }
        if !self.board.is_playable() {
            self.log.add(LogKind::Setup, "No board available, can't start the game");
            return false;
        }
        if self.cfg.mode == GameMode::HuntTheFlag && self.board.flags().is_empty() {
            self.log.add(LogKind::Setup, "Scenario has no flags, can't start the game");
            return false;
        }
        if self.clients.len() < self.cfg.player_count as usize {
            self.log.add(LogKind::Setup, "Not enough players joined the game");
            return false;
        }

        self.supply.load();
        self.supply.shuffle(&mut self.rng);
        self.power_down_queue.clear();
        self.phase = 1;
        self.state = EngineState::SetUpNewGame;
        self.running = true;
        self.log.add(LogKind::General, "Game started");
        self.run();
        true
    }

    /// Aborts the match from whatever state it is in. No rollback of
    /// partially applied phase effects.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.log.add(LogKind::General, "Game stopped");
    }

    // === Late answers to barriers ===

    /// A participant committed its program. Valid only while the engine
    /// waits on the programming barrier.
    pub fn submit_program(&mut self, participant: usize) -> bool {
        let Some(PendingInput::Programs { waiting }) = &mut self.pending else {
            log::warn!("program submitted outside the programming phase");
            return false;
        };
        let Some(slot) = waiting.iter().position(|&p| p == participant) else {
            log::debug!("participant {participant} already finished programming");
            return false;
        };
        waiting.remove(slot);
        let drained = waiting.is_empty();
        self.finish_programming(participant);
        if drained {
            self.pending = None;
            self.barrier_done();
            self.run();
        }
        true
    }

    /// A client finished showing the current animation
    pub fn acknowledge_animation(&mut self, participant: usize) -> bool {
        let Some(PendingInput::Animation { waiting, .. }) = &mut self.pending else {
            log::warn!("animation acknowledged while none is running");
            return false;
        };
        let Some(slot) = waiting.iter().position(|&p| p == participant) else {
            return false;
        };
        waiting.remove(slot);
        if waiting.is_empty() {
            self.pending = None;
            self.barrier_done();
            self.run();
        }
        true
    }

    /// A participant picked its spawn tile
    pub fn choose_start_point(&mut self, participant: usize, point: IVec2) -> bool {
        let Some(PendingInput::StartPoint { participant: p, candidates }) = &self.pending else {
            log::warn!("start point chosen while none was requested");
            return false;
        };
        if *p != participant || !candidates.contains(&point) {
            log::warn!("invalid start point selection by participant {participant}");
            return false;
        }
        self.pending = None;
        self.apply_start_point(participant, point);
        self.run();
        true
    }

    /// A participant picked its spawn heading
    pub fn choose_start_orientation(&mut self, participant: usize, dir: Direction) -> bool {
        let Some(PendingInput::StartOrientation { participant: p, candidates }) = &self.pending
        else {
            log::warn!("start orientation chosen while none was requested");
            return false;
        };
        if *p != participant || !candidates.contains(&dir) {
            log::warn!("invalid start orientation selection by participant {participant}");
            return false;
        }
        self.pending = None;
        self.robots[participant].dir = dir;
        self.finish_respawn(participant);
        self.run();
        true
    }

    /// Queues or cancels a voluntary power-down for the next round.
    /// Returns the resulting "will power down" flag.
    pub fn request_power_down(&mut self, participant: usize) -> bool {
        if self.robots[participant].powered_down {
            return true;
        }
        let name = self.robots[participant].name.clone();
        if let Some(i) = self.power_down_queue.iter().position(|&p| p == participant) {
            self.power_down_queue.remove(i);
            self.log.add(LogKind::ParticipantNegative, format!("{name} canceled power down."));
            false
        } else {
            self.power_down_queue.push(participant);
            self.log.add(
                LogKind::ParticipantPositive,
                format!("{name} will power down next round."),
            );
            true
        }
    }

    /// Rebinds a vanished client to a bot and satisfies every wait the
    /// simulation still has on it, so the match can never wedge on a
    /// missing client.
    pub fn client_disconnected(&mut self, participant: usize) {
        let bot = SimpleBot::with_random_name(&mut self.rng);
        let old_name = self.robots[participant].name.clone();
        let new_name = bot.name();
        self.robots[participant].name = new_name.clone();
        self.clients[participant] = Box::new(bot);
        self.log.add(
            LogKind::General,
            format!("{old_name} left and is replaced by bot {new_name}"),
        );
        self.satisfy_pending_for(participant);
    }

    /// Timeout hook: substitutes a bot for every participant the current
    /// barrier is still waiting on. The host decides when a wait has
    /// stalled for too long.
    pub fn resolve_stalled_barrier(&mut self) {
        let stalled: Vec<usize> = match &self.pending {
            Some(PendingInput::Programs { waiting }) => waiting.clone(),
            Some(PendingInput::Animation { waiting, .. }) => waiting.clone(),
            Some(PendingInput::StartPoint { participant, .. })
            | Some(PendingInput::StartOrientation { participant, .. }) => vec![*participant],
            None => Vec::new(),
        };
        for participant in stalled {
            self.client_disconnected(participant);
        }
    }

    fn satisfy_pending_for(&mut self, participant: usize) {
        match self.pending.clone() {
            Some(PendingInput::Programs { waiting }) if waiting.contains(&participant) => {
                let done =
                    self.clients[participant].start_programming(&mut self.decks[participant]);
                debug_assert!(done, "bots answer synchronously");
                self.submit_program(participant);
            }
            Some(PendingInput::Animation { waiting, .. }) if waiting.contains(&participant) => {
                self.acknowledge_animation(participant);
            }
            Some(PendingInput::StartPoint { participant: p, candidates }) if p == participant => {
                if let Some(point) = self.clients[participant].select_start_point(&candidates) {
                    self.choose_start_point(participant, point);
                }
            }
            Some(PendingInput::StartOrientation { participant: p, candidates })
                if p == participant =>
            {
                if let Some(dir) = self.clients[participant].select_start_orientation(&candidates)
                {
                    self.choose_start_orientation(participant, dir);
                }
            }
            _ => {}
        }
    }

    // === State machine core ===

    /// Advances the machine until it blocks on a barrier, finishes, or is
    /// stopped.
    pub fn run(&mut self) {
        let mut steps = 0u32;
        while self.running && self.pending.is_none() && self.state != EngineState::GameFinished {
            self.step();
            steps += 1;
            if steps >= MAX_STEPS_PER_RUN {
                log::warn!("state machine exceeded {MAX_STEPS_PER_RUN} steps, stopping");
                self.stop();
                return;
            }
        }
    }

    fn step(&mut self) {
        match self.state {
            EngineState::Idle | EngineState::GameFinished => {}
            EngineState::SetUpNewGame => self.step_setup(),
            EngineState::DealCards => self.step_deal_cards(),
            EngineState::ProgramRobots => self.step_program_robots(),
            EngineState::PlayRound(round_step) => self.step_round(round_step),
            EngineState::RepairAndOptions => self.step_repair(),
            EngineState::CleanUp => self.step_cleanup(),
        }
    }

    fn with_ctx<T>(&mut self, f: impl FnOnce(&mut SimCtx, &mut [Robot]) -> T) -> T {
        let phase = self.phase;
        let GameEngine { board, cfg, log, robots, .. } = self;
        let mut ctx = SimCtx { board, cfg, log, phase };
        f(&mut ctx, robots)
    }

    fn occupied_tiles(&self) -> Vec<IVec2> {
        self.robots.iter().filter(|r| r.occupies_tile()).map(|r| r.pos).collect()
    }

    /// Resolved once a barrier drains: transitions out of the state the
    /// machine was parked in.
    fn barrier_done(&mut self) {
        match self.state {
            EngineState::ProgramRobots => {
                self.state = EngineState::PlayRound(RoundStep::MoveRobots);
            }
            EngineState::PlayRound(step) => {
                self.end_substep();
                self.advance_round(step);
            }
            _ => {}
        }
    }

    /// Falling robots are killed once the sub-step (and its animation) is
    /// over, and slot locks follow the new damage counts.
    fn end_substep(&mut self) {
        self.with_ctx(|ctx, robots| robot::finalize_falling(ctx, robots));
        self.sync_deck_locks();
    }

    fn sync_deck_locks(&mut self) {
        for idx in 0..self.robots.len() {
            self.decks[idx].lock_for_damage(self.robots[idx].damage);
        }
    }

    /// Requests an animation and either blocks on the acknowledgement
    /// barrier or, with animations disabled, completes the sub-step at
    /// once.
    fn animate(&mut self, kind: AnimationKind, step: RoundStep) {
        if self.cfg.use_animation {
            let phase = self.phase;
            let mut waiting = Vec::new();
            for idx in 0..self.clients.len() {
                if !self.clients[idx].animation_started(kind, phase) {
                    waiting.push(idx);
                }
            }
            if !waiting.is_empty() {
                self.pending = Some(PendingInput::Animation { kind, waiting });
                return;
            }
        }
        self.end_substep();
        self.advance_round(step);
    }

    fn advance_round(&mut self, from: RoundStep) {
        let next = match from {
            RoundStep::MoveRobots => RoundStep::ExpressBelts,
            RoundStep::ExpressBelts => RoundStep::AllBelts,
            RoundStep::AllBelts => RoundStep::Gears,
            RoundStep::Gears => RoundStep::Pushers,
            RoundStep::Pushers => RoundStep::Crushers,
            RoundStep::Crushers => RoundStep::Lasers,
            RoundStep::Lasers => {
                // with every robot gone the rest of the round is pointless
                if resolver::all_robots_destroyed(&self.robots) {
                    self.log.add(LogKind::Debug, "all robots destroyed, round cut short");
                    self.state = EngineState::RepairAndOptions;
                    return;
                }
                RoundStep::ArchiveMarker
            }
            RoundStep::ArchiveMarker => RoundStep::GameOverCheck,
            RoundStep::GameOverCheck => RoundStep::NextPhase,
            RoundStep::NextPhase => {
                if self.phase >= PHASES_PER_ROUND {
                    self.state = EngineState::RepairAndOptions;
                    return;
                }
                self.phase += 1;
                RoundStep::MoveRobots
            }
        };
        self.state = EngineState::PlayRound(next);
    }

    fn notify_phase_changed(&mut self) {
        let phase = self.phase;
        for client in &mut self.clients {
            client.phase_changed(phase);
        }
    }

    // === States ===

    fn step_setup(&mut self) {
        // init and place one robot at a time; placement may defer to the
        // client when the configured spot is contested
        for idx in 0..self.robots.len() {
            if self.robots[idx].pos != OFF_BOARD {
                continue;
            }

            self.robots[idx].damage = 0;
            self.robots[idx].is_virtual = self.cfg.virtual_robot_mode
                || self.cfg.start_position == StartPosition::Virtual;
            let lives = self.cfg.starting_life_tokens;
            self.with_ctx(|ctx, robots| robot::set_lives(ctx, robots, idx, lives));
            self.decks[idx].lock_for_damage(0);
            self.robots[idx].dir = self.board.start_orientation();

            let seed = self.board.start_point(idx as u16 + 1, self.cfg.start_position);
            self.robots[idx].archive_marker = seed;

            let candidates = self.board.allowed_start_points(seed, &self.occupied_tiles());
            match candidates.as_slice() {
                [] => {
                    log::warn!("no free start point near {seed}, placing on the seed tile");
                    self.robots[idx].pos = seed;
                }
                [only] => {
                    self.robots[idx].pos = *only;
                }
                _ => {
                    self.ask_start_point(idx, candidates);
                    return;
                }
            }
        }

        if self.cfg.mode == GameMode::KingOfTheFlag {
            self.board.reset_king_flag();
        }

        for client in &mut self.clients {
            client.game_started();
        }
        self.state = EngineState::DealCards;
    }

    fn ask_start_point(&mut self, participant: usize, candidates: Vec<IVec2>) {
        if let Some(point) = self.clients[participant].select_start_point(&candidates) {
            if candidates.contains(&point) {
                self.apply_start_point(participant, point);
                return;
            }
            log::warn!("client picked a start point outside the candidate list");
        }
        self.pending = Some(PendingInput::StartPoint { participant, candidates });
    }

    fn apply_start_point(&mut self, participant: usize, point: IVec2) {
        match self.state {
            EngineState::SetUpNewGame => {
                self.robots[participant].pos = point;
            }
            EngineState::CleanUp => {
                self.robots[participant].resurrect();
                self.robots[participant].pos = point;

                let candidates =
                    self.board.allowed_start_orientations(point, &self.occupied_tiles());
                match candidates.as_slice() {
                    [] => self.finish_respawn(participant),
                    [only] => {
                        self.robots[participant].dir = *only;
                        self.finish_respawn(participant);
                    }
                    _ => {
                        if let Some(dir) =
                            self.clients[participant].select_start_orientation(&candidates)
                        {
                            if candidates.contains(&dir) {
                                self.robots[participant].dir = dir;
                                self.finish_respawn(participant);
                                return;
                            }
                        }
                        self.pending =
                            Some(PendingInput::StartOrientation { participant, candidates });
                    }
                }
            }
            _ => log::warn!("start point applied in unexpected state"),
        }
    }

    fn finish_respawn(&mut self, participant: usize) {
        self.robots[participant].resurrect();
        self.robots[participant].powered_down = false;
        self.robots[participant].is_virtual = self.cfg.virtual_robot_mode;
        self.robots[participant].damage = self.cfg.damage_on_respawn;
        self.sync_deck_locks();
    }

    fn step_deal_cards(&mut self) {
        self.phase = 1;
        self.notify_phase_changed();

        for card_round in 1..=HAND_SIZE as u8 {
            for idx in 0..self.robots.len() {
                if self.robots[idx].powered_down {
                    continue;
                }
                self.decks[idx].lock_programming(false);
                if card_round <= CARDS_PER_ROUND.saturating_sub(self.robots[idx].damage) {
                    let card = self.supply.deal(&mut self.rng);
                    self.decks[idx].add_card_to_hand(card);
                }
            }
        }

        self.state = EngineState::ProgramRobots;
    }

    fn finish_programming(&mut self, participant: usize) {
        self.decks[participant].lock_programming(true);
        self.log.add(
            LogKind::General,
            format!("{} finished programming", self.robots[participant].name),
        );
    }

    fn step_program_robots(&mut self) {
        let mut waiting = Vec::new();
        for idx in 0..self.clients.len() {
            let robot = &self.robots[idx];
            if robot.lives == 0 || robot.powered_down {
                continue;
            }
            if self.clients[idx].start_programming(&mut self.decks[idx]) {
                self.finish_programming(idx);
            } else {
                waiting.push(idx);
            }
        }

        if waiting.is_empty() {
            self.state = EngineState::PlayRound(RoundStep::MoveRobots);
        } else {
            self.pending = Some(PendingInput::Programs { waiting });
        }
    }

    fn step_round(&mut self, round_step: RoundStep) {
        match round_step {
            RoundStep::MoveRobots => {
                self.replace_randomizer_cards();
                self.notify_phase_changed();
                self.move_robots_by_card();
                self.animate(AnimationKind::RobotMovement, round_step);
            }
            RoundStep::ExpressBelts => {
                self.with_ctx(|ctx, robots| {
                    resolver::belt_pass(ctx, robots, BeltPass::ExpressOnly)
                });
                self.animate(AnimationKind::ExpressBelts, round_step);
            }
            RoundStep::AllBelts => {
                self.with_ctx(|ctx, robots| resolver::belt_pass(ctx, robots, BeltPass::All));
                self.animate(AnimationKind::AllBelts, round_step);
            }
            RoundStep::Gears => {
                self.with_ctx(|ctx, robots| resolver::rotate_gears(ctx, robots));
                self.animate(AnimationKind::Gears, round_step);
            }
            RoundStep::Pushers => {
                self.with_ctx(|ctx, robots| resolver::fire_pushers(ctx, robots));
                self.animate(AnimationKind::Pushers, round_step);
            }
            RoundStep::Crushers => {
                self.with_ctx(|ctx, robots| resolver::fire_crushers(ctx, robots));
                self.animate(AnimationKind::Crushers, round_step);
            }
            RoundStep::Lasers => {
                let any_hit = self.with_ctx(|ctx, robots| resolver::fire_lasers(ctx, robots));
                if any_hit {
                    self.animate(AnimationKind::Lasers, round_step);
                } else {
                    // nothing to show, no reason to wait on clients
                    self.end_substep();
                    self.advance_round(round_step);
                }
            }
            RoundStep::ArchiveMarker => {
                self.log
                    .add(LogKind::Debug, format!("archive marker check, phase {}", self.phase));
                self.check_archive_markers();
                self.advance_round(round_step);
            }
            RoundStep::GameOverCheck => {
                if let Some(winner) = self.evaluate_win_condition() {
                    self.finish_game(Some(winner));
                } else {
                    self.advance_round(round_step);
                }
            }
            RoundStep::NextPhase => self.advance_round(round_step),
        }
    }

    /// Robots opening a phase on a randomizer tile play a random card from
    /// the supply instead of their programmed one.
    fn replace_randomizer_cards(&mut self) {
        for idx in 0..self.robots.len() {
            if self.robots[idx].destroyed {
                continue;
            }
            if self.board.tile(self.robots[idx].pos).floor != FloorKind::Randomizer {
                continue;
            }

            let new_card = self.supply.deal(&mut self.rng);
            let old_card = self.decks[idx].replace_card_in_program(new_card, self.phase as u16);
            if !old_card.is_empty() {
                self.supply.put_back(old_card);
            }
            self.log.add(
                LogKind::ParticipantNegative,
                format!("Replaced a program card of {} with a random one", self.robots[idx].name),
            );
        }
    }

    fn move_robots_by_card(&mut self) {
        let mut plays: Vec<(usize, Card)> = Vec::new();
        for idx in 0..self.robots.len() {
            let robot = &self.robots[idx];
            if robot.destroyed || robot.powered_down {
                continue;
            }
            plays.push((idx, self.decks[idx].card_in_program(self.phase as u16)));
        }

        // the card with the highest priority moves first
        plays.sort_by(|a, b| b.1.priority.cmp(&a.1.priority));

        for (idx, card) in plays {
            self.with_ctx(|ctx, robots| resolver::play_card(ctx, robots, idx, card.kind));
        }
    }

    fn check_archive_markers(&mut self) {
        for idx in 0..self.robots.len() {
            if self.robots[idx].destroyed {
                continue;
            }
            let pos = self.robots[idx].pos;
            let tile = self.board.tile(pos);

            if tile.floor.is_repair() {
                self.robots[idx].archive_marker = pos;
            }

            match self.cfg.mode {
                GameMode::HuntTheFlag => {
                    let reached: Vec<u16> = self
                        .board
                        .flags()
                        .iter()
                        .filter(|sp| sp.pos == pos)
                        .map(|sp| sp.number)
                        .collect();
                    for number in reached {
                        self.robots[idx].archive_marker = pos;
                        if self.robots[idx].next_flag_goal == number {
                            self.robots[idx].next_flag_goal = number + 1;
                            self.log.add(
                                LogKind::ParticipantPositive,
                                format!("{} reached flag {}", self.robots[idx].name, number),
                            );
                        }
                    }
                }
                GameMode::KingOfTheFlag => {
                    if self.board.king_flag_position() == Some(pos) {
                        self.board.pickup_king_flag();
                        self.robots[idx].has_flag = true;
                    }
                    if self.robots[idx].has_flag {
                        self.robots[idx].king_of_points += 0.2;
                    }
                }
                GameMode::KingOfTheHill => {
                    if self.board.king_of_hill_point() == pos {
                        self.robots[idx].king_of_points += 0.2;
                    }
                }
                GameMode::DeadOrAlive => {}
            }
        }
    }

    fn evaluate_win_condition(&mut self) -> Option<usize> {
        match self.cfg.mode {
            GameMode::HuntTheFlag => {
                let final_flag = self.board.flags().len() as u16;
                self.robots.iter().position(|r| r.next_flag_goal > final_flag)
            }
            GameMode::DeadOrAlive => {
                if let Some(idx) =
                    self.robots.iter().position(|r| r.kills >= self.cfg.kills_to_win)
                {
                    return Some(idx);
                }
                let dead = self.robots.iter().filter(|r| r.is_dead()).count();
                if dead + 1 == self.robots.len() {
                    if let Some(idx) = self.robots.iter().position(|r| !r.destroyed) {
                        self.log.add(LogKind::Debug, "only one robot left standing");
                        return Some(idx);
                    }
                }
                None
            }
            GameMode::KingOfTheFlag | GameMode::KingOfTheHill => self.robots.iter().position(|r| {
                r.king_of_points >= self.cfg.points_to_win_king_of
                    && (r.has_flag || self.board.king_of_hill_point() == r.pos)
            }),
        }
    }

    fn finish_game(&mut self, winner: Option<usize>) {
        match winner {
            Some(idx) => {
                self.log.add(
                    LogKind::General,
                    format!("Game over! {} won the game", self.robots[idx].name),
                );
            }
            None => {
                self.log.add(LogKind::General, "Game over! All players are dead");
            }
        }
        self.finished = true;
        self.winner = winner;
        self.state = EngineState::GameFinished;
        self.running = false;
        for client in &mut self.clients {
            client.game_over(winner);
        }
    }

    fn step_repair(&mut self) {
        for idx in 0..self.robots.len() {
            if self.robots[idx].destroyed {
                continue;
            }
            let tile = self.board.tile(self.robots[idx].pos);
            if tile.floor.is_repair() {
                // a repair-with-options tile would additionally deal an
                // option card here
                self.robots[idx].repair(&mut self.log);
            }
        }
        self.sync_deck_locks();
        self.state = EngineState::CleanUp;
    }

    fn step_cleanup(&mut self) {
        if !self.cleanup_started {
            self.cleanup_started = true;
            for robot in &mut self.robots {
                robot.pushed_by = None;
                robot.shot_by = None;
            }
            self.solve_virtual_robots();
        }

        // respawn destroyed robots one at a time; placement may block on
        // the client
        for idx in 0..self.robots.len() {
            if self.robots[idx].destroyed && self.robots[idx].lives > 0 {
                let seed = self.robots[idx].archive_marker;
                let mut candidates =
                    self.board.allowed_start_points(seed, &self.occupied_tiles());
                if candidates.is_empty() {
                    log::warn!("no free respawn point near {seed}, offering the seed tile");
                    candidates.push(seed);
                }
                self.ask_start_point(idx, candidates);
                return;
            }
        }

        if self.robots.iter().all(|r| r.is_dead()) {
            self.cleanup_started = false;
            self.finish_game(None);
            return;
        }

        self.refill_powered_down_decks();
        for idx in self.power_down_queue.clone() {
            self.robots[idx].powered_down = true;
            self.robots[idx].damage = 0;
        }
        self.power_down_queue.clear();
        self.sync_deck_locks();

        // everything unlocked flows back into the supply for the next deal
        for idx in 0..self.decks.len() {
            for card in self.decks[idx].clear_round() {
                self.supply.put_back(card);
            }
        }

        self.cleanup_started = false;
        self.state = EngineState::DealCards;
    }

    /// A powered-down robot that took damage has freshly locked slots with
    /// no cards in them; they are filled with random cards so its frozen
    /// program stays complete.
    fn refill_powered_down_decks(&mut self) {
        for idx in 0..self.robots.len() {
            if !self.robots[idx].powered_down {
                continue;
            }
            while self.decks[idx].locked_slots_without_card() > 0 {
                let card = self.supply.deal(&mut self.rng);
                if !self.decks[idx].add_card_to_locked_program(card) {
                    self.supply.put_back(card);
                    break;
                }
            }
            self.robots[idx].powered_down = false;
        }
    }

    /// Virtual robots materialize once they are alone on their tile
    fn solve_virtual_robots(&mut self) {
        for idx in 0..self.robots.len() {
            if !self.robots[idx].is_virtual || self.robots[idx].destroyed {
                continue;
            }
            let pos = self.robots[idx].pos;
            let alone = !self
                .robots
                .iter()
                .enumerate()
                .any(|(other, r)| other != idx && !r.destroyed && r.pos == pos);
            if alone {
                self.robots[idx].is_virtual = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SUPPLY_SIZE;
    use crate::sim::board::{ScenarioBuilder, WallKind};
    use crate::sim::cards::CardKind;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Client that never answers on its own; the test drives the engine
    /// through the public completion calls.
    struct ManualClient {
        name: String,
        game_over_seen: Rc<Cell<bool>>,
    }

    impl ManualClient {
        fn new(name: &str) -> Self {
            Self { name: name.into(), game_over_seen: Rc::new(Cell::new(false)) }
        }
    }

    impl Client for ManualClient {
        fn name(&self) -> String {
            self.name.clone()
        }
        fn start_programming(&mut self, _deck: &mut ProgramDeck) -> bool {
            false
        }
        fn select_start_point(&mut self, _candidates: &[IVec2]) -> Option<IVec2> {
            None
        }
        fn select_start_orientation(&mut self, _candidates: &[Direction]) -> Option<Direction> {
            None
        }
        fn animation_started(&mut self, _kind: AnimationKind, _phase: u8) -> bool {
            false
        }
        fn game_over(&mut self, _winner: Option<usize>) {
            self.game_over_seen.set(true);
        }
    }

    /// A 4x2 board whose top row is fenced in on all sides. Robots on the
    /// strip can neither die nor reach the flag parked on the second row,
    /// so rounds run forever and every outcome is deterministic.
    fn fenced_strip() -> Scenario {
        let mut builder = ScenarioBuilder::new("strip", 4, 2)
            .start_point(1, 0, 0)
            .start_point(2, 3, 0)
            .flag(1, 0, 1)
            .start_orientation(Direction::North)
            .wall(0, 0, Direction::West, WallKind::Standard)
            .wall(3, 0, Direction::East, WallKind::Standard);
        for x in 0..4 {
            builder = builder
                .wall(x, 0, Direction::North, WallKind::Standard)
                .wall(x, 0, Direction::South, WallKind::Standard);
        }
        builder.build()
    }

    fn manual_engine(board: Scenario, mut cfg: GameConfig) -> GameEngine {
        cfg.fill_with_bots = false;
        cfg.player_count = 2;
        let mut engine = GameEngine::new(board, cfg);
        assert!(engine.join(Box::new(ManualClient::new("alpha"))));
        assert!(engine.join(Box::new(ManualClient::new("beta"))));
        engine
    }

    fn card_census(engine: &GameEngine) -> usize {
        let in_decks: usize = (0..engine.participant_count())
            .map(|i| {
                let deck = engine.deck(i);
                deck.hand().iter().filter(|c| !c.is_empty()).count()
                    + deck.program().iter().filter(|c| !c.is_empty()).count()
            })
            .sum();
        engine.card_supply().len() + in_decks
    }

    /// Forces a known card into a program slot; bypasses locks the same
    /// way the randomizer replacement does.
    fn force_program_card(engine: &mut GameEngine, participant: usize, slot: u16, card: Card) {
        engine.deck_mut(participant).replace_card_in_program(card, slot);
    }

    fn submit_all(engine: &mut GameEngine) {
        let waiting = match engine.pending() {
            Some(PendingInput::Programs { waiting }) => waiting.clone(),
            other => panic!("expected programming barrier, got {other:?}"),
        };
        for participant in waiting {
            engine.submit_program(participant);
        }
    }

    #[test]
    fn start_requires_enough_players() {
        let mut cfg = GameConfig::default();
        cfg.fill_with_bots = false;
        cfg.player_count = 2;
        let mut engine = GameEngine::new(fenced_strip(), cfg);
        engine.join(Box::new(ManualClient::new("alone")));
        assert!(!engine.start());
        assert!(
            engine
                .game_log()
                .entries()
                .iter()
                .any(|e| e.text.contains("Not enough players"))
        );
    }

    #[test]
    fn start_requires_flags_for_hunt_the_flag() {
        let board = ScenarioBuilder::new("bare", 4, 1)
            .start_point(1, 0, 0)
            .start_point(2, 3, 0)
            .build();
        let mut engine = manual_engine(board, GameConfig::default());
        assert!(!engine.start());
    }

    #[test]
    fn deal_gives_nine_cards_and_blocks_on_programming() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());

        assert!(matches!(engine.pending(), Some(PendingInput::Programs { .. })));
        assert_eq!(engine.state(), EngineState::ProgramRobots);
        for i in 0..2 {
            let dealt = engine.deck(i).hand().iter().filter(|c| !c.is_empty()).count();
            assert_eq!(dealt, 9);
        }
        assert_eq!(card_census(&engine), SUPPLY_SIZE);
    }

    #[test]
    fn cards_are_conserved_across_a_full_round() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        assert_eq!(card_census(&engine), SUPPLY_SIZE);

        submit_all(&mut engine);

        // round ran to completion and the next deal is waiting on input
        assert!(matches!(engine.pending(), Some(PendingInput::Programs { .. })));
        assert_eq!(card_census(&engine), SUPPLY_SIZE);
    }

    #[test]
    fn round_without_casualties_checks_archive_markers_five_times() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        submit_all(&mut engine);

        let checks = engine
            .game_log()
            .entries()
            .iter()
            .filter(|e| e.text.starts_with("archive marker check"))
            .count();
        assert_eq!(checks, 5);
        assert!(engine.robots().iter().all(|r| !r.destroyed));
    }

    #[test]
    fn blocked_push_chain_leaves_both_robots_in_place() {
        // 2x1 strip fenced at both ends, robots facing each other
        let board = ScenarioBuilder::new("tiny", 2, 1)
            .start_point(1, 0, 0)
            .start_point(2, 1, 0)
            .flag(1, 0, 0)
            .wall(0, 0, Direction::West, WallKind::Standard)
            .wall(1, 0, Direction::East, WallKind::Standard)
            .build();
        let mut cfg = GameConfig::default();
        cfg.mode = GameMode::DeadOrAlive;
        cfg.kills_to_win = 99;
        let mut engine = manual_engine(board, cfg);
        assert!(engine.start());
        engine.robots[0].dir = Direction::East;
        engine.robots[1].dir = Direction::West;

        // phase 1: both play Move 1, robot 0 with the higher priority
        force_program_card(&mut engine, 0, 1, Card::new(CardKind::MoveForward1, 600));
        force_program_card(&mut engine, 1, 1, Card::new(CardKind::MoveForward1, 500));
        submit_all(&mut engine);

        assert_eq!(engine.robots()[0].pos, IVec2::new(0, 0));
        assert_eq!(engine.robots()[1].pos, IVec2::new(1, 0));
        assert!(!engine.robots()[0].destroyed);
        assert!(!engine.robots()[1].destroyed);
    }

    #[test]
    fn higher_priority_card_resolves_first() {
        // robot 1 drives away before the slower robot 0 reaches its tile
        let board = ScenarioBuilder::new("open", 5, 1)
            .start_point(1, 0, 0)
            .start_point(2, 1, 0)
            .flag(1, 4, 0)
            .start_orientation(Direction::East)
            .build();
        let mut engine = manual_engine(board, GameConfig::default());
        assert!(engine.start());

        force_program_card(&mut engine, 0, 1, Card::new(CardKind::MoveForward1, 500));
        force_program_card(&mut engine, 1, 1, Card::new(CardKind::MoveForward1, 600));
        submit_all(&mut engine);

        // nobody was pushed: robot 1 moved first, robot 0 followed
        assert_eq!(engine.robots()[1].pos, IVec2::new(2, 0));
        assert_eq!(engine.robots()[0].pos, IVec2::new(1, 0));
        assert_eq!(engine.robots()[1].pushed_by, None);
    }

    #[test]
    fn flag_capture_wins_hunt_the_flag() {
        // the only flag sits right on robot 0's start tile
        let board = ScenarioBuilder::new("win", 3, 1)
            .start_point(1, 0, 0)
            .start_point(2, 2, 0)
            .flag(1, 0, 0)
            .build();
        let mut engine = manual_engine(board, GameConfig::default());
        assert!(engine.start());
        submit_all(&mut engine);

        assert!(engine.is_finished());
        assert_eq!(engine.winner(), Some(0));
        assert_eq!(engine.robots()[0].next_flag_goal, 2);
        assert_eq!(engine.state(), EngineState::GameFinished);
    }

    #[test]
    fn eliminated_robot_is_never_respawned() {
        // robot 1 starts under a crusher and has a single life
        let board = ScenarioBuilder::new("crush", 4, 1)
            .start_point(1, 0, 0)
            .start_point(2, 2, 0)
            .flag(1, 3, 0)
            .wall(2, 0, Direction::North, WallKind::Crusher2)
            .build();
        let mut cfg = GameConfig::default();
        cfg.starting_life_tokens = 1;
        let mut engine = manual_engine(board, cfg);
        assert!(engine.start());
        submit_all(&mut engine);

        let victim = &engine.robots()[1];
        assert!(victim.is_dead());
        assert_eq!(victim.pos, OFF_BOARD);
        assert_eq!(victim.lives, 0);

        // next round is running and deals the dead robot nothing
        assert!(
            matches!(engine.pending(), Some(PendingInput::Programs { waiting }) if waiting == &vec![0])
        );
        let dealt = engine.deck(1).hand().iter().filter(|c| !c.is_empty()).count();
        assert_eq!(dealt, 0);
    }

    #[test]
    fn destroyed_robot_respawns_at_archive_marker_with_damage() {
        let board = ScenarioBuilder::new("crush", 4, 1)
            .start_point(1, 0, 0)
            .start_point(2, 2, 0)
            .flag(1, 3, 0)
            .wall(2, 0, Direction::North, WallKind::Crusher2)
            .build();
        let mut engine = manual_engine(board, GameConfig::default());
        assert!(engine.start());
        submit_all(&mut engine);

        // destroyed mid-round; cleanup asks where to respawn
        let Some(PendingInput::StartPoint { participant, candidates }) = engine.pending().cloned()
        else {
            panic!("expected respawn placement request");
        };
        assert_eq!(participant, 1);
        assert_eq!(candidates, vec![IVec2::new(2, 0)]);
        assert!(engine.choose_start_point(1, IVec2::new(2, 0)));

        // free tile on all sides: the heading is the client's choice too
        let Some(PendingInput::StartOrientation { participant, .. }) = engine.pending().cloned()
        else {
            panic!("expected respawn orientation request");
        };
        assert_eq!(participant, 1);
        assert!(engine.choose_start_orientation(1, Direction::North));

        let revived = &engine.robots()[1];
        assert!(!revived.destroyed);
        assert_eq!(revived.pos, IVec2::new(2, 0));
        assert_eq!(revived.dir, Direction::North);
        assert_eq!(revived.damage, GameConfig::default().damage_on_respawn);
        assert_eq!(revived.lives, GameConfig::default().starting_life_tokens - 1);
        assert!(matches!(engine.pending(), Some(PendingInput::Programs { .. })));
    }

    #[test]
    fn all_robots_destroyed_ends_the_game_for_everyone() {
        let board = ScenarioBuilder::new("doom", 4, 1)
            .start_point(1, 0, 0)
            .start_point(2, 2, 0)
            .flag(1, 3, 0)
            .wall(0, 0, Direction::North, WallKind::Crusher2)
            .wall(2, 0, Direction::North, WallKind::Crusher2)
            .build();
        let mut cfg = GameConfig::default();
        cfg.starting_life_tokens = 1;
        cfg.fill_with_bots = false;
        cfg.player_count = 2;

        let alpha = ManualClient::new("alpha");
        let beta = ManualClient::new("beta");
        let alpha_over = alpha.game_over_seen.clone();
        let beta_over = beta.game_over_seen.clone();

        let mut engine = GameEngine::new(board, cfg);
        assert!(engine.join(Box::new(alpha)));
        assert!(engine.join(Box::new(beta)));
        assert!(engine.start());
        submit_all(&mut engine);

        assert!(engine.is_finished());
        assert_eq!(engine.winner(), None);
        assert!(alpha_over.get());
        assert!(beta_over.get());
    }

    #[test]
    fn king_of_the_flag_pickup_and_victory() {
        let board = ScenarioBuilder::new("king", 4, 1)
            .start_point(1, 0, 0)
            .start_point(2, 2, 0)
            .king_of_flag_point(0, 0)
            .build();
        let mut cfg = GameConfig::default();
        cfg.mode = GameMode::KingOfTheFlag;
        cfg.points_to_win_king_of = 0.2;
        let mut engine = manual_engine(board, cfg);
        assert!(engine.start());
        submit_all(&mut engine);

        assert!(engine.is_finished());
        assert_eq!(engine.winner(), Some(0));
        assert!(engine.robots()[0].has_flag);
        assert!(engine.board().king_flag_position().is_none());
    }

    #[test]
    fn bots_fill_seats_and_play_unattended() {
        // fully fenced 2x1 board; the second seat starts on the flag, so
        // the first archive marker check decides the game no matter what
        // cards the bots drew
        let board = ScenarioBuilder::new("bots", 2, 1)
            .start_point(1, 0, 0)
            .start_point(2, 1, 0)
            .flag(1, 1, 0)
            .wall(0, 0, Direction::West, WallKind::Standard)
            .wall(1, 0, Direction::East, WallKind::Standard)
            .wall(0, 0, Direction::North, WallKind::Standard)
            .wall(1, 0, Direction::North, WallKind::Standard)
            .wall(0, 0, Direction::South, WallKind::Standard)
            .wall(1, 0, Direction::South, WallKind::Standard)
            .build();
        let mut cfg = GameConfig::default();
        cfg.fill_with_bots = true;
        cfg.player_count = 2;
        cfg.seed = 11;
        let mut engine = GameEngine::new(board, cfg);
        assert!(engine.start());

        // bots never block; the match ran to its conclusion inline
        assert!(engine.pending().is_none());
        assert!(engine.is_finished());
        assert_eq!(engine.winner(), Some(1));
    }

    #[test]
    fn animation_barrier_blocks_until_all_clients_ack() {
        let mut cfg = GameConfig::default();
        cfg.use_animation = true;
        let mut engine = manual_engine(fenced_strip(), cfg);
        assert!(engine.start());
        submit_all(&mut engine);

        let Some(PendingInput::Animation { kind, waiting }) = engine.pending().cloned() else {
            panic!("expected animation barrier");
        };
        assert_eq!(kind, AnimationKind::RobotMovement);
        assert_eq!(waiting.len(), 2);

        engine.acknowledge_animation(0);
        assert!(matches!(engine.pending(), Some(PendingInput::Animation { .. })));
        engine.acknowledge_animation(1);
        // machine moved on to the next animated sub-step of the round
        assert!(engine.pending().is_some());
        assert_ne!(
            engine.state(),
            EngineState::PlayRound(RoundStep::MoveRobots),
            "machine advanced past the movement step"
        );
    }

    #[test]
    fn disconnected_client_is_replaced_by_a_bot_mid_barrier() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());

        // only one human answers; the other seat vanishes
        let waiting = match engine.pending() {
            Some(PendingInput::Programs { waiting }) => waiting.clone(),
            other => panic!("expected programming barrier, got {other:?}"),
        };
        assert_eq!(waiting.len(), 2);
        engine.submit_program(0);
        engine.client_disconnected(1);

        // the bot finished programming, the round ran, and the next one is
        // already waiting for participant 0 again
        assert!(
            matches!(engine.pending(), Some(PendingInput::Programs { waiting }) if waiting == &vec![0])
        );
        assert_eq!(card_census(&engine), SUPPLY_SIZE);
    }

    #[test]
    fn stalled_barrier_resolution_substitutes_bots() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        engine.resolve_stalled_barrier();

        // both seats are bots now: nothing is ever left waiting on a human
        assert!(engine.pending().is_none());
    }

    #[test]
    fn power_down_skips_dealing_and_resets_damage() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        engine.robots[0].damage = 4;

        assert!(engine.request_power_down(0));
        // toggling twice cancels
        assert!(!engine.request_power_down(0));
        assert!(engine.request_power_down(0));

        submit_all(&mut engine);

        assert!(engine.robots()[0].powered_down);
        assert_eq!(engine.robots()[0].damage, 0);
        let dealt = engine.deck(0).hand().iter().filter(|c| !c.is_empty()).count();
        assert_eq!(dealt, 0, "powered-down robots receive no cards");
        // the other participant still programs normally
        assert!(
            matches!(engine.pending(), Some(PendingInput::Programs { waiting }) if waiting == &vec![1])
        );
    }

    #[test]
    fn powered_down_robot_wakes_up_next_cleanup() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        engine.request_power_down(0);
        submit_all(&mut engine);
        assert!(engine.robots()[0].powered_down);

        // one more round: only participant 1 programs
        submit_all(&mut engine);
        assert!(!engine.robots()[0].powered_down, "woken during cleanup");
        assert!(
            matches!(engine.pending(), Some(PendingInput::Programs { waiting }) if waiting.len() == 2)
        );
    }

    #[test]
    fn damage_reduces_next_deal() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        engine.robots[0].damage = 3;
        submit_all(&mut engine);

        let dealt = engine.deck(0).hand().iter().filter(|c| !c.is_empty()).count();
        assert_eq!(dealt, 6, "9 - 3 damage tokens");
        let dealt_other = engine.deck(1).hand().iter().filter(|c| !c.is_empty()).count();
        assert_eq!(dealt_other, 9);
    }

    #[test]
    fn repair_tile_updates_archive_marker_and_heals() {
        let mut builder = ScenarioBuilder::new("repair", 4, 2)
            .start_point(1, 0, 0)
            .start_point(2, 3, 0)
            .flag(1, 0, 1)
            .floor(1, 0, FloorKind::Repair, Direction::North)
            .start_orientation(Direction::North)
            .wall(0, 0, Direction::West, WallKind::Standard)
            .wall(3, 0, Direction::East, WallKind::Standard);
        for x in 0..4 {
            builder = builder
                .wall(x, 0, Direction::North, WallKind::Standard)
                .wall(x, 0, Direction::South, WallKind::Standard);
        }
        let mut engine = manual_engine(builder.build(), GameConfig::default());
        assert!(engine.start());

        engine.robots[0].dir = Direction::East;
        engine.robots[0].damage = 3;
        force_program_card(&mut engine, 0, 1, Card::new(CardKind::MoveForward1, 600));
        submit_all(&mut engine);

        let healed = &engine.robots()[0];
        assert_eq!(healed.pos, IVec2::new(1, 0));
        assert_eq!(healed.archive_marker, IVec2::new(1, 0), "marker moved to the repair tile");
        assert_eq!(healed.damage, 2, "one token repaired at round end");
    }

    #[test]
    fn randomizer_swaps_cards_and_conserves_the_supply() {
        let mut builder = ScenarioBuilder::new("rand", 4, 2)
            .start_point(1, 0, 0)
            .start_point(2, 3, 0)
            .flag(1, 0, 1)
            .floor(0, 0, FloorKind::Randomizer, Direction::North)
            .start_orientation(Direction::North)
            .wall(0, 0, Direction::West, WallKind::Standard)
            .wall(3, 0, Direction::East, WallKind::Standard);
        for x in 0..4 {
            builder = builder
                .wall(x, 0, Direction::North, WallKind::Standard)
                .wall(x, 0, Direction::South, WallKind::Standard);
        }
        let mut engine = manual_engine(builder.build(), GameConfig::default());
        assert!(engine.start());
        assert_eq!(card_census(&engine), SUPPLY_SIZE);

        submit_all(&mut engine);

        assert!(
            engine
                .game_log()
                .entries()
                .iter()
                .any(|e| e.text.contains("Replaced a program card")),
            "randomizer never fired"
        );
        assert_eq!(card_census(&engine), SUPPLY_SIZE);
    }

    #[test]
    fn virtual_robots_materialize_when_alone() {
        let mut cfg = GameConfig::default();
        cfg.virtual_robot_mode = true;
        let mut engine = manual_engine(fenced_strip(), cfg);
        assert!(engine.start());
        assert!(engine.robots().iter().all(|r| r.is_virtual));

        submit_all(&mut engine);

        // cleanup saw both robots alone on their tiles
        assert!(engine.robots().iter().all(|r| !r.is_virtual));
    }

    #[test]
    fn heavy_damage_locks_program_slots_across_rounds() {
        let mut engine = manual_engine(fenced_strip(), GameConfig::default());
        assert!(engine.start());
        engine.robots[0].damage = 6;
        // slot locks follow damage at sub-step boundaries; trigger the
        // same sync the round flow uses
        engine.sync_deck_locks();
        force_program_card(&mut engine, 0, 5, Card::new(CardKind::TurnLeft, 71));
        force_program_card(&mut engine, 0, 4, Card::new(CardKind::TurnRight, 81));
        submit_all(&mut engine);

        // slots 4 and 5 survived the cleanup, the rest was cleared
        let deck = engine.deck(0);
        assert_eq!(deck.card_in_program(4).priority, 81);
        assert_eq!(deck.card_in_program(5).priority, 71);
        assert_eq!(deck.min_locked_slot(), 4);
    }
}
