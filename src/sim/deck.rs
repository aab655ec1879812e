//! Per-participant card deck
//!
//! Two ordered slot banks: the hand (9 slots dealt each round) and the
//! program (5 slots resolved one per phase). Slot numbers are 1-based in
//! this API, matching the legacy deck-widget contract.
//!
//! Damage locks program slots from the back: a locked slot keeps its card
//! across rounds and is exempt from every player-driven change. Only forced
//! system assignment (power-down refills) may write into a locked slot.

use serde::{Deserialize, Serialize};

use crate::consts::{HAND_SIZE, MAX_DAMAGE_TOKENS, PROGRAM_SIZE};
use crate::sim::cards::Card;

/// Lowest locked program slot for a damage count, or `None` while no slot
/// is locked. The first slot locks at the fifth damage token; at maximum
/// damage the floor is slot 1.
pub fn locked_slot_for(damage: u8) -> Option<u16> {
    let free_threshold = MAX_DAMAGE_TOKENS - PROGRAM_SIZE as u8 - 1;
    if damage > free_threshold {
        Some((MAX_DAMAGE_TOKENS as u16).saturating_sub(damage as u16).max(1))
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDeck {
    hand: [Card; HAND_SIZE],
    program: [Card; PROGRAM_SIZE],
    /// 1-based slot number; every program slot >= this is locked.
    /// `PROGRAM_SIZE + 1` means nothing is locked.
    min_locked_slot: u16,
    programming_locked: bool,
}

impl Default for ProgramDeck {
    fn default() -> Self {
        Self {
            hand: [Card::EMPTY; HAND_SIZE],
            program: [Card::EMPTY; PROGRAM_SIZE],
            min_locked_slot: PROGRAM_SIZE as u16 + 1,
            programming_locked: false,
        }
    }
}

impl ProgramDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks or unlocks the whole program for editing. Locked programming
    /// means the participant has committed this round's program.
    pub fn lock_programming(&mut self, lock: bool) {
        self.programming_locked = lock;
    }

    pub fn is_programming_locked(&self) -> bool {
        self.programming_locked
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn program(&self) -> &[Card] {
        &self.program
    }

    pub fn card_in_hand(&self, slot: u16) -> Card {
        self.hand[slot as usize - 1]
    }

    pub fn card_in_program(&self, slot: u16) -> Card {
        self.program[slot as usize - 1]
    }

    /// Places a card into the first empty hand slot. A full hand drops the
    /// card; dealt-card accounting makes that a contract violation.
    pub fn add_card_to_hand(&mut self, card: Card) {
        self.programming_locked = false;

        match self.hand.iter().position(|c| c.is_empty()) {
            Some(free) => self.hand[free] = card,
            None => log::warn!("hand is full, dealt card dropped"),
        }
    }

    pub fn next_free_hand_slot(&self) -> Option<u16> {
        self.hand
            .iter()
            .position(|c| c.is_empty())
            .map(|i| i as u16 + 1)
    }

    pub fn next_free_program_slot(&self) -> Option<u16> {
        self.program
            .iter()
            .position(|c| c.is_empty())
            .map(|i| i as u16 + 1)
    }

    /// Moves a hand card into a program slot, swapping any displaced
    /// program card back into the vacated hand slot. Fails on locked
    /// targets without touching anything.
    pub fn move_card_to_program(&mut self, hand_slot: u16, program_slot: u16) -> bool {
        if self.is_program_slot_locked(program_slot) {
            return false;
        }

        let h = hand_slot as usize - 1;
        let p = program_slot as usize - 1;
        let moved = self.hand[h];
        self.hand[h] = self.program[p];
        self.program[p] = moved;
        true
    }

    /// Moves a program card back into a hand slot; symmetric to
    /// [`move_card_to_program`](Self::move_card_to_program).
    pub fn move_card_to_hand(&mut self, program_slot: u16, hand_slot: u16) -> bool {
        if self.is_program_slot_locked(program_slot) {
            return false;
        }

        let p = program_slot as usize - 1;
        let h = hand_slot as usize - 1;
        let moved = self.program[p];
        self.program[p] = self.hand[h];
        self.hand[h] = moved;
        true
    }

    pub fn swap_in_hand(&mut self, slot_a: u16, slot_b: u16) -> bool {
        self.hand.swap(slot_a as usize - 1, slot_b as usize - 1);
        true
    }

    pub fn swap_in_program(&mut self, slot_a: u16, slot_b: u16) -> bool {
        if self.is_program_slot_locked(slot_a) || self.is_program_slot_locked(slot_b) {
            return false;
        }
        self.program.swap(slot_a as usize - 1, slot_b as usize - 1);
        true
    }

    /// Installs a complete program at once (network clients resend the whole
    /// slot row). Cards landing in unlocked slots are removed from the hand;
    /// locked slots keep their stuck card.
    pub fn set_program(&mut self, program: &[Card; PROGRAM_SIZE]) {
        for slot in 1..=PROGRAM_SIZE as u16 {
            if self.is_program_slot_locked(slot) {
                continue;
            }
            let incoming = program[slot as usize - 1];
            self.program[slot as usize - 1] = incoming;
            if let Some(h) = self.hand.iter().position(|c| *c == incoming && !c.is_empty()) {
                self.hand[h] = Card::EMPTY;
            }
        }
    }

    /// Clears a program slot. Removing cards from a committed program
    /// forces the programming lock on.
    pub fn remove_card_from_program(&mut self, slot: u16) {
        self.programming_locked = true;
        self.program[slot as usize - 1] = Card::EMPTY;
    }

    /// Swaps in a replacement card (randomizer tiles) and hands back the
    /// displaced one so it can return to the supply. Bypasses slot locks by
    /// design; this is a forced system assignment.
    pub fn replace_card_in_program(&mut self, new_card: Card, slot: u16) -> Card {
        let old = self.program[slot as usize - 1];
        self.program[slot as usize - 1] = new_card;
        old
    }

    pub fn is_program_slot_locked(&self, slot: u16) -> bool {
        slot >= self.min_locked_slot
    }

    /// Sets the locked-slot boundary directly; `PROGRAM_SIZE + 1` unlocks
    /// everything.
    pub fn lock_from_slot(&mut self, min_slot: u16) {
        self.min_locked_slot = min_slot.clamp(1, PROGRAM_SIZE as u16 + 1);
    }

    /// Recomputes the locked boundary from the robot's damage count.
    pub fn lock_for_damage(&mut self, damage: u8) {
        match locked_slot_for(damage) {
            Some(slot) => self.lock_from_slot(slot),
            None => self.lock_from_slot(PROGRAM_SIZE as u16 + 1),
        }
    }

    pub fn min_locked_slot(&self) -> u16 {
        self.min_locked_slot
    }

    /// Number of program slots the player can still use
    pub fn available_program_slots(&self) -> u16 {
        self.min_locked_slot - 1
    }

    /// Locked program slots currently holding no card. Happens when a
    /// powered-down robot takes damage: the freshly locked slots are empty
    /// and get refilled with random cards during cleanup.
    pub fn locked_slots_without_card(&self) -> u16 {
        (1..=PROGRAM_SIZE as u16)
            .filter(|&slot| {
                self.is_program_slot_locked(slot) && self.card_in_program(slot).is_empty()
            })
            .count() as u16
    }

    /// Forced assignment into the first empty locked slot.
    pub fn add_card_to_locked_program(&mut self, card: Card) -> bool {
        for slot in 1..=PROGRAM_SIZE as u16 {
            if self.is_program_slot_locked(slot) && self.card_in_program(slot).is_empty() {
                self.program[slot as usize - 1] = card;
                return true;
            }
        }
        false
    }

    /// Collects every hand card and every unlocked program card for return
    /// to the supply, resets the emptied slots and reopens programming.
    /// Locked program cards stay in place for the next round.
    pub fn clear_round(&mut self) -> Vec<Card> {
        let mut returned: Vec<Card> = self.hand.iter().copied().filter(|c| !c.is_empty()).collect();
        self.hand = [Card::EMPTY; HAND_SIZE];

        for slot in 1..self.min_locked_slot.min(PROGRAM_SIZE as u16 + 1) {
            let card = self.program[slot as usize - 1];
            if !card.is_empty() {
                returned.push(card);
            }
            self.program[slot as usize - 1] = Card::EMPTY;
        }

        self.programming_locked = false;
        returned
    }

    /// The program can be committed once every slot holds a card and the
    /// deck is not already locked for this round.
    pub fn program_full(&self) -> bool {
        !self.programming_locked && self.program.iter().all(|c| !c.is_empty())
    }
}
