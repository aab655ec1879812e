//! Built-in bot client
//!
//! Fills its program from the hand in slot order and answers every request
//! synchronously, so a barrier never waits on it. Used to fill empty seats
//! and to take over for disconnected or stalled clients.

use glam::IVec2;
use rand::Rng;

use crate::client::{AnimationKind, Client};
use crate::consts::PROGRAM_SIZE;
use crate::sim::board::Direction;
use crate::sim::deck::ProgramDeck;

pub struct SimpleBot {
    name: String,
}

impl SimpleBot {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// A pronounceable throwaway name, alternating consonants and vowels
    pub fn with_random_name<R: Rng>(rng: &mut R) -> Self {
        const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyz";
        const VOWELS: &[u8] = b"aeiou";

        let mut name = String::new();
        for i in 0..8 {
            let pool = if i % 2 == 0 { CONSONANTS } else { VOWELS };
            let c = pool[rng.random_range(0..pool.len())] as char;
            if i == 0 {
                name.extend(c.to_uppercase());
            } else {
                name.push(c);
            }
        }
        Self::new(name)
    }
}

impl Client for SimpleBot {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_bot(&self) -> bool {
        true
    }

    fn start_programming(&mut self, deck: &mut ProgramDeck) -> bool {
        for slot in 1..=PROGRAM_SIZE as u16 {
            deck.move_card_to_program(slot, slot);
        }
        true
    }

    fn select_start_point(&mut self, candidates: &[IVec2]) -> Option<IVec2> {
        candidates.first().copied()
    }

    fn select_start_orientation(&mut self, candidates: &[Direction]) -> Option<Direction> {
        candidates.first().copied()
    }

    fn animation_started(&mut self, _kind: AnimationKind, _phase: u8) -> bool {
        true
    }
}
