//! Program cards and the shared card supply
//!
//! Every card exists exactly once. Dealt cards leave the supply and live in
//! a participant's hand or program until the round cleanup returns them.
//! Cards locked into a program by damage stay out across rounds, so the
//! supply must never hand out a second copy.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::consts::SUPPLY_SIZE;

/// The card types used to program a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CardKind {
    /// Free slot marker, never dealt from the supply
    #[default]
    Empty = 0,
    /// Back side of the deck, shown for hidden cards, never dealt
    Back,
    /// Move 1 tile in the heading direction
    MoveForward1,
    /// Move 2 tiles in the heading direction
    MoveForward2,
    /// Move 3 tiles in the heading direction
    MoveForward3,
    /// Move 1 tile against the heading direction
    MoveBackward,
    /// Rotate 90 degrees to the left
    TurnLeft,
    /// Rotate 90 degrees to the right
    TurnRight,
    /// Rotate 180 degrees
    TurnAround,
}

impl CardKind {
    fn from_wire(value: u16) -> Option<Self> {
        Some(match value {
            0 => CardKind::Empty,
            1 => CardKind::Back,
            2 => CardKind::MoveForward1,
            3 => CardKind::MoveForward2,
            4 => CardKind::MoveForward3,
            5 => CardKind::MoveBackward,
            6 => CardKind::TurnLeft,
            7 => CardKind::TurnRight,
            8 => CardKind::TurnAround,
            _ => return None,
        })
    }

    /// Short human readable description, used by the log and UIs
    pub fn info(self) -> &'static str {
        match self {
            CardKind::Empty | CardKind::Back => "",
            CardKind::MoveForward1 => "Move robot 1 step forward",
            CardKind::MoveForward2 => "Move robot 2 steps forward",
            CardKind::MoveForward3 => "Move robot 3 steps forward",
            CardKind::MoveBackward => "Move robot 1 step backwards",
            CardKind::TurnLeft => "Rotate robot 90 degrees to the left",
            CardKind::TurnRight => "Rotate robot 90 degrees to the right",
            CardKind::TurnAround => "Rotate the robot 180 degrees around",
        }
    }
}

/// A card to program the robot: a type plus a resolution priority.
///
/// When two robots would interact (pushing for example), the card with the
/// higher priority resolves first. Priorities are unique across the whole
/// supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Card {
    pub kind: CardKind,
    pub priority: u16,
}

impl Card {
    /// Sentinel for a free slot
    pub const EMPTY: Card = Card {
        kind: CardKind::Empty,
        priority: 0,
    };

    pub fn new(kind: CardKind, priority: u16) -> Self {
        Self { kind, priority }
    }

    pub fn is_empty(self) -> bool {
        self.kind == CardKind::Empty
    }

    /// Legacy wire format: two big-endian u16 values, `(type, priority)`
    pub fn encode(self) -> [u8; 4] {
        let kind = (self.kind as u16).to_be_bytes();
        let priority = self.priority.to_be_bytes();
        [kind[0], kind[1], priority[0], priority[1]]
    }

    /// Decodes the two-u16 wire format; `None` for unknown card types
    pub fn decode(bytes: &[u8]) -> Option<Card> {
        if bytes.len() < 4 {
            return None;
        }
        let kind = CardKind::from_wire(u16::from_be_bytes([bytes[0], bytes[1]]))?;
        let priority = u16::from_be_bytes([bytes[2], bytes[3]]);
        Some(Card { kind, priority })
    }
}

/// Count and priority ladder per card type. Priorities are disjoint between
/// the types and evenly spaced inside each band, so every dealt card carries
/// a unique priority.
const SUPPLY_LADDER: [(CardKind, usize, u16, u16); 7] = [
    (CardKind::TurnAround, 6, 10, 10),
    (CardKind::TurnLeft, 18, 70, 20),
    (CardKind::TurnRight, 18, 80, 20),
    (CardKind::MoveBackward, 6, 430, 10),
    (CardKind::MoveForward1, 18, 490, 10),
    (CardKind::MoveForward2, 12, 670, 10),
    (CardKind::MoveForward3, 6, 790, 10),
];

/// The draw pile all participants are dealt from.
///
/// After `load` the pile holds the full fixed card set. Returning a card
/// mid-game (randomizer tiles) marks the pile unshuffled, which forces a
/// reshuffle before the next deal.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardSupply {
    pile: Vec<Card>,
    shuffled: bool,
}

impl CardSupply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the canonical fixed card set, discarding anything
    /// currently outstanding.
    pub fn load(&mut self) {
        self.pile.clear();
        for (kind, count, base, step) in SUPPLY_LADDER {
            for i in 0..count {
                self.pile.push(Card::new(kind, base + i as u16 * step));
            }
        }
        debug_assert_eq!(self.pile.len(), SUPPLY_SIZE);
        self.shuffled = false;
    }

    /// Randomizes the draw order. Only affects future deals.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.pile.shuffle(rng);
        self.shuffled = true;
    }

    /// Removes and returns the top card. The supply is sized so that a
    /// correctly integrated engine can never drain it; an empty deal is a
    /// contract violation answered with an EMPTY card and a warning.
    pub fn deal<R: Rng>(&mut self, rng: &mut R) -> Card {
        if !self.shuffled {
            self.shuffle(rng);
        }

        match self.pile.pop() {
            Some(card) => card,
            None => {
                log::warn!("deal from an empty card supply");
                Card::EMPTY
            }
        }
    }

    /// Puts a card back into the pile. Empty or back-side sentinels are
    /// rejected; those never belong to the supply.
    pub fn put_back(&mut self, card: Card) {
        if card.kind == CardKind::Empty || card.kind == CardKind::Back {
            log::warn!("tried to put an empty or back card into the supply");
            return;
        }

        self.pile.push(card);
        self.shuffled = false;
    }

    pub fn len(&self) -> usize {
        self.pile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pile.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    #[test]
    fn loaded_supply_has_the_full_card_set() {
        let mut supply = CardSupply::new();
        supply.load();
        assert_eq!(supply.len(), SUPPLY_SIZE);

        let counts = |kind| {
            let mut supply = CardSupply::new();
            supply.load();
            let mut rng = Pcg32::seed_from_u64(0);
            let mut n = 0;
            for _ in 0..SUPPLY_SIZE {
                if supply.deal(&mut rng).kind == kind {
                    n += 1;
                }
            }
            n
        };
        assert_eq!(counts(CardKind::MoveForward1), 18);
        assert_eq!(counts(CardKind::TurnAround), 6);
        assert_eq!(counts(CardKind::MoveForward2), 12);
    }

    #[test]
    fn priorities_are_unique_across_the_supply() {
        let mut supply = CardSupply::new();
        supply.load();
        let mut rng = Pcg32::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..SUPPLY_SIZE {
            let card = supply.deal(&mut rng);
            assert!(!card.is_empty());
            assert!(seen.insert(card.priority), "duplicate {}", card.priority);
        }
    }

    #[test]
    fn put_back_rejects_sentinels() {
        let mut supply = CardSupply::new();
        supply.load();
        let mut rng = Pcg32::seed_from_u64(1);
        supply.shuffle(&mut rng);

        let before = supply.len();
        supply.put_back(Card::EMPTY);
        supply.put_back(Card::new(CardKind::Back, 99));
        assert_eq!(supply.len(), before);
        assert!(supply.is_shuffled());
    }

    #[test]
    fn put_back_forces_a_reshuffle() {
        let mut supply = CardSupply::new();
        supply.load();
        let mut rng = Pcg32::seed_from_u64(2);

        let card = supply.deal(&mut rng);
        assert!(supply.is_shuffled());
        supply.put_back(card);
        assert!(!supply.is_shuffled());
        // dealing again works and reshuffles on demand
        let _ = supply.deal(&mut rng);
        assert!(supply.is_shuffled());
    }

    #[test]
    fn same_seed_same_deal_order() {
        let deal_all = |seed| {
            let mut supply = CardSupply::new();
            supply.load();
            let mut rng = Pcg32::seed_from_u64(seed);
            (0..SUPPLY_SIZE)
                .map(|_| supply.deal(&mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(deal_all(42), deal_all(42));
        assert_ne!(deal_all(42), deal_all(43));
    }

    #[test]
    fn wire_format_round_trip() {
        let card = Card::new(CardKind::MoveForward2, 720);
        let bytes = card.encode();
        assert_eq!(bytes, [0, 3, 2, 208]);
        assert_eq!(Card::decode(&bytes), Some(card));
        assert_eq!(Card::decode(&bytes[..3]), None);
        assert_eq!(Card::decode(&[0, 42, 0, 0]), None);
    }
}
