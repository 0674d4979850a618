use crate::deal::{Card, Deal, MAX_SUIT, TABLEAU_CARDS, TOTAL_CARDS, TOTAL_TABLEAUS};

use anyhow::bail;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => bail!("Invalid difficulty '{s}', expected easy, medium or hard"),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// One placement constraint: a shuffled group of cards bound to a slot range
/// of the flat layout. Groups that cannot fit their range spill either into
/// the stock slots or into the first free slot anywhere, so building never
/// fails and never loses a card.
struct ZoneRule {
    cards: Vec<Card>,
    range: RangeInclusive<usize>,
    overflow_to_stock: bool,
}

const ANYWHERE: RangeInclusive<usize> = 0..=TOTAL_CARDS - 1;
const STOCK_SLOTS: RangeInclusive<usize> = TABLEAU_CARDS..=TOTAL_CARDS - 1;

/// Constructive deal builder. Works on a flat 52-slot layout: slots 0..28
/// map row-major diagonally onto the triangular tableau (slots 0..7 are the
/// column bottoms, slot 27 the seventh column's top) and slots 28..52 become
/// the stock in index order.
pub struct DealBuilder {
    rng: StdRng,
}

impl DealBuilder {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn build(&mut self, difficulty: Difficulty, draw_count: usize) -> Deal {
        let mut slots: [Option<Card>; TOTAL_CARDS] = [None; TOTAL_CARDS];
        for rule in self.zone_rules(difficulty) {
            self.place_group(&mut slots, rule);
        }

        let mut deal = Deal::new(draw_count);
        let mut index = 0;
        for row in 0..TOTAL_TABLEAUS {
            for col in row..TOTAL_TABLEAUS {
                if let Some(card) = slots[index] {
                    deal.tableaus[col].push(card);
                }
                index += 1;
            }
        }
        for col in 0..TOTAL_TABLEAUS {
            deal.flip_top(col);
        }
        for slot in &slots[TABLEAU_CARDS..] {
            if let Some(card) = slot {
                deal.stock.push(*card);
            }
        }
        deal
    }

    fn zone_rules(&mut self, difficulty: Difficulty) -> Vec<ZoneRule> {
        let aces = rank_group(0..=0);
        let twos = rank_group(1..=1);
        let kings = rank_group(12..=12);
        let low_mids = rank_group(2..=6);
        let high_mids = rank_group(7..=11);

        match difficulty {
            Difficulty::Easy => vec![
                // Shallow kings, aces and twos within easy reach of the talon.
                ZoneRule {
                    cards: kings,
                    range: 0..=8,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: aces,
                    range: 26..=TOTAL_CARDS - 1,
                    overflow_to_stock: true,
                },
                ZoneRule {
                    cards: twos,
                    range: 26..=TOTAL_CARDS - 1,
                    overflow_to_stock: true,
                },
                ZoneRule {
                    cards: low_mids,
                    range: ANYWHERE,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: high_mids,
                    range: ANYWHERE,
                    overflow_to_stock: false,
                },
            ],
            Difficulty::Medium => {
                let mut aces = aces;
                aces.shuffle(&mut self.rng);
                let easy_aces = aces.split_off(2);
                vec![
                    ZoneRule {
                        cards: aces,
                        range: 0..=10,
                        overflow_to_stock: false,
                    },
                    ZoneRule {
                        cards: easy_aces,
                        range: 20..=TOTAL_CARDS - 1,
                        overflow_to_stock: true,
                    },
                    ZoneRule {
                        cards: twos,
                        range: ANYWHERE,
                        overflow_to_stock: false,
                    },
                    ZoneRule {
                        cards: kings,
                        range: ANYWHERE,
                        overflow_to_stock: false,
                    },
                    ZoneRule {
                        cards: low_mids,
                        range: ANYWHERE,
                        overflow_to_stock: false,
                    },
                    ZoneRule {
                        cards: high_mids,
                        range: ANYWHERE,
                        overflow_to_stock: false,
                    },
                ]
            }
            Difficulty::Hard => vec![
                // Aces on the column floors, twos just above them, kings
                // burying the tall columns, low ranks packed at blocking depth.
                ZoneRule {
                    cards: aces,
                    range: 0..=6,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: twos,
                    range: 7..=15,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: kings,
                    range: 21..=27,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: low_mids,
                    range: 10..=25,
                    overflow_to_stock: false,
                },
                ZoneRule {
                    cards: high_mids,
                    range: ANYWHERE,
                    overflow_to_stock: false,
                },
            ],
        }
    }

    fn place_group(&mut self, slots: &mut [Option<Card>; TOTAL_CARDS], rule: ZoneRule) {
        let ZoneRule {
            mut cards,
            range,
            overflow_to_stock,
        } = rule;
        cards.shuffle(&mut self.rng);
        for card in cards {
            let mut slot = self.pick_free(slots, range.clone());
            if slot.is_none() && overflow_to_stock {
                slot = self.pick_free(slots, STOCK_SLOTS);
            }
            let slot = slot.or_else(|| slots.iter().position(|s| s.is_none()));
            if let Some(idx) = slot {
                slots[idx] = Some(card);
            }
        }
    }

    fn pick_free(
        &mut self,
        slots: &[Option<Card>; TOTAL_CARDS],
        range: RangeInclusive<usize>,
    ) -> Option<usize> {
        let free: SmallVec<[usize; TOTAL_CARDS]> =
            range.filter(|&i| slots[i].is_none()).collect();
        if free.is_empty() {
            None
        } else {
            Some(free[self.rng.random_range(0..free.len())])
        }
    }
}

impl Default for DealBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn rank_group(ranks: RangeInclusive<u8>) -> Vec<Card> {
    let mut cards = Vec::new();
    for suit in 0..MAX_SUIT {
        for rank in ranks.clone() {
            cards.push(Card::new(rank, suit));
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_shape_and_conservation() {
        let mut builder = DealBuilder::with_seed(7);
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for draw_count in [1, 3] {
                let deal = builder.build(difficulty, draw_count);
                assert!(deal.is_valid(), "{difficulty} deal invalid");
                assert_eq!(deal.stock.len(), TOTAL_CARDS - TABLEAU_CARDS);
                assert_eq!(deal.draw_count(), draw_count);
                for (i, tableau) in deal.tableaus.iter().enumerate() {
                    assert_eq!(tableau.len(), i + 1);
                    let face_up = tableau.iter().filter(|c| c.face_up).count();
                    assert_eq!(face_up, 1);
                    assert!(tableau.last().is_some_and(|c| c.face_up));
                }
            }
        }
    }

    #[test]
    fn test_hard_buries_aces_on_column_floors() {
        let mut builder = DealBuilder::with_seed(11);
        for _ in 0..20 {
            let deal = builder.build(Difficulty::Hard, 1);
            let mut floors = 0;
            for tableau in &deal.tableaus {
                floors += usize::from(tableau[0].is_ace());
            }
            assert_eq!(floors, 4, "all four aces belong on column floors");
            assert!(deal.stock.iter().all(|c| !c.is_ace()));
        }
    }

    #[test]
    fn test_easy_keeps_kings_shallow() {
        let mut builder = DealBuilder::with_seed(13);
        for _ in 0..20 {
            let deal = builder.build(Difficulty::Easy, 1);
            for tableau in &deal.tableaus {
                for (depth, card) in tableau.iter().enumerate() {
                    if card.is_king() {
                        assert!(depth <= 1, "king buried at depth {depth}");
                    }
                }
            }
            assert!(deal.stock.iter().all(|c| !c.is_king()));
        }
    }

    #[test]
    fn test_seeded_builds_are_deterministic() {
        let deal_a = DealBuilder::with_seed(99).build(Difficulty::Medium, 3);
        let deal_b = DealBuilder::with_seed(99).build(Difficulty::Medium, 3);
        assert_eq!(deal_a.pretty_print(), deal_b.pretty_print());
    }
}
