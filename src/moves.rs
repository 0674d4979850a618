use crate::deal::{Deal, TOTAL_FOUNDATIONS, TOTAL_TABLEAUS, TableauPile, TalonPile};

use smallvec::SmallVec;
use std::fmt;

pub type MoveList = SmallVec<[Move; 24]>;

/// Where a foundation-bound card comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Tableau(usize),
    Waste,
}

/// The closed set of legal transitions. Each variant carries only the fields
/// its application needs; `StockDraw` reads the draw count from the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Send the top card of a column or of the waste to its foundation.
    Foundation { from: Origin },
    /// Move a column's full face-up run onto another column, exposing a
    /// face-down card underneath.
    RevealTableau { from: usize, to: usize, count: usize },
    /// Move a column's full face-up run onto another column without exposing
    /// anything (the run is the whole column).
    MoveTableau { from: usize, to: usize, count: usize },
    /// Play the top waste card onto a column.
    WasteToTableau { to: usize },
    /// Return a foundation top back onto a column.
    FoundationToTableau { suit: usize, to: usize },
    /// Flip `draw_count` cards from stock to waste.
    StockDraw,
    /// Turn the whole waste face-down back into the stock.
    RecycleWaste,
}

impl Move {
    /// Static rank used to order candidate moves before expansion; higher
    /// values are tried first.
    pub fn priority(&self) -> u8 {
        match self {
            Move::Foundation { .. } => 90,
            Move::RevealTableau { .. } => 80,
            Move::WasteToTableau { .. } => 60,
            Move::MoveTableau { .. } => 50,
            Move::StockDraw => 40,
            Move::FoundationToTableau { .. } => 25,
            Move::RecycleWaste => 10,
        }
    }

    /// Relocating a run that reveals nothing rearranges built sequences
    /// rather than progressing; counted separately for difficulty metrics.
    pub fn is_sequence_break(&self) -> bool {
        matches!(self, Move::MoveTableau { .. })
    }

    pub fn is_recycle(&self) -> bool {
        matches!(self, Move::RecycleWaste)
    }

    pub fn is_foundation_return(&self) -> bool {
        matches!(self, Move::FoundationToTableau { .. })
    }

    pub fn apply(&self, deal: &mut Deal) {
        match *self {
            Move::Foundation { from } => {
                let card = match from {
                    Origin::Tableau(i) => deal.tableaus[i].pop(),
                    Origin::Waste => deal.waste.pop(),
                };
                if let Some(mut card) = card {
                    card.face_up = true;
                    deal.foundations[card.suit() as usize].push(card);
                }
                if let Origin::Tableau(i) = from {
                    deal.flip_top(i);
                }
            }
            Move::RevealTableau { from, to, count } | Move::MoveTableau { from, to, count } => {
                let split_at = deal.tableaus[from].len() - count;
                let run: TableauPile = deal.tableaus[from].drain(split_at..).collect();
                deal.tableaus[to].extend(run);
                deal.flip_top(from);
            }
            Move::WasteToTableau { to } => {
                if let Some(card) = deal.waste.pop() {
                    deal.tableaus[to].push(card);
                }
            }
            Move::FoundationToTableau { suit, to } => {
                if let Some(card) = deal.foundations[suit].pop() {
                    deal.tableaus[to].push(card);
                }
            }
            Move::StockDraw => {
                let n = deal.draw_count().min(deal.stock.len());
                let start = deal.stock.len() - n;
                let drawn: TalonPile = deal.stock.drain(start..).collect();
                for mut card in drawn.into_iter().rev() {
                    card.face_up = true;
                    deal.waste.push(card);
                }
            }
            Move::RecycleWaste => {
                let recycled: TalonPile = deal.waste.drain(..).collect();
                for mut card in recycled.into_iter().rev() {
                    card.face_up = false;
                    deal.stock.push(card);
                }
            }
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::Foundation {
                from: Origin::Tableau(i),
            } => write!(f, "T{}:F", i + 1),
            Move::Foundation { from: Origin::Waste } => write!(f, "W:F"),
            Move::RevealTableau { from, to, count } | Move::MoveTableau { from, to, count } => {
                if count > 1 {
                    write!(f, "T{}:T{}@{count}", from + 1, to + 1)
                } else {
                    write!(f, "T{}:T{}", from + 1, to + 1)
                }
            }
            Move::WasteToTableau { to } => write!(f, "W:T{}", to + 1),
            Move::FoundationToTableau { suit, to } => write!(f, "F{}:T{}", suit + 1, to + 1),
            Move::StockDraw => write!(f, "D"),
            Move::RecycleWaste => write!(f, "R"),
        }
    }
}

/// Renders a solution as compact columns, run-length compressing draws.
pub fn format_moves(moves: &[Move]) -> String {
    let mut list = vec![];
    let mut i = 0;
    while i < moves.len() {
        if matches!(moves[i], Move::StockDraw) {
            let mut count = 1;
            while i + count < moves.len() && matches!(moves[i + count], Move::StockDraw) {
                count += 1;
            }
            let str = if count == 1 {
                "D".into()
            } else {
                format!("{count}D")
            };
            list.push(str);
            i += count;
            continue;
        }
        list.push(moves[i].to_string());
        i += 1;
    }

    let mut output = String::new();
    let max_width = list.iter().map(|s| s.chars().count()).max().unwrap_or_default() + 1;
    for chunk in list.chunks(10) {
        for cmd in chunk {
            output.push_str(&format!("{cmd:<width$}", width = max_width));
        }
        output.push('\n');
    }

    output
}

/// Enumerates every legal move from a state, ordered by descending static
/// priority. King runs get at most one empty-column target; a King run
/// already sitting on the column floor is never offered an empty column.
pub fn generate_moves(deal: &Deal) -> MoveList {
    let mut moves = MoveList::new();

    for i in 0..TOTAL_TABLEAUS {
        if let Some(card) = deal.tableaus[i].last()
            && card.face_up
            && deal.can_add_to_foundation(*card)
        {
            moves.push(Move::Foundation {
                from: Origin::Tableau(i),
            });
        }
    }
    if let Some(card) = deal.waste.last()
        && deal.can_add_to_foundation(*card)
    {
        moves.push(Move::Foundation { from: Origin::Waste });
    }

    for from in 0..TOTAL_TABLEAUS {
        let Some(start) = deal.face_up_start(from) else {
            continue;
        };
        let run_bottom = deal.tableaus[from][start];
        let count = deal.tableaus[from].len() - start;
        let mut empty_used = false;
        for to in 0..TOTAL_TABLEAUS {
            if to == from {
                continue;
            }
            if deal.tableaus[to].is_empty() {
                if run_bottom.is_king() && start > 0 && !empty_used {
                    moves.push(Move::RevealTableau { from, to, count });
                    empty_used = true;
                }
            } else if deal.can_place_on_tableau(to, run_bottom) {
                if start > 0 {
                    moves.push(Move::RevealTableau { from, to, count });
                } else {
                    moves.push(Move::MoveTableau { from, to, count });
                }
            }
        }
    }

    if let Some(card) = deal.waste.last() {
        let mut empty_used = false;
        for to in 0..TOTAL_TABLEAUS {
            if deal.tableaus[to].is_empty() {
                if card.is_king() && !empty_used {
                    moves.push(Move::WasteToTableau { to });
                    empty_used = true;
                }
            } else if deal.can_place_on_tableau(to, *card) {
                moves.push(Move::WasteToTableau { to });
            }
        }
    }

    for suit in 0..TOTAL_FOUNDATIONS {
        let Some(card) = deal.foundations[suit].last() else {
            continue;
        };
        for to in 0..TOTAL_TABLEAUS {
            // Kings never return onto an empty column.
            if !deal.tableaus[to].is_empty() && deal.can_place_on_tableau(to, *card) {
                moves.push(Move::FoundationToTableau { suit, to });
            }
        }
    }

    if !deal.stock.is_empty() {
        moves.push(Move::StockDraw);
    } else if !deal.waste.is_empty() {
        moves.push(Move::RecycleWaste);
    }

    moves.sort_by(|a, b| b.priority().cmp(&a.priority()));
    moves
}
