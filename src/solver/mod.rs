//! Exhaustive proof of solvability: an iterative depth-bounded DFS with
//! branch-and-bound budgets, heuristic move ordering, and on-path cycle
//! pruning via a transposition key. One engine, two entry points: `run`
//! drives the search to completion, `run_until` resumes it in cooperative
//! slices so a host loop can interleave other work.

mod greedy;

pub use greedy::is_greedy_solvable;

use crate::deal::{Deal, TOTAL_TABLEAUS};
use crate::moves::{Move, MoveList, generate_moves};

use ahash::AHasher;
use rustc_hash::FxHashSet;
use std::hash::Hasher;
use std::time::Instant;

pub const MAX_DEPTH: u32 = 1000;
pub const MAX_STATES: u32 = 30_000;
pub const MAX_RECYCLES: u32 = 12;

/// How a slice of search ended.
#[derive(Debug)]
pub enum SearchStep {
    /// Deadline reached with frames still on the stack.
    Yielded,
    /// The stack drained: either a solution or an exhausted budget.
    Finished(SolveReport),
}

/// Metrics characterizing one search over one candidate deal. Not finding a
/// solution within the budgets is a normal outcome, not an error.
#[derive(Debug, Clone, Default)]
pub struct SolveReport {
    pub solved: bool,
    pub moves_count: u32,
    pub stock_passes: u32,
    pub foundation_returns: u32,
    pub sequence_breaks: u32,
    pub states_visited: u32,
    pub solution: Vec<Move>,
}

/// One node of the explicit search stack. Owns a deep-cloned state (branches
/// never alias), the counters accumulated along its path, and a lazily-built,
/// cursor-consumed move list.
#[derive(Debug, Clone)]
struct Frame {
    deal: Deal,
    incoming: Option<Move>,
    depth: u32,
    recycles: u32,
    returns: u32,
    breaks: u32,
    key: u64,
    moves: MoveList,
    cursor: usize,
    expanded: bool,
}

#[derive(Debug)]
pub struct Search {
    stack: Vec<Frame>,
    path_keys: FxHashSet<u64>,
    states_visited: u32,
    report: Option<SolveReport>,
}

impl Search {
    pub fn new(deal: &Deal) -> Self {
        let root = Frame {
            key: transposition_key(deal),
            deal: deal.clone(),
            incoming: None,
            depth: 0,
            recycles: 0,
            returns: 0,
            breaks: 0,
            moves: MoveList::new(),
            cursor: 0,
            expanded: false,
        };
        Self {
            stack: vec![root],
            path_keys: FxHashSet::default(),
            states_visited: 0,
            report: None,
        }
    }

    /// Runs the search to completion.
    pub fn run(&mut self) -> SolveReport {
        loop {
            if let SearchStep::Finished(report) = self.run_until(None) {
                return report;
            }
        }
    }

    /// Advances the search until the stack drains or the deadline passes,
    /// whichever comes first. Resumable: a yielded search picks up exactly
    /// where it left off.
    pub fn run_until(&mut self, deadline: Option<Instant>) -> SearchStep {
        let mut ticks = 0u32;
        loop {
            if let Some(deadline) = deadline {
                ticks += 1;
                if ticks & 0x3f == 0 && Instant::now() >= deadline {
                    return SearchStep::Yielded;
                }
            }

            let Some(frame) = self.stack.last_mut() else {
                return SearchStep::Finished(self.take_report());
            };

            if !frame.expanded {
                if frame.depth > MAX_DEPTH || self.states_visited >= MAX_STATES {
                    self.stack.pop();
                    continue;
                }
                self.states_visited += 1;

                if frame.deal.is_won() {
                    let (depth, recycles, returns, breaks) =
                        (frame.depth, frame.recycles, frame.returns, frame.breaks);
                    self.report = Some(SolveReport {
                        solved: true,
                        moves_count: depth,
                        stock_passes: recycles,
                        foundation_returns: returns,
                        sequence_breaks: breaks,
                        states_visited: self.states_visited,
                        solution: self.stack.iter().filter_map(|f| f.incoming).collect(),
                    });
                    self.stack.clear();
                    self.path_keys.clear();
                    continue;
                }

                // Cycle on the current path: prune without expanding.
                if !self.path_keys.insert(frame.key) {
                    self.stack.pop();
                    continue;
                }
                frame.moves = generate_moves(&frame.deal);
                frame.cursor = 0;
                frame.expanded = true;
            } else if frame.cursor < frame.moves.len() {
                let mov = frame.moves[frame.cursor];
                frame.cursor += 1;
                if mov.is_recycle() && frame.recycles >= MAX_RECYCLES {
                    continue;
                }
                let mut next = frame.deal.clone();
                mov.apply(&mut next);
                let child = Frame {
                    key: transposition_key(&next),
                    deal: next,
                    incoming: Some(mov),
                    depth: frame.depth + 1,
                    recycles: frame.recycles + u32::from(mov.is_recycle()),
                    returns: frame.returns + u32::from(mov.is_foundation_return()),
                    breaks: frame.breaks + u32::from(mov.is_sequence_break()),
                    moves: MoveList::new(),
                    cursor: 0,
                    expanded: false,
                };
                self.stack.push(child);
            } else {
                // Backtrack: this state leaves the current path.
                self.path_keys.remove(&frame.key);
                self.stack.pop();
            }
        }
    }

    fn take_report(&mut self) -> SolveReport {
        match self.report.take() {
            Some(report) => report,
            None => SolveReport {
                states_visited: self.states_visited,
                ..Default::default()
            },
        }
    }
}

/// Compact pruning hash of a state: each column's top card and face-up
/// boundary, packed foundation heights, and stock/waste cardinalities.
/// Scoped to one search; two distinct states may rarely collide, which is
/// accepted as a pruning heuristic rather than a correctness guarantee.
pub fn transposition_key(deal: &Deal) -> u64 {
    let mut state = [0u8; 2 * TOTAL_TABLEAUS + 4];
    for (i, tableau) in deal.tableaus.iter().enumerate() {
        state[2 * i] = tableau.last().map(|c| c.id()).unwrap_or(u8::MAX);
        state[2 * i + 1] = deal.face_up_start(i).unwrap_or(tableau.len()) as u8;
    }
    let base = 2 * TOTAL_TABLEAUS;
    state[base] = ((deal.foundations[0].len() << 4) | deal.foundations[1].len()) as u8;
    state[base + 1] = ((deal.foundations[2].len() << 4) | deal.foundations[3].len()) as u8;
    state[base + 2] = deal.stock.len() as u8;
    state[base + 3] = deal.waste.len() as u8;

    let mut hasher = AHasher::default();
    hasher.write(&state);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DealBuilder, Difficulty};

    const NEAR_WON: &str = r#"Foundation1: J♣
Foundation2: K♦
Foundation3: K♠
Foundation4: J♥
Tableau1: |Q♣
Tableau2: |K♣
Tableau3: |Q♥
Tableau4: |K♥
DrawCount: 1"#;

    #[test]
    fn test_solves_near_complete_deal() {
        let deal = Deal::parse(NEAR_WON).unwrap();
        assert!(deal.is_valid());

        let report = Search::new(&deal).run();
        assert!(report.solved);
        assert_eq!(report.moves_count, 4);
        assert_eq!(report.stock_passes, 0);
        assert_eq!(report.solution.len(), 4);
    }

    #[test]
    fn test_solution_replay_reaches_win() {
        let deal = Deal::parse(NEAR_WON).unwrap();
        let report = Search::new(&deal).run();
        assert!(report.solved);

        let mut replay = deal.clone();
        for mov in &report.solution {
            mov.apply(&mut replay);
        }
        assert!(replay.is_won());
        assert!(replay.is_valid());
    }

    #[test]
    fn test_solves_through_stock() {
        const DEAL_STR: &str = r#"Stock: K♣Q♣
Foundation1: J♣
Foundation2: K♦
Foundation3: K♠
Foundation4: K♥
DrawCount: 1"#;
        let deal = Deal::parse(DEAL_STR).unwrap();
        assert!(deal.is_valid());

        let report = Search::new(&deal).run();
        assert!(report.solved);
        // Draw, play, draw, play.
        assert_eq!(report.moves_count, 4);
        assert_eq!(report.stock_passes, 0);
    }

    #[test]
    fn test_search_stays_within_budgets() {
        let deal = DealBuilder::with_seed(42).build(Difficulty::Hard, 3);
        let report = Search::new(&deal).run();
        assert!(report.states_visited <= MAX_STATES);
        if report.solved {
            assert!(report.moves_count <= MAX_DEPTH);
            let mut replay = deal.clone();
            for mov in &report.solution {
                mov.apply(&mut replay);
            }
            assert!(replay.is_won());
        }
    }

    #[test]
    fn test_cooperative_slices_match_blocking_run() {
        let deal = DealBuilder::with_seed(5).build(Difficulty::Easy, 1);

        let blocking = Search::new(&deal).run();

        let mut sliced = Search::new(&deal);
        let report = loop {
            let deadline = Instant::now() + std::time::Duration::from_micros(300);
            match sliced.run_until(Some(deadline)) {
                SearchStep::Yielded => continue,
                SearchStep::Finished(report) => break report,
            }
        };
        assert_eq!(blocking.solved, report.solved);
        assert_eq!(blocking.moves_count, report.moves_count);
        assert_eq!(blocking.states_visited, report.states_visited);
    }

    #[test]
    fn test_transposition_key_tracks_state() {
        let deal = DealBuilder::with_seed(3).build(Difficulty::Medium, 1);
        assert_eq!(transposition_key(&deal), transposition_key(&deal.clone()));

        let mut drawn = deal.clone();
        Move::StockDraw.apply(&mut drawn);
        assert_ne!(transposition_key(&deal), transposition_key(&drawn));
    }
}
