use crate::builder::Difficulty;
use crate::solver::SolveReport;

use std::ops::RangeInclusive;

/// Difficulty metrics for one candidate deal, combining the exhaustive
/// search report with the greedy prefilter outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct DealMetrics {
    pub solved: bool,
    pub moves_count: u32,
    pub stock_passes: u32,
    pub foundation_returns: u32,
    pub sequence_breaks: u32,
    pub states_visited: u32,
    /// Excess search effort beyond the found solution length — the informal
    /// "trap" proxy: how much the tree resisted before yielding a witness.
    pub trap_estimate: u32,
    pub greedy_solvable: bool,
}

impl DealMetrics {
    pub fn from_report(report: &SolveReport, greedy_solvable: bool) -> Self {
        Self {
            solved: report.solved,
            moves_count: report.moves_count,
            stock_passes: report.stock_passes,
            foundation_returns: report.foundation_returns,
            sequence_breaks: report.sequence_breaks,
            states_visited: report.states_visited,
            trap_estimate: report.states_visited.saturating_sub(report.moves_count),
            greedy_solvable,
        }
    }
}

impl Difficulty {
    /// Easy deals must autoplay under the greedy policy; Medium and Hard
    /// deals must defeat it.
    pub fn requires_greedy(self) -> bool {
        matches!(self, Difficulty::Easy)
    }
}

struct Window {
    traps: RangeInclusive<u32>,
    moves: RangeInclusive<u32>,
}

fn window(difficulty: Difficulty) -> Window {
    match difficulty {
        Difficulty::Easy => Window {
            traps: 0..=60,
            moves: 52..=110,
        },
        Difficulty::Medium => Window {
            traps: 40..=400,
            moves: 76..=150,
        },
        Difficulty::Hard => Window {
            traps: 250..=20_000,
            moves: 90..=220,
        },
    }
}

pub fn greedy_matches(difficulty: Difficulty, metrics: &DealMetrics) -> bool {
    metrics.greedy_solvable == difficulty.requires_greedy()
}

/// A solved candidate inside its tier's window with the right greedy outcome
/// is a perfect match and stops generation immediately.
pub fn is_perfect_match(difficulty: Difficulty, metrics: &DealMetrics) -> bool {
    let window = window(difficulty);
    metrics.solved
        && window.traps.contains(&metrics.trap_estimate)
        && window.moves.contains(&metrics.moves_count)
        && greedy_matches(difficulty, metrics)
}

/// Ranks solved candidates for fallback retention. Easy rewards short,
/// trap-free solutions; Hard rewards resistance; Medium rewards closeness to
/// a mid-band target. Matching the tier's greedy requirement earns a bonus.
pub fn score(difficulty: Difficulty, metrics: &DealMetrics) -> i64 {
    let trap = metrics.trap_estimate as i64;
    let moves = metrics.moves_count as i64;
    let mut score = match difficulty {
        Difficulty::Easy => 1_000 - trap * 3 - moves,
        Difficulty::Medium => 1_000 - (trap - 200).abs() - (moves - 110).abs() * 2,
        Difficulty::Hard => trap * 2 + moves,
    };
    if greedy_matches(difficulty, metrics) {
        score += 500;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solved_metrics(moves_count: u32, states_visited: u32, greedy_solvable: bool) -> DealMetrics {
        DealMetrics {
            solved: true,
            moves_count,
            states_visited,
            trap_estimate: states_visited - moves_count,
            greedy_solvable,
            ..Default::default()
        }
    }

    #[test]
    fn test_perfect_match_windows() {
        let easy = solved_metrics(80, 100, true);
        assert!(is_perfect_match(Difficulty::Easy, &easy));
        assert!(!is_perfect_match(Difficulty::Hard, &easy));

        let hard = solved_metrics(120, 1_500, false);
        assert!(is_perfect_match(Difficulty::Hard, &hard));
        assert!(!is_perfect_match(Difficulty::Easy, &hard));
    }

    #[test]
    fn test_greedy_requirement_gates_acceptance() {
        let mut metrics = solved_metrics(80, 100, false);
        assert!(!is_perfect_match(Difficulty::Easy, &metrics));
        metrics.greedy_solvable = true;
        assert!(is_perfect_match(Difficulty::Easy, &metrics));
    }

    #[test]
    fn test_unsolved_never_matches() {
        let metrics = DealMetrics {
            greedy_solvable: true,
            ..Default::default()
        };
        assert!(!is_perfect_match(Difficulty::Easy, &metrics));
    }

    #[test]
    fn test_scores_rank_candidates_per_tier() {
        let tame = solved_metrics(70, 90, true);
        let thrashy = solved_metrics(130, 5_000, false);

        assert!(score(Difficulty::Easy, &tame) > score(Difficulty::Easy, &thrashy));
        assert!(score(Difficulty::Hard, &thrashy) > score(Difficulty::Hard, &tame));
    }

    #[test]
    fn test_greedy_bonus_breaks_ties() {
        let with = solved_metrics(100, 400, false);
        let without = solved_metrics(100, 400, true);
        assert!(score(Difficulty::Hard, &with) > score(Difficulty::Hard, &without));
    }
}
