//! Time-sliced generation driver: builds candidates, filters them with the
//! greedy check, proves them with the exhaustive search, and scores the
//! survivors — in bursts bounded by a per-tick frame budget, under a global
//! wall-clock timeout, with a guarantee that *some* deal is always returned.

use crate::builder::{DealBuilder, Difficulty};
use crate::deal::Deal;
use crate::scoring::{self, DealMetrics};
use crate::solver::{Search, SearchStep, is_greedy_solvable};

use log::{debug, warn};
use std::time::{Duration, Instant};

pub const FRAME_BUDGET: Duration = Duration::from_millis(5);
pub const GLOBAL_TIMEOUT: Duration = Duration::from_millis(2_500);

/// How the returned deal was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Solved, inside its difficulty window, with the required greedy outcome.
    Perfect,
    /// Solved but outside the window; best-scored candidate seen.
    Fallback,
    /// Timed out with no solved candidate; a fresh easy-zone deal without a
    /// solvability proof. Flagged for observability, not an error.
    Unverified,
}

#[derive(Debug, Clone)]
pub struct GeneratedDeal {
    pub deal: Deal,
    pub metrics: DealMetrics,
    pub acceptance: Acceptance,
}

struct Candidate {
    deal: Deal,
    greedy_solvable: bool,
    search: Search,
}

struct Scored {
    deal: Deal,
    metrics: DealMetrics,
    score: i64,
}

pub struct Generator {
    difficulty: Difficulty,
    draw_count: usize,
    builder: DealBuilder,
    timeout: Duration,
    budget: Duration,
    spent: Duration,
    candidates_tried: u32,
    pending: Option<Candidate>,
    best: Option<Scored>,
}

impl Generator {
    pub fn new(difficulty: Difficulty, draw_count: usize) -> Self {
        Self::with_builder(difficulty, draw_count, DealBuilder::new())
    }

    pub fn with_builder(difficulty: Difficulty, draw_count: usize, builder: DealBuilder) -> Self {
        Self {
            difficulty,
            draw_count,
            builder,
            timeout: GLOBAL_TIMEOUT,
            budget: FRAME_BUDGET,
            spent: Duration::ZERO,
            candidates_tried: 0,
            pending: None,
            best: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs one cooperative tick. Returns `Some` once a deal is ready; the
    /// host should keep calling until then, yielding between calls. The
    /// global timeout is only enforced here, between ticks — a search slice
    /// in flight always runs to its own yield point.
    pub fn step(&mut self) -> Option<GeneratedDeal> {
        if self.spent >= self.timeout {
            return Some(self.finish());
        }

        let tick_start = Instant::now();
        let deadline = tick_start + self.budget;
        let mut accepted = None;

        while accepted.is_none() && Instant::now() < deadline {
            if let Some(mut candidate) = self.pending.take() {
                match candidate.search.run_until(Some(deadline)) {
                    SearchStep::Yielded => {
                        self.pending = Some(candidate);
                        break;
                    }
                    SearchStep::Finished(report) => {
                        let metrics = DealMetrics::from_report(&report, candidate.greedy_solvable);
                        accepted = self.settle(candidate.deal, metrics);
                    }
                }
            } else {
                let deal = self.builder.build(self.difficulty, self.draw_count);
                self.candidates_tried += 1;
                let greedy_solvable = is_greedy_solvable(&deal);
                let matches = greedy_solvable == self.difficulty.requires_greedy();
                // Cheap prefilter: once a fallback exists, candidates with
                // the wrong greedy outcome are not worth the full proof.
                if !matches && self.best.is_some() {
                    continue;
                }
                let search = Search::new(&deal);
                self.pending = Some(Candidate {
                    deal,
                    greedy_solvable,
                    search,
                });
            }
        }

        self.spent += tick_start.elapsed();
        accepted
    }

    /// Blocking convenience wrapper over `step`.
    pub fn run(mut self) -> GeneratedDeal {
        loop {
            if let Some(generated) = self.step() {
                return generated;
            }
        }
    }

    fn settle(&mut self, deal: Deal, metrics: DealMetrics) -> Option<GeneratedDeal> {
        if !metrics.solved {
            return None;
        }
        if scoring::is_perfect_match(self.difficulty, &metrics) {
            debug!(
                "accepted {} candidate after {} tries: moves={} traps={}",
                self.difficulty, self.candidates_tried, metrics.moves_count, metrics.trap_estimate
            );
            return Some(GeneratedDeal {
                deal,
                metrics,
                acceptance: Acceptance::Perfect,
            });
        }
        let score = scoring::score(self.difficulty, &metrics);
        if self.best.as_ref().is_none_or(|b| score > b.score) {
            self.best = Some(Scored {
                deal,
                metrics,
                score,
            });
        }
        None
    }

    fn finish(&mut self) -> GeneratedDeal {
        if let Some(best) = self.best.take() {
            debug!(
                "{} generation timed out after {} tries; returning best fallback (score {})",
                self.difficulty, self.candidates_tried, best.score
            );
            return GeneratedDeal {
                deal: best.deal,
                metrics: best.metrics,
                acceptance: Acceptance::Fallback,
            };
        }
        warn!(
            "{} generation timed out with no solved candidate after {} tries; \
             returning an unverified easy-zone deal",
            self.difficulty, self.candidates_tried
        );
        let deal = self.builder.build(Difficulty::Easy, self.draw_count);
        let metrics = DealMetrics {
            greedy_solvable: is_greedy_solvable(&deal),
            ..Default::default()
        };
        GeneratedDeal {
            deal,
            metrics,
            acceptance: Acceptance::Unverified,
        }
    }
}

/// Builds, proves, and classifies a deal for the requested tier, blocking
/// until one is ready (at most the global timeout plus one tick).
pub fn generate(difficulty: Difficulty, draw_count: usize) -> GeneratedDeal {
    Generator::new(difficulty, draw_count).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easy_generation_returns_usable_deal() {
        let generator =
            Generator::with_builder(Difficulty::Easy, 1, DealBuilder::with_seed(1234));
        let generated = generator.run();

        assert!(generated.deal.is_valid());
        match generated.acceptance {
            Acceptance::Perfect => {
                assert!(generated.metrics.solved);
                assert!(generated.metrics.greedy_solvable);
            }
            Acceptance::Fallback => assert!(generated.metrics.solved),
            Acceptance::Unverified => assert!(!generated.metrics.solved),
        }
    }

    #[test]
    fn test_hard_generation_always_terminates() {
        let generator =
            Generator::with_builder(Difficulty::Hard, 3, DealBuilder::with_seed(77))
                .with_timeout(Duration::from_millis(500));
        let generated = generator.run();

        assert!(generated.deal.is_valid());
        if generated.acceptance == Acceptance::Perfect {
            assert!(generated.metrics.solved);
            assert!(!generated.metrics.greedy_solvable);
        }
    }

    #[test]
    fn test_cooperative_stepping_terminates_within_timeout() {
        let timeout = Duration::from_millis(50);
        let mut generator =
            Generator::with_builder(Difficulty::Hard, 1, DealBuilder::with_seed(5))
                .with_timeout(timeout);
        let started = Instant::now();
        let generated = loop {
            if let Some(generated) = generator.step() {
                break generated;
            }
        };
        assert!(generated.deal.is_valid());
        // Timeout plus a generous allowance for the final tick.
        assert!(started.elapsed() < timeout + Duration::from_millis(250));
    }
}
