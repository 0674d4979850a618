//! Difficulty-calibrated Klondike Solitaire deal generation.
//!
//! A constructive builder biases card placement toward a requested tier
//! (easy/medium/hard), a greedy autoplay check prefilters candidates, and an
//! exhaustive depth-bounded search proves solvability while collecting
//! difficulty metrics. A time-sliced driver coordinates the loop under a
//! frame budget and a global timeout and always returns a usable deal.

pub mod builder;
pub mod deal;
pub mod driver;
pub mod moves;
pub mod scoring;
pub mod solver;
