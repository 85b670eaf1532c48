//! Database seeding functionality.
//!
//! Populates the eight platform credibility rows (C3) that every other
//! engine reads from, so a fresh deployment doesn't pay the lazy-seed cost
//! on its first real request.

pub mod platform_credibility;

pub use platform_credibility::seed_platform_credibility;
