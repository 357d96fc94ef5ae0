//! Request Coalescing Module
//!
//! Protects the source of truth from cache stampedes: when many callers miss
//! the same key at once, only one of them performs the load and the rest share
//! its outcome. Different keys load fully in parallel.

pub mod flight;

pub use flight::SingleFlight;

#[cfg(test)]
mod tests;
