//! trailscan core: candle domain types, indicators, trailing-stop signal engine, market data.
//!
//! This crate contains the heart of the scanner:
//! - Domain types (candles, positions, signals, per-candle signal records)
//! - Indicators (Heikin-Ashi transform, true range / ATR, recursive EMA)
//! - The trailing-stop recurrence and crossover detector (`engine`)
//! - Market data providers (Wallex REST client, CSV import)
//!
//! The engine is a pure function of a complete candle series. Everything that
//! touches the network lives under `data`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

pub use domain::{Candle, Position, Signal, SignalRecord};
pub use engine::{compute_signals, terminal_signal, EngineError, SignalParams};
