//! fractallab core — windowed bias classification and fulfillment tracking.
//!
//! This crate contains the signal engine:
//! - Domain types (price bars, signals, targets, layer and instrument reports)
//! - Injected configuration (cadence parameters, grade scale, probability tables)
//! - Reference-window extraction per parent period
//! - Bias classification with an explicit midpoint tie-break policy
//! - Stateless fulfillment tracking of extension and directional-close targets
//! - Layered probability annotation (seasonal -> general -> default)
//! - Timing gate driven by the latest bar's timestamp
//! - Composition of the monthly, weekly and daily layers into one report

pub mod classify;
pub mod composer;
pub mod config;
pub mod domain;
pub mod fulfillment;
pub mod probability;
pub mod sigma;
pub mod timing;
pub mod window;

pub use composer::{compose, EngineError, LayerComposer};
pub use config::{ConfigError, SignalConfig};
