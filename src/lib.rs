//! Sniper - multi-timeframe signal scoring and trade-quality gating

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use config::Config;
use services::{AlertDispatcher, SignalEngine};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Single engine shared with the runner. Evaluations are serialized
    /// through this lock.
    pub engine: Arc<Mutex<SignalEngine>>,
    /// Delivery channel for relayed alerts, shared with the runner.
    pub dispatcher: Arc<dyn AlertDispatcher>,
}

impl AppState {
    pub fn new(config: Arc<Config>, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        let engine = SignalEngine::with_gate(
            config.primary_timeframe,
            config.gate.to_gate_config(),
        );
        Self {
            config,
            engine: Arc::new(Mutex::new(engine)),
            dispatcher,
        }
    }
}

// Re-export commonly used types
pub use types::*;
