//! Application state shared across all route handlers.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use helpline_dialogue::DialogueEngine;

/// Shared application state.
///
/// The engine is behind a single mutex: each turn reads, mutates and rewrites
/// the whole conversation store, so turns for any users must not interleave.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<DialogueEngine>>,
    /// Port the server is bound to, used for the CORS allow-list.
    pub port: u16,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: DialogueEngine, port: u16) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            port,
            start_time: Instant::now(),
        }
    }
}
