//! Scripted in-memory transport for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::transport::{Transport, TransportError};

/// How a scripted connection ends once its frames are drained.
#[derive(Debug, Clone)]
pub enum ReplayOutcome {
    /// The stream ends cleanly (`next_message` yields `Ok(None)`).
    EndOfStream,
    /// The stream fails with a transport error.
    Fail(String),
}

/// One scripted connection: frames served in order, then the outcome.
#[derive(Debug, Clone)]
pub struct ReplayConnection {
    frames: VecDeque<String>,
    outcome: ReplayOutcome,
}

impl ReplayConnection {
    pub fn new(frames: Vec<String>, outcome: ReplayOutcome) -> Self {
        Self {
            frames: frames.into(),
            outcome,
        }
    }
}

/// Shared view into a [`ReplayTransport`]'s activity, usable after the
/// transport has been moved into a coordinator.
#[derive(Debug, Clone, Default)]
pub struct ReplayProbe {
    connects: Arc<AtomicUsize>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl ReplayProbe {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }
}

/// `Transport` implementation that serves pre-scripted connections.
///
/// Each `connect` consumes the next scripted connection; once the script
/// is exhausted, further connects fail (so a reconnect-forever caller
/// keeps cycling until told to shut down).
#[derive(Debug)]
pub struct ReplayTransport {
    connections: VecDeque<ReplayConnection>,
    current: Option<ReplayConnection>,
    probe: ReplayProbe,
}

impl ReplayTransport {
    pub fn new(connections: Vec<ReplayConnection>) -> Self {
        Self {
            connections: connections.into(),
            current: None,
            probe: ReplayProbe::default(),
        }
    }

    /// Convenience for single-connection scripts.
    pub fn single(frames: Vec<String>, outcome: ReplayOutcome) -> Self {
        Self::new(vec![ReplayConnection::new(frames, outcome)])
    }

    pub fn probe(&self) -> ReplayProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        match self.connections.pop_front() {
            Some(connection) => {
                self.current = Some(connection);
                Ok(())
            }
            None => Err(TransportError::Connection(
                "replay script exhausted".to_string(),
            )),
        }
    }

    async fn subscribe(&mut self, symbol: &str) -> Result<(), TransportError> {
        if self.current.is_none() {
            return Err(TransportError::Connection(
                "subscribe before connect".to_string(),
            ));
        }
        self.probe
            .subscriptions
            .lock()
            .unwrap()
            .push(symbol.to_string());
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        let current = self
            .current
            .as_mut()
            .ok_or_else(|| TransportError::Connection("stream before connect".to_string()))?;
        if let Some(frame) = current.frames.pop_front() {
            return Ok(Some(frame));
        }
        match current.outcome.clone() {
            ReplayOutcome::EndOfStream => Ok(None),
            ReplayOutcome::Fail(reason) => Err(TransportError::Stream(reason)),
        }
    }
}
