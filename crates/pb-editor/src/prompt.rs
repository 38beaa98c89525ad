//! Prompt resolution and the generation queue.
//!
//! A `PromptResolver` turns free text into edit intents. `PromptIntake`
//! runs each resolver call as a tokio task, keeps at most one generation in
//! flight per target, and hands finished results back to the editor loop
//! over a channel. A newer prompt for the same target supersedes the older
//! one: the old task is aborted and whatever it still delivers is dropped.

use async_trait::async_trait;
use pb_core::{EditIntent, NodeId, ResolverError, parse_script};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

/// Turns a prompt into intents. Implementations must not touch the page.
#[async_trait]
pub trait PromptResolver: Send + Sync {
    async fn resolve(
        &self,
        text: &str,
        target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError>;
}

/// Deterministic resolver that reads the prompt as an intent script.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptResolver;

#[async_trait]
impl PromptResolver for ScriptResolver {
    async fn resolve(
        &self,
        text: &str,
        target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        parse_script(text, target).map_err(|e| ResolverError::Malformed(e.to_string()))
    }
}

/// Resolver that expects a JSON array of intents, the shape a model
/// backend is asked to answer with.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResolver;

#[async_trait]
impl PromptResolver for JsonResolver {
    async fn resolve(
        &self,
        text: &str,
        _target: Option<NodeId>,
    ) -> Result<Vec<EditIntent>, ResolverError> {
        EditIntent::list_from_json(text).map_err(|e| ResolverError::Malformed(e.to_string()))
    }
}

// ─── Generation queue ───────────────────────────────────────────────────

/// Identifies one submitted generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub seq: u64,
    /// `None` targets the page.
    pub target: Option<NodeId>,
    pub text: String,
}

/// A finished generation, current at the time it was handed out.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub ticket: GenerationTicket,
    pub result: Result<Vec<EditIntent>, ResolverError>,
}

struct InFlight {
    seq: u64,
    /// Aborts the resolver call; its delivery task then exits quietly.
    abort: AbortHandle,
}

pub struct PromptIntake {
    resolver: Arc<dyn PromptResolver>,
    timeout: Option<Duration>,
    in_flight: HashMap<Option<NodeId>, InFlight>,
    next_seq: u64,
    tx: mpsc::UnboundedSender<GenerationOutcome>,
    rx: mpsc::UnboundedReceiver<GenerationOutcome>,
}

impl PromptIntake {
    pub fn new(resolver: Arc<dyn PromptResolver>, timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            resolver,
            timeout,
            in_flight: HashMap::new(),
            next_seq: 0,
            tx,
            rx,
        }
    }

    /// Start resolving `text` for `target`. Must be called inside a tokio
    /// runtime. Supersedes any generation still running for the same target.
    pub fn submit(&mut self, text: impl Into<String>, target: Option<NodeId>) -> GenerationTicket {
        if let Some(old) = self.in_flight.remove(&target) {
            old.abort.abort();
            log::warn!(
                "GENERATE #{} superseded for {}",
                old.seq,
                target_label(target)
            );
        }

        self.next_seq += 1;
        let ticket = GenerationTicket {
            seq: self.next_seq,
            target,
            text: text.into(),
        };

        let resolver = Arc::clone(&self.resolver);
        let (text, seq) = (ticket.text.clone(), ticket.seq);
        // The resolver runs in its own task so a panic surfaces as a
        // JoinError instead of silently ending the delivery task.
        let call = tokio::spawn(async move { resolver.resolve(&text, target).await });
        let abort = call.abort_handle();

        let timeout = self.timeout;
        let tx = self.tx.clone();
        let task_ticket = ticket.clone();
        tokio::spawn(async move {
            let Some(result) = await_resolution(seq, call, timeout).await else {
                return;
            };
            // The receiver lives as long as the intake; a send error only
            // means the editor is shutting down.
            let _ = tx.send(GenerationOutcome {
                ticket: task_ticket,
                result,
            });
        });

        log::debug!(
            "GENERATE #{} submitted for {}",
            ticket.seq,
            target_label(target)
        );
        self.in_flight.insert(
            target,
            InFlight {
                seq: ticket.seq,
                abort,
            },
        );
        ticket
    }

    pub fn is_pending(&self, target: Option<NodeId>) -> bool {
        self.in_flight.contains_key(&target)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `ticket` is still the live generation for its target.
    pub fn is_current(&self, ticket: &GenerationTicket) -> bool {
        self.in_flight
            .get(&ticket.target)
            .is_some_and(|f| f.seq == ticket.seq)
    }

    /// Abort the generation running for `target`. Returns false when none was.
    pub fn cancel(&mut self, target: Option<NodeId>) -> bool {
        match self.in_flight.remove(&target) {
            Some(flight) => {
                flight.abort.abort();
                log::debug!("GENERATE #{} cancelled", flight.seq);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, flight) in self.in_flight.drain() {
            flight.abort.abort();
        }
    }

    /// Wait for the next current outcome. Stale outcomes are dropped.
    /// Returns `None` as soon as nothing is pending.
    pub async fn next_outcome(&mut self) -> Option<GenerationOutcome> {
        loop {
            if self.in_flight.is_empty() {
                return None;
            }
            let outcome = self.rx.recv().await?;
            if self.accept(&outcome.ticket) {
                return Some(outcome);
            }
        }
    }

    fn accept(&mut self, ticket: &GenerationTicket) -> bool {
        if self.is_current(ticket) {
            self.in_flight.remove(&ticket.target);
            true
        } else {
            log::warn!(
                "GENERATE #{} discarded: stale result for {}",
                ticket.seq,
                target_label(ticket.target)
            );
            false
        }
    }
}

impl Drop for PromptIntake {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Wait for the resolver task, bounded by `timeout`. `None` means the call
/// was aborted and nothing should be delivered.
async fn await_resolution(
    seq: u64,
    mut call: JoinHandle<Result<Vec<EditIntent>, ResolverError>>,
    timeout: Option<Duration>,
) -> Option<Result<Vec<EditIntent>, ResolverError>> {
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut call).await {
            Ok(joined) => joined,
            Err(_) => {
                call.abort();
                return Some(Err(ResolverError::TimedOut(limit.as_millis() as u64)));
            }
        },
        None => call.await,
    };
    match joined {
        Ok(result) => Some(result),
        Err(e) if e.is_panic() => {
            log::error!("GENERATE #{seq} resolver panicked");
            Some(Err(ResolverError::Crashed("resolver panicked".into())))
        }
        Err(_) => None,
    }
}

fn target_label(target: Option<NodeId>) -> String {
    match target {
        Some(id) => id.to_string(),
        None => "page".to_string(),
    }
}
