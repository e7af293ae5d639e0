//! Simulated cell execution.
//!
//! Triggering a run spawns a `smol` timer task per cell. Each schedule gets a
//! fresh generation; scheduling the same cell again drops the previous task
//! (which cancels it) and supersedes its generation, so a completion that
//! raced the cancel is recognized as stale and discarded. Completions travel
//! back to the owner over an mpsc channel and are applied on its thread.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use gridmock_engine::{CellRef, Column};

/// A finished simulated run, ready to be written into its cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    pub cell: CellRef,
    pub generation: u64,
    pub output: String,
}

struct PendingRun {
    generation: u64,
    /// Dropping the task cancels the timer
    _task: smol::Task<()>,
}

pub struct RunScheduler {
    delay: Duration,
    next_generation: u64,
    pending: HashMap<CellRef, PendingRun>,
    tx: mpsc::Sender<RunCompletion>,
    rx: mpsc::Receiver<RunCompletion>,
}

impl RunScheduler {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            delay,
            next_generation: 1,
            pending: HashMap::new(),
            tx,
            rx,
        }
    }

    /// Start a run for `cell`, replacing any run already in flight there.
    /// Returns the generation of the new run.
    pub fn schedule(&mut self, cell: CellRef, output: String) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;

        if self.pending.remove(&cell).is_some() {
            log::debug!("run for {} superseded by generation {}", cell, generation);
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        let task = smol::spawn(async move {
            smol::Timer::after(delay).await;
            // Receiver gone means the owner shut down; nothing to report to
            let _ = tx.send(RunCompletion { cell, generation, output });
        });

        self.pending.insert(cell, PendingRun { generation, _task: task });
        generation
    }

    /// Cancel the run in flight for `cell`. Returns whether one existed.
    pub fn cancel(&mut self, cell: CellRef) -> bool {
        self.pending.remove(&cell).is_some()
    }

    /// Cancel every run in `col`. Returns the cancelled cells.
    pub fn cancel_column(&mut self, col: Column) -> Vec<CellRef> {
        let cells: Vec<CellRef> = self.pending.keys().filter(|c| c.col == col).copied().collect();
        for cell in &cells {
            self.pending.remove(cell);
        }
        cells
    }

    pub fn is_pending(&self, cell: CellRef) -> bool {
        self.pending.contains_key(&cell)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_cells(&self) -> Vec<CellRef> {
        let mut cells: Vec<CellRef> = self.pending.keys().copied().collect();
        cells.sort();
        cells
    }

    /// Completions that arrived so far, stale generations dropped.
    pub fn drain_ready(&mut self) -> Vec<RunCompletion> {
        let mut ready = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            self.accept(completion, &mut ready);
        }
        ready
    }

    /// Block until at least one current completion arrives or `timeout`
    /// passes, then drain whatever else is ready.
    pub fn wait_ready(&mut self, timeout: Duration) -> Vec<RunCompletion> {
        let deadline = Instant::now() + timeout;
        let mut ready = Vec::new();

        while ready.is_empty() && !self.pending.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(completion) => self.accept(completion, &mut ready),
                Err(_) => break,
            }
        }

        ready.extend(self.drain_ready());
        ready
    }

    fn accept(&mut self, completion: RunCompletion, ready: &mut Vec<RunCompletion>) {
        match self.pending.get(&completion.cell) {
            Some(run) if run.generation == completion.generation => {
                self.pending.remove(&completion.cell);
                ready.push(completion);
            }
            _ => {
                log::debug!(
                    "dropping stale completion for {} (generation {})",
                    completion.cell,
                    completion.generation
                );
            }
        }
    }
}
