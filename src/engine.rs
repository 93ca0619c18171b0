//! Polling loop that keeps [`ChainState`] in step with the chain:
//! 1) ask the source for its tip,
//! 2) fetch every block between the cursor and the tip, advancing the cursor,
//! 3) match each block against the subscriber set, store and notify hits.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::{
    chain_source::ChainSource,
    matcher::{match_block, Match},
    notifier::{Notifier, MATCH_MESSAGE},
    store::ChainState,
    types::{Block, BlockHeight},
};

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// Draining a catch-up range.
    Fetching,
    /// Terminal; the loop has exited.
    Stopped,
}

/// What to do with the rest of a catch-up range when one block fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchFailurePolicy {
    /// Log, leave that height behind and carry on with the next one.
    #[default]
    Skip,
    /// Stop the range; the next tick resumes at the failed height.
    Halt,
}

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Fixed delay between ticks.
    pub poll_interval: Duration,
    /// Behavior on a failed block fetch.
    pub on_fetch_error: FetchFailurePolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            on_fetch_error: FetchFailurePolicy::Skip,
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tip could not be fetched.
    SourceUnavailable,
    /// The cursor could not be read.
    StateUnavailable,
    /// Nothing new since the last tick.
    UpToDate {
        /// Reported tip.
        tip: BlockHeight,
        /// Cursor at the time of the tick.
        cursor: BlockHeight,
    },
    /// A catch-up range was walked.
    Advanced {
        /// First height of the range.
        from: BlockHeight,
        /// Last height of the range (the tip).
        to: BlockHeight,
        /// Heights whose block was loaded and the cursor moved to.
        processed: Vec<BlockHeight>,
        /// Heights that failed to load or to advance the cursor.
        failed: Vec<BlockHeight>,
        /// Match events (stored records and notifications) produced.
        matches: usize,
    },
}

struct Control {
    running: AtomicBool,
    state: watch::Sender<LoopState>,
}

impl Control {
    fn set_state(&self, next: LoopState) {
        // Stopped is terminal
        self.state.send_if_modified(|cur| {
            if *cur == LoopState::Stopped || *cur == next {
                false
            } else {
                *cur = next;
                true
            }
        });
    }
}

/// Cheap, cloneable control over a running [`IngestLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    control: Arc<Control>,
}

impl LoopHandle {
    /// Ask the loop to stop. It exits the next time it wakes; an in-flight
    /// tick runs to completion. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.control.running.swap(false, Ordering::AcqRel) {
            info!("ingest loop shutdown requested");
        }
    }

    /// Whether shutdown has not been requested yet.
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        *self.control.state.borrow()
    }

    /// Resolve once the loop has exited.
    pub async fn stopped(&self) {
        let mut rx = self.control.state.subscribe();
        // the sender lives in `control`, which we hold
        let _ = rx.wait_for(|s| *s == LoopState::Stopped).await;
    }
}

/// The ingestion loop. `S` = state, `F` = chain source, `N` = notifier.
///
/// Construction only wires dependencies; nothing runs until the owner awaits
/// (or spawns) [`IngestLoop::run`].
pub struct IngestLoop<S: ?Sized, F, N> {
    state: Arc<S>,
    source: F,
    notifier: N,
    config: LoopConfig,
    control: Arc<Control>,
    span: Span,
}

impl<S, F, N> IngestLoop<S, F, N>
where
    S: ChainState + ?Sized + 'static,
    F: ChainSource + 'static,
    N: Notifier + 'static,
{
    /// Wire a loop over shared `state`.
    pub fn new(state: Arc<S>, source: F, notifier: N, config: LoopConfig) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            state,
            source,
            notifier,
            config,
            control: Arc::new(Control {
                running: AtomicBool::new(true),
                state: state_tx,
            }),
            span: tracing::info_span!("ingest", chain = "ethereum"),
        }
    }

    /// Record every event of this loop under `span` instead of the default
    /// `ingest` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Handle for shutdown and state inspection.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            control: self.control.clone(),
        }
    }

    /// Tick every `poll_interval` until shutdown is requested. The first tick
    /// fires immediately; the run flag is checked each time the timer fires.
    pub async fn run(self) {
        self.span.in_scope(|| {
            info!(
                interval_ms = self.config.poll_interval.as_millis() as u64,
                policy = ?self.config.on_fetch_error,
                "ingest loop started"
            )
        });

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.control.running.load(Ordering::Acquire) {
                break;
            }
            self.tick().await;
        }

        self.control.set_state(LoopState::Stopped);
        self.span.in_scope(|| info!("ingest loop stopped"));
    }

    /// Run one tick: catch up from the cursor to the current tip.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_inner().instrument(self.span.clone()).await
    }

    async fn tick_inner(&self) -> TickOutcome {
        let tip = match self.source.tip_height().await {
            Ok(tip) => tip,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to get latest block number");
                return TickOutcome::SourceUnavailable;
            }
        };

        let cursor = match self.state.get_current_block().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to read cursor");
                return TickOutcome::StateUnavailable;
            }
        };

        if cursor >= tip {
            debug!(tip, cursor, "no new blocks");
            return TickOutcome::UpToDate { tip, cursor };
        }

        // first run: start just behind the tip instead of replaying history
        let last_done = if cursor == 0 { tip - 1 } else { cursor };
        let from = last_done + 1;
        info!(from_block = from, to_block = tip, "processing new blocks");

        self.control.set_state(LoopState::Fetching);
        let mut processed = Vec::new();
        let mut failed = Vec::new();
        let mut matches = 0;

        for height in from..=tip {
            let Some(block) = self.load(height).await else {
                failed.push(height);
                match self.config.on_fetch_error {
                    FetchFailurePolicy::Skip => continue,
                    FetchFailurePolicy::Halt => {
                        warn!(block_number = height, "halting catch-up range");
                        break;
                    }
                }
            };

            processed.push(height);
            matches += self.process_block(&block).await;
            debug!(block_number = height, "processed block");
        }

        self.control.set_state(LoopState::Idle);
        TickOutcome::Advanced {
            from,
            to: tip,
            processed,
            failed,
            matches,
        }
    }

    /// Fetch `height` and move the cursor to it. The cursor moves before
    /// matching so a block is never matched twice.
    async fn load(&self, height: BlockHeight) -> Option<Block> {
        let block = match self.source.block_by_number(height).await {
            Ok(block) => block,
            Err(e) => {
                error!(block_number = height, error = %format!("{e:#}"), "failed to get block");
                return None;
            }
        };
        if let Err(e) = self.state.set_current_block(height).await {
            error!(block_number = height, error = %format!("{e:#}"), "failed to advance cursor");
            return None;
        }
        Some(block)
    }

    async fn process_block(&self, block: &Block) -> usize {
        let subscribers = match self.state.list_subscribers().await {
            Ok(s) => s,
            Err(e) => {
                error!(block_number = block.number, error = %format!("{e:#}"), "failed to list subscribers");
                return 0;
            }
        };

        let found = match match_block(block, &subscribers) {
            Ok(found) => found,
            Err(e) => {
                error!(block_number = block.number, error = %e, "invalid transactions data in block");
                return 0;
            }
        };

        for m in &found {
            debug!(hash = %m.record.hash, address = %m.address, "found matching transaction");
            if let Err(e) = self.append(m).await {
                error!(address = %m.address, error = %format!("{e:#}"), "unable to save transaction");
            }
            if let Err(e) = self.notifier.notify(&m.address, MATCH_MESSAGE, &m.record).await {
                warn!(address = %m.address, error = %format!("{e:#}"), "notification failed");
            }
        }

        if !found.is_empty() {
            info!(block_number = block.number, matches = found.len(), "processed transactions for block");
        }
        found.len()
    }

    async fn append(&self, m: &Match) -> anyhow::Result<()> {
        let mut log = self.state.get_transactions(&m.address).await?;
        log.push(m.record.clone());
        self.state.save_transactions(&m.address, log).await
    }
}
