pub mod controller;
pub mod events;
pub mod state;

use anyhow::{Context, Result};
use log::warn;

pub use controller::*;
pub use events::*;
pub use state::*;

/// Tests of one batch, replayed through a [`BatchListener`]
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub name: String,
    pub events: Vec<TestEvent>,
}

/// Result of driving a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Whether the run was closed on the service
    pub finished: bool,
}

/// Drive a listener through start, every test and end
///
/// With `jobs > 1` the per-test hooks are spread across scoped worker
/// threads. A start failure is fatal; a finish failure is logged and
/// reported through [`BatchOutcome::finished`].
pub fn run_batch<L: BatchListener>(
    listener: &mut L,
    batch: &Batch,
    jobs: usize,
) -> Result<BatchOutcome> {
    listener
        .on_batch_start(&batch.name)
        .context("Cannot start test run")?;

    if jobs > 1 && batch.events.len() > 1 {
        let chunk_size = (batch.events.len() as f64 / jobs as f64).ceil() as usize;
        let shared: &L = &*listener;

        std::thread::scope(|scope| {
            for chunk in batch.events.chunks(chunk_size) {
                scope.spawn(move || {
                    for event in chunk {
                        replay_event(shared, event);
                    }
                });
            }
        });
    } else {
        for event in &batch.events {
            replay_event(listener, event);
        }
    }

    let finished = match listener.on_batch_end() {
        Ok(()) => true,
        Err(e) => {
            warn!("Test run for '{}' was not finished: {}", batch.name, e);
            false
        }
    };

    Ok(BatchOutcome { finished })
}

fn replay_event<L: BatchListener>(listener: &L, event: &TestEvent) {
    listener.on_test_started(&event.name, event.test_id.as_deref(), event.title.as_deref());
    listener.on_test_event(event);
}
