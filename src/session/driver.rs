//! Per-session driver task.
//!
//! One tokio task owns all state for one field session: the command
//! channel, the debounce and saved-decay deadlines, and the single
//! in-flight commit. Edits, timer fires, and commit completions
//! interleave through one `select!` loop, so there is no locking and no
//! reentrancy beyond what the loop serializes.

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::{CommitError, Error};
use crate::model::{
    CommitFuture, CommitHandler, ErrorHook, FieldId, FieldSnapshot, SessionOptions, Status,
    SuccessHook, Validator,
};
use crate::session::state::{Effect, Input, SessionState};

/// Commands sent from a [`FieldHandle`](crate::session::FieldHandle).
#[derive(Debug)]
pub(crate) enum Command<V> {
    Set(V),
    Retry,
    Reset,
    Refresh(V),
}

/// A physically outstanding commit.
struct InFlight<V> {
    /// Supersede marker: outcomes from a cycle other than the driver's
    /// current one are discarded.
    cycle: u64,
    value: V,
    started: Instant,
    deadline: Option<Instant>,
    fut: CommitFuture,
}

enum FlightOutcome {
    Done(std::result::Result<(), CommitError>),
    TimedOut,
}

pub(crate) struct Driver<V> {
    id: FieldId,
    state: SessionState<V>,
    config: SyncConfig,
    commit: CommitHandler<V>,
    validate: Option<Validator<V>>,
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
    cmd_rx: mpsc::UnboundedReceiver<Command<V>>,
    snapshot_tx: watch::Sender<FieldSnapshot<V>>,
    debounce_deadline: Option<Instant>,
    decay_deadline: Option<Instant>,
    inflight: Option<InFlight<V>>,
    /// A commit requested while a superseded one is still outstanding.
    /// Launched as soon as the stale flight resolves; single-flight is a
    /// correctness requirement, not an optimization.
    deferred: Option<V>,
    cycle: u64,
}

impl<V: Clone + PartialEq + Send + Sync + 'static> Driver<V> {
    pub(crate) fn new(
        id: FieldId,
        options: SessionOptions<V>,
        cmd_rx: mpsc::UnboundedReceiver<Command<V>>,
        snapshot_tx: watch::Sender<FieldSnapshot<V>>,
    ) -> Self {
        let SessionOptions {
            initial,
            config,
            commit,
            validate,
            on_success,
            on_error,
        } = options;
        Self {
            id,
            state: SessionState::new(initial, config.optimistic),
            config,
            commit,
            validate,
            on_success,
            on_error,
            cmd_rx,
            snapshot_tx,
            debounce_deadline: None,
            decay_deadline: None,
            inflight: None,
            deferred: None,
            cycle: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(field_id = %self.id, "session started");
        loop {
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Set(v)) => self.dispatch(Input::Edit(v)),
                        Some(Command::Retry) => self.dispatch(Input::Retry),
                        Some(Command::Reset) => self.dispatch(Input::Reset),
                        Some(Command::Refresh(v)) => self.dispatch(Input::Refresh(v)),
                        // All handles dropped — tear the session down.
                        None => break,
                    }
                }

                outcome = flight_wait(&mut self.inflight), if self.inflight.is_some() => {
                    self.on_flight_outcome(outcome);
                }

                _ = sleep_until_opt(self.debounce_deadline), if self.debounce_deadline.is_some() => {
                    self.debounce_deadline = None;
                    self.dispatch(Input::DebounceFired);
                }

                _ = sleep_until_opt(self.decay_deadline), if self.decay_deadline.is_some() => {
                    self.decay_deadline = None;
                    self.dispatch(Input::DecayElapsed);
                }
            }
        }

        // Teardown: the debounce timer dies with the task and any queued
        // value is dropped. An in-flight commit is never cancelled; await
        // it so the backend write runs to completion, then discard.
        self.deferred = None;
        if let Some(mut flight) = self.inflight.take() {
            let result = flight.fut.as_mut().await;
            debug!(
                field_id = %self.id,
                ok = result.is_ok(),
                "in-flight commit resolved after teardown"
            );
        }
        debug!(field_id = %self.id, "session closed");
    }

    /// Run one input through the state machine, reconcile timers, carry
    /// out effects, and publish the new snapshot.
    fn dispatch(&mut self, input: Input<V>) {
        let before = self.state.status();
        let effects = self.state.apply(input);
        let after = self.state.status();
        if after != before {
            debug!(field_id = %self.id, from = %before, to = %after, "status changed");
        }

        // Timers follow status: the debounce deadline only lives in
        // `Pending`, the decay deadline only in `Saved`.
        if after != Status::Pending {
            self.debounce_deadline = None;
        }
        if after != Status::Saved {
            self.decay_deadline = None;
        }

        for effect in effects {
            match effect {
                Effect::ArmDebounce => {
                    self.debounce_deadline = Some(Instant::now() + self.config.delay);
                }
                Effect::ArmDecay => {
                    self.decay_deadline = Some(Instant::now() + self.config.saved_decay);
                }
                Effect::StartCommit(v) => self.start_commit(v),
                Effect::Supersede => {
                    self.cycle = self.cycle.wrapping_add(1);
                    self.deferred = None;
                }
            }
        }

        self.publish();
    }

    /// Begin a commit cycle: validate, then launch the handler.
    fn start_commit(&mut self, value: V) {
        if let Some(validate) = &self.validate {
            if let Some(reason) = validate(&value) {
                // Validation short-circuits the network entirely.
                let err = Arc::new(Error::Validation(reason));
                debug!(field_id = %self.id, error = %err, "validation rejected value");
                if let Some(hook) = &self.on_error {
                    hook(&err);
                }
                self.dispatch(Input::CommitFailed(err));
                return;
            }
        }

        if self.inflight.is_some() {
            // A superseded commit is still outstanding. Park the value;
            // it launches the moment the stale flight resolves.
            self.deferred = Some(value);
            return;
        }

        self.launch(value);
    }

    fn launch(&mut self, value: V) {
        let fut = (self.commit)(value.clone());
        let now = Instant::now();
        debug!(field_id = %self.id, "commit started");
        self.inflight = Some(InFlight {
            cycle: self.cycle,
            value,
            started: now,
            deadline: self.config.commit_timeout.map(|t| now + t),
            fut,
        });
    }

    fn on_flight_outcome(&mut self, outcome: FlightOutcome) {
        match outcome {
            FlightOutcome::Done(result) => {
                let Some(flight) = self.inflight.take() else {
                    return;
                };
                let duration_ms = flight.started.elapsed().as_millis() as u64;

                if flight.cycle != self.cycle {
                    // Superseded by reset or timeout. Not a failure; the
                    // outcome is intentionally discarded.
                    debug!(
                        field_id = %self.id,
                        duration_ms,
                        ok = result.is_ok(),
                        "superseded commit resolved"
                    );
                    if let Some(v) = self.deferred.take() {
                        self.launch(v);
                    }
                    return;
                }

                match result {
                    Ok(()) => {
                        debug!(field_id = %self.id, duration_ms, "commit succeeded");
                        if let Some(hook) = &self.on_success {
                            hook();
                        }
                        self.dispatch(Input::CommitOk(flight.value));
                    }
                    Err(e) => {
                        let err = Arc::new(Error::Commit(e));
                        warn!(field_id = %self.id, duration_ms, error = %err, "commit failed");
                        if let Some(hook) = &self.on_error {
                            hook(&err);
                        }
                        self.dispatch(Input::CommitFailed(err));
                    }
                }
            }
            FlightOutcome::TimedOut => {
                let Some(timeout) = self.config.commit_timeout else {
                    return;
                };
                let Some(flight) = self.inflight.as_mut() else {
                    return;
                };
                // Leave the flight running — it is never cancelled — but
                // stop watching the deadline and discard its outcome when
                // it eventually resolves.
                flight.deadline = None;
                self.cycle = self.cycle.wrapping_add(1);

                let err = Arc::new(Error::Timeout(timeout));
                warn!(field_id = %self.id, timeout_ms = timeout.as_millis() as u64, "commit timed out");
                if let Some(hook) = &self.on_error {
                    hook(&err);
                }
                self.dispatch(Input::CommitFailed(err));
            }
        }
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.state.snapshot());
    }
}

/// Await the outstanding flight, honoring its deadline if one is set.
/// Pends forever when no flight is outstanding; the caller guards the
/// select branch accordingly.
async fn flight_wait<V>(inflight: &mut Option<InFlight<V>>) -> FlightOutcome {
    let Some(flight) = inflight.as_mut() else {
        return std::future::pending().await;
    };
    match flight.deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, flight.fut.as_mut()).await {
            Ok(result) => FlightOutcome::Done(result),
            Err(_) => FlightOutcome::TimedOut,
        },
        None => FlightOutcome::Done(flight.fut.as_mut().await),
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
