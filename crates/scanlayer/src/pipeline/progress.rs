//! Event-driven progress tracking.
//!
//! The controller forwards one [`CompletionEvent`] per finished unit over a
//! channel; the tracker thread owns the [`ProgressState`] and emits status
//! lines on its own cadence, so reporting never blocks dispatch.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};

use crate::worker::job::{UnitOutcome, UnitStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub unit_id: String,
    pub status: UnitStatus,
    pub errors: usize,
    pub pages: usize,
}

impl From<&UnitOutcome> for CompletionEvent {
    fn from(outcome: &UnitOutcome) -> Self {
        Self {
            unit_id: outcome.unit_id.clone(),
            status: outcome.status,
            errors: outcome.errors.len(),
            pages: outcome.pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Eta {
    /// Nothing has completed yet.
    Indeterminate,
    Estimate {
        seconds_per_unit: f64,
        remaining: Duration,
        completion: DateTime<Local>,
    },
}

/// Counters for one run. Reset per run, never persisted.
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Error records, including per-page errors of completed units.
    pub errors: usize,
    pub pages: usize,
    /// Status lines emitted so far.
    pub reports: usize,
    started: Instant,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self::started_at(total, Instant::now())
    }

    pub fn started_at(total: usize, started: Instant) -> Self {
        Self {
            total,
            processed: 0,
            failed: 0,
            skipped: 0,
            errors: 0,
            pages: 0,
            reports: 0,
            started,
        }
    }

    pub fn record(&mut self, event: &CompletionEvent) {
        self.processed += 1;
        self.errors += event.errors;
        self.pages += event.pages;
        match event.status {
            UnitStatus::Completed => {}
            UnitStatus::Failed => self.failed += 1,
            UnitStatus::Skipped => self.skipped += 1,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn eta(&self, now: Instant, wall_now: DateTime<Local>) -> Eta {
        if self.processed == 0 {
            return Eta::Indeterminate;
        }
        let seconds_per_unit = self.elapsed(now).as_secs_f64() / self.processed as f64;
        let remaining_units = self.total.saturating_sub(self.processed);
        let remaining = Duration::from_secs_f64(seconds_per_unit * remaining_units as f64);
        let completion = wall_now
            + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero());
        Eta::Estimate {
            seconds_per_unit,
            remaining,
            completion,
        }
    }

    pub fn status_line(&self, noun: &str, now: Instant, wall_now: DateTime<Local>) -> String {
        let head = format!("Processed {}/{} {}", self.processed, self.total, noun);
        match self.eta(now, wall_now) {
            Eta::Indeterminate => format!("{}, ETA: indeterminate, Errors: {}", head, self.errors),
            Eta::Estimate {
                seconds_per_unit,
                remaining,
                completion,
            } => format!(
                "{} ({:.3} s/{}), ETA: {} ({}), Errors: {}",
                head,
                seconds_per_unit,
                singular(noun),
                completion.format("%Y-%m-%d %H:%M:%S"),
                format_duration(remaining),
                self.errors
            ),
        }
    }

    fn should_report(&self, every: usize) -> bool {
        self.processed == self.total || (every > 0 && self.processed % every == 0)
    }
}

fn singular(noun: &str) -> &str {
    noun.strip_suffix('s').unwrap_or(noun)
}

/// `HH:MM:SS`, hours unbounded.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub report_every: usize,
    /// Plural unit noun for status lines (`images`, `documents`).
    pub noun: String,
}

pub struct ProgressTracker {
    sender: Sender<CompletionEvent>,
    handle: JoinHandle<ProgressState>,
}

impl ProgressTracker {
    pub fn spawn(total: usize, options: TrackerOptions) -> Self {
        let (sender, receiver) = unbounded::<CompletionEvent>();
        let state = ProgressState::new(total);
        let handle = thread::spawn(move || track(receiver, state, options));
        Self { sender, handle }
    }

    pub fn sender(&self) -> Sender<CompletionEvent> {
        self.sender.clone()
    }

    /// Closes the event stream and returns the final counters.
    pub fn finish(self, total_hint: usize) -> ProgressState {
        drop(self.sender);
        match self.handle.join() {
            Ok(state) => state,
            Err(_) => {
                warn!("Progress tracker thread panicked");
                ProgressState::new(total_hint)
            }
        }
    }
}

fn track(
    receiver: Receiver<CompletionEvent>,
    mut state: ProgressState,
    options: TrackerOptions,
) -> ProgressState {
    let mut last_reported = 0;

    for event in receiver.iter() {
        state.record(&event);
        if state.should_report(options.report_every) {
            emit(&mut state, &options.noun);
            last_reported = state.processed;
        }
    }

    // Cancelled runs end short of the total; still close with a line.
    if state.processed > 0 && last_reported != state.processed {
        emit(&mut state, &options.noun);
    }
    state
}

fn emit(state: &mut ProgressState, noun: &str) {
    info!("{}", state.status_line(noun, Instant::now(), Local::now()));
    state.reports += 1;
}
