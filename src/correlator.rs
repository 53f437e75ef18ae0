//! Response correlator - accumulates decoded records until a WaitSpec settles
//!
//! Debugger output interleaves asynchronous notifications with synchronous
//! results, and a command's `^done` and the session's `*stopped` can arrive in
//! either order. The correlator therefore evaluates every arriving record on
//! its own against a set of acceptable terminal signatures.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{Result, SleuthError};
use crate::mi::{Record, WaitSpec};
use crate::transport::Transport;

/// Deadline used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Bounded polling: a fixed interval between polls and a hard deadline
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    poll_interval: Duration,
    started: Instant,
    deadline: Instant,
}

impl PollSchedule {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            poll_interval,
            started,
            deadline: started
                .checked_add(timeout)
                .or_else(|| started.checked_add(FAR_FUTURE))
                .unwrap_or(started),
        }
    }

    /// How long the next poll may wait, or `None` once the deadline has passed
    pub fn next_wait(&self) -> Option<Duration> {
        let remaining = self.deadline.checked_duration_since(Instant::now())?;
        if remaining.is_zero() {
            return None;
        }
        Some(self.poll_interval.min(remaining))
    }

    pub fn is_expired(&self) -> bool {
        self.next_wait().is_none()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Read records from `transport` until one satisfies `spec`.
///
/// Returns every record received, in arrival order, ending with the settling
/// one. Lines after it stay buffered in the transport. An empty poll is not a
/// failure. If `timeout` passes first, the error carries the partial records.
pub async fn collect<T>(
    transport: &mut T,
    spec: &WaitSpec,
    poll_interval: Duration,
    timeout: Duration,
    label: &str,
) -> Result<Vec<Record>>
where
    T: Transport + ?Sized,
{
    let schedule = PollSchedule::new(poll_interval, timeout);
    let mut records = Vec::new();

    while let Some(wait) = schedule.next_wait() {
        let Some(line) = transport.read_line(wait).await? else {
            continue;
        };
        let Some(record) = Record::decode(&line) else {
            continue;
        };

        debug!("[{}] {} <- {}", label, record, record.raw);
        let settled = spec.matches(&record);
        records.push(record);

        if settled {
            debug!("[{}] settled after {:?} with {} records", label, schedule.elapsed(), records.len());
            return Ok(records);
        }
    }

    warn!("[{}] no settling record within {:?} ({} records)", label, timeout, records.len());
    Err(SleuthError::CorrelationTimeout {
        command: label.to_string(),
        timeout_ms: timeout.as_millis() as u64,
        records,
    })
}
