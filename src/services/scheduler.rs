use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &str;

    /// Runs to completion; failures are the job's own to log.
    async fn run(&mut self);
}

struct Entry {
    job: Box<dyn Job>,
    interval: Duration,
    next_run: Instant,
}

/// Cooperative job table checked once per tick.
///
/// Jobs are awaited one at a time, so a job never overlaps itself and a slow
/// job delays the rest of the table until it returns.
pub struct Scheduler {
    entries: Vec<Entry>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            entries: Vec::new(),
            tick,
        }
    }

    /// Registers `job` to first run one `every` from now.
    pub fn every<J: Job + 'static>(&mut self, every: Duration, job: J) -> &mut Self {
        let first_run = Instant::now() + every;
        self.register(every, first_run, job)
    }

    /// Registers `job` to run on the next tick, then once per `every`.
    pub fn every_starting_now<J: Job + 'static>(&mut self, every: Duration, job: J) -> &mut Self {
        self.register(every, Instant::now(), job)
    }

    fn register<J: Job + 'static>(&mut self, every: Duration, first_run: Instant, job: J) -> &mut Self {
        let every = every.max(self.tick);
        info!("Scheduled job {} every {:?}", job.name(), every);
        self.entries.push(Entry {
            job: Box::new(job),
            interval: every,
            next_run: first_run,
        });
        self
    }

    /// Runs every job that is due, in registration order; returns how many ran.
    pub async fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        for entry in &mut self.entries {
            if Instant::now() < entry.next_run {
                continue;
            }
            debug!("Running job {}", entry.job.name());
            entry.job.run().await;
            entry.next_run = next_slot(entry.next_run, entry.interval, Instant::now());
            ran += 1;
        }
        ran
    }

    pub async fn run_forever(mut self) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_pending().await;
        }
    }
}

/// First slot on the `scheduled + k * every` grid that lies after `now`.
fn next_slot(scheduled: Instant, every: Duration, now: Instant) -> Instant {
    let next = scheduled + every;
    if next > now {
        return next;
    }
    let behind = now.duration_since(scheduled).as_nanos();
    let slots = behind / every.as_nanos() + 1;
    scheduled + every * slots as u32
}
