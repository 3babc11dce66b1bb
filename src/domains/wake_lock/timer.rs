use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Single-interval countdown scheduler. Holds only the interval task; the remaining time
/// lives with the caller so a countdown can be resumed at any value.
pub struct CountdownTimer {
    period: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts ticking once per period, first tick one period from now. Any running interval is
    /// stopped first. Returns the generation passed to every tick of this interval.
    pub fn start<F, Fut>(&mut self, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if on_tick(generation).await == TickFlow::Stop {
                    break;
                }
            }
        }));
        generation
    }

    /// Aborts the running interval. Idempotent. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forgets the running interval without aborting it. Used from inside a tick that is
    /// about to finish on its own.
    pub fn detach(&mut self) {
        self.handle = None;
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut(u64) -> std::future::Ready<TickFlow> + Send + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(TickFlow::Continue)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_after_first_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        timer.start(counting(&ticks));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_previous_interval() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut timer = CountdownTimer::new(Duration::from_secs(1));

        let g1 = timer.start(counting(&first));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let g2 = timer.start(counting(&second));
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert!(!timer.is_current(g1));
        assert!(timer.is_current(g2));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        timer.start(counting(&ticks));
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert!(timer.stop());
        assert!(!timer.stop());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn returning_stop_ends_the_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut timer = CountdownTimer::new(Duration::from_secs(1));
        timer.start(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n >= 2 { TickFlow::Stop } else { TickFlow::Continue })
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!timer.is_running());
    }
}
