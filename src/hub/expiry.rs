use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;

/// How long to wait for a deadline given in epoch milliseconds. Past deadlines fire right away.
pub fn delay_until(deadline_ms: i64, now_ms: i64) -> Duration {
    Duration::from_millis(deadline_ms.saturating_sub(now_ms).max(0) as u64)
}

#[derive(Debug)]
struct Pending {
    token: u64,
    deadline_ms: i64,
    task: JoinHandle<()>,
}

/// One outstanding eviction per room. Scheduling again aborts the previous timer.
#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    pending: HashMap<String, Pending>,
    next_token: u64,
}

impl ExpiryScheduler {
    pub fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Returns true if an earlier timer for this room was cancelled.
    pub fn replace(&mut self, room: &str, token: u64, deadline_ms: i64, task: JoinHandle<()>) -> bool {
        let previous = self.pending.insert(room.to_owned(), Pending { token, deadline_ms, task });
        match previous {
            Some(old) => {
                old.task.abort();
                true
            }
            None => false,
        }
    }

    /// Clears the entry if `token` is still the live one. A stale timer gets false and must do nothing.
    pub fn take_if_current(&mut self, room: &str, token: u64) -> bool {
        if self.pending.get(room).is_some_and(|p| p.token == token) {
            self.pending.remove(room);
            true
        } else {
            false
        }
    }

    pub fn deadline(&self, room: &str) -> Option<i64> {
        self.pending.get(room).map(|p| p.deadline_ms)
    }

    #[cfg(test)]
    pub fn is_pending(&self, room: &str) -> bool {
        self.pending.contains_key(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_clamped_at_zero() {
        assert_eq!(delay_until(1_500, 1_000), Duration::from_millis(500));
        assert_eq!(delay_until(1_000, 1_000), Duration::ZERO);
        assert_eq!(delay_until(0, 1_000), Duration::ZERO);
    }

    #[tokio::test]
    async fn replacing_aborts_the_old_timer() {
        let mut sched = ExpiryScheduler::default();

        let first = sched.next_token();
        let old = tokio::spawn(std::future::pending::<()>());
        let old_abort = old.abort_handle();
        assert!(!sched.replace("Tech", first, 10, old));

        let second = sched.next_token();
        assert!(sched.replace("Tech", second, 20, tokio::spawn(async {})));
        tokio::task::yield_now().await;

        assert!(old_abort.is_finished());
        assert_eq!(sched.deadline("Tech"), Some(20));
        assert!(!sched.take_if_current("Tech", first));
        assert!(sched.take_if_current("Tech", second));
        assert!(!sched.is_pending("Tech"));
    }
}
