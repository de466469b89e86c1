//! At-most-one-in-flight submission slot
//!
//! The runner holds a [`SubmitState`] that carries the solution currently
//! being submitted. The feeder thread blocks in [`set`](SubmitState::set)
//! while a prior submission is outstanding; the event loop clears the slot
//! when the node's reply arrives, which also advances the submission id used
//! to correlate replies.

use crate::core::Solution;
use parking_lot::{Condvar, Mutex};

struct Slot {
    solution: Option<Solution>,
    id: u64,
    shutdown: bool,
}

/// Cross-thread coordination for a single outstanding submission
pub struct SubmitState {
    slot: Mutex<Slot>,
    cv: Condvar,
}

impl Default for SubmitState {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitState {
    /// Create an empty submit state; ids start at 1
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                solution: None,
                id: 1,
                shutdown: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Store a solution, blocking until the previous one has been processed.
    ///
    /// Returns `false` if the state was shut down, in which case the
    /// solution was not stored.
    pub fn set(&self, solution: Solution) -> bool {
        let mut slot = self.slot.lock();

        while slot.solution.is_some() && !slot.shutdown {
            self.cv.wait(&mut slot);
        }

        if slot.shutdown {
            return false;
        }

        slot.solution = Some(solution);
        true
    }

    /// Get the outstanding solution, if any, without blocking
    pub fn get(&self) -> Option<Solution> {
        self.slot.lock().solution
    }

    /// Clear the slot and advance the submission id, waking blocked setters
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        slot.solution = None;
        slot.id += 1;
        self.cv.notify_all();
    }

    /// The id the current (or next) submission carries
    pub fn id(&self) -> u64 {
        self.slot.lock().id
    }

    /// Unblock all setters permanently; used on runner exit
    pub fn shutdown(&self) {
        let mut slot = self.slot.lock();
        slot.shutdown = true;
        self.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, Nonce, ShortHash, Solution, Target};
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn solution(nonce: &[u8; 15]) -> Solution {
        Solution::new(
            Target::new(ShortHash::from_str("aaaaaaaaaaaa").unwrap(), 100_000).unwrap(),
            Address::from_str("k5ztameslf").unwrap(),
            Nonce::from_solution_buffer(nonce).unwrap(),
        )
    }

    #[test]
    fn test_initial_state() {
        let submit = SubmitState::new();
        assert_eq!(submit.get(), None);
        assert_eq!(submit.id(), 1);
    }

    #[test]
    fn test_set_get_clear() {
        let submit = SubmitState::new();
        let s = solution(b"ab0000000000...");

        assert!(submit.set(s));
        assert_eq!(submit.get(), Some(s));

        submit.clear();
        assert_eq!(submit.get(), None);
        assert_eq!(submit.id(), 2);
    }

    #[test]
    fn test_id_increments_on_every_clear() {
        let submit = SubmitState::new();
        for expected in 2..6 {
            submit.clear();
            assert_eq!(submit.id(), expected);
        }
    }

    #[test]
    fn test_set_blocks_until_cleared() {
        let submit = Arc::new(SubmitState::new());
        let first = solution(b"ab000000000a...");
        let second = solution(b"ab000000000b...");

        assert!(submit.set(first));

        let setter = {
            let submit = Arc::clone(&submit);
            thread::spawn(move || submit.set(second))
        };

        // the second set must still be blocked
        thread::sleep(Duration::from_millis(50));
        assert_eq!(submit.get(), Some(first));

        submit.clear();
        assert!(setter.join().unwrap());
        assert_eq!(submit.get(), Some(second));
        assert_eq!(submit.id(), 2);
    }

    #[test]
    fn test_shutdown_unblocks_setters() {
        let submit = Arc::new(SubmitState::new());
        assert!(submit.set(solution(b"ab000000000a...")));

        let setter = {
            let submit = Arc::clone(&submit);
            thread::spawn(move || submit.set(solution(b"ab000000000b...")))
        };

        thread::sleep(Duration::from_millis(50));
        submit.shutdown();

        assert!(!setter.join().unwrap());
        // shutdown rejects further sets immediately
        assert!(!submit.set(solution(b"ab000000000c...")));
    }
}
