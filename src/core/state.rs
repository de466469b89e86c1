//! Shared mining state
//!
//! [`SharedState`] is the single synchronization point between the network
//! task and the mining threads. The network side writes the current target
//! and drains the solution queue; miners read the target and push solutions.

use crate::core::{Address, Solution, Target};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Mining state shared between the network task and all miner threads.
///
/// Wrap in an `Arc` to share. All operations are infallible; blocking
/// operations return `None` once [`stop`](SharedState::stop) has been called.
pub struct SharedState {
    address: Address,

    target: Mutex<Option<Target>>,
    target_cv: Condvar,

    solutions: Mutex<VecDeque<Solution>>,
    solution_cv: Condvar,

    stopped: AtomicBool,
    hashes_completed: AtomicU64,
}

impl SharedState {
    /// Create a new shared state for the given mining address
    pub fn new(address: Address) -> Self {
        Self {
            address,
            target: Mutex::new(None),
            target_cv: Condvar::new(),
            solutions: Mutex::new(VecDeque::new()),
            solution_cv: Condvar::new(),
            stopped: AtomicBool::new(false),
            hashes_completed: AtomicU64::new(0),
        }
    }

    /// The Krist address being mined for
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the mining target, blocking until one is available.
    ///
    /// Returns `None` if the state is stopped.
    pub fn get_target(&self) -> Option<Target> {
        let mut target = self.target.lock();

        while target.is_none() && !self.is_stopped() {
            self.target_cv.wait(&mut target);
        }

        if self.is_stopped() { None } else { *target }
    }

    /// Get the current target without blocking
    pub fn get_target_now(&self) -> Option<Target> {
        *self.target.lock()
    }

    /// Set the current mining target.
    ///
    /// Setting a target identical to the current one is a no-op. Otherwise
    /// the target is replaced, target waiters are woken, and the solution
    /// queue is cleared so no stale nonce can be submitted.
    pub fn set_target(&self, new_target: Target) {
        let mut target = self.target.lock();

        if *target != Some(new_target) {
            *target = Some(new_target);
            self.target_cv.notify_all();

            self.clear_solutions();
        }
    }

    /// Unset the mining target, clearing queued solutions
    pub fn unset_target(&self) {
        let mut target = self.target.lock();

        if target.is_some() {
            *target = None;
            self.target_cv.notify_all();

            self.clear_solutions();
        }
    }

    /// Drain all queued solutions, waking queue waiters
    pub fn clear_solutions(&self) {
        let mut solutions = self.solutions.lock();
        solutions.clear();
        self.solution_cv.notify_all();
    }

    /// Append a solution to the end of the queue
    pub fn push_solution(&self, solution: Solution) {
        let mut solutions = self.solutions.lock();
        solutions.push_back(solution);
        self.solution_cv.notify_one();
    }

    /// Pop the first solution, blocking until one is available.
    ///
    /// Returns `None` if the state is stopped.
    pub fn pop_solution(&self) -> Option<Solution> {
        let mut solutions = self.solutions.lock();

        loop {
            if self.is_stopped() {
                return None;
            }

            if let Some(solution) = solutions.pop_front() {
                return Some(solution);
            }

            self.solution_cv.wait(&mut solutions);
        }
    }

    /// Pop the first solution without blocking
    pub fn pop_solution_now(&self) -> Option<Solution> {
        self.solutions.lock().pop_front()
    }

    /// Set the stopped flag, waking every blocked caller so it can exit
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);

        // take each lock so no waiter can slip between its check and its wait
        let _target = self.target.lock();
        self.target_cv.notify_all();
        drop(_target);

        let _solutions = self.solutions.lock();
        self.solution_cv.notify_all();
    }

    /// Whether the stop flag is set
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Record `count` evaluated hashes
    pub fn add_hashes(&self, count: u64) {
        self.hashes_completed.fetch_add(count, Ordering::Relaxed);
    }

    /// Total hashes evaluated across all miners
    pub fn hashes_completed(&self) -> u64 {
        self.hashes_completed.load(Ordering::Relaxed)
    }
}
