//! Cross-thread submission ordering
//!
//! Models the feeder/runner choreography: solutions queue up FIFO in the
//! shared state, the feeder parks them one at a time in the submission slot,
//! and a target change drops queued solutions for the old block.

use krist_mining_client::core::{Nonce, SharedState, ShortHash, Solution, Target};
use krist_mining_client::protocol::submit::SubmitState;
use krist_mining_client::Address;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn address() -> Address {
    Address::from_str("k5ztameslf").unwrap()
}

fn target(block: &str, work: i64) -> Target {
    Target::new(ShortHash::from_str(block).unwrap(), work).unwrap()
}

fn solution(t: Target, nonce: &str) -> Solution {
    Solution::new(
        t,
        address(),
        Nonce::from_solution_buffer(nonce.as_bytes()).unwrap(),
    )
}

#[test]
fn test_one_submission_in_flight_at_a_time() {
    let state = Arc::new(SharedState::new(address()));
    let submit = Arc::new(SubmitState::new());

    let t = target("aaaaaaaaaaaa", 100_000);
    let a = solution(t, "ab000000000a");
    let b = solution(t, "ab000000000b");

    state.push_solution(a);
    state.push_solution(b);

    // feeder drains the queue into the slot, one at a time
    let feeder = {
        let state = Arc::clone(&state);
        let submit = Arc::clone(&submit);
        thread::spawn(move || {
            while let Some(solution) = state.pop_solution() {
                if !submit.set(solution) {
                    break;
                }
            }
        })
    };

    // A becomes the outstanding submission with id 1
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while submit.get() != Some(a) {
        assert!(std::time::Instant::now() < deadline);
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(submit.id(), 1);

    // while A is outstanding, B must not replace it
    thread::sleep(Duration::from_millis(100));
    assert_eq!(submit.get(), Some(a));

    // the ack clears the slot; B follows under id 2
    submit.clear();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while submit.get() != Some(b) {
        assert!(std::time::Instant::now() < deadline);
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(submit.id(), 2);

    state.stop();
    submit.shutdown();
    feeder.join().unwrap();
}

#[test]
fn test_target_change_drops_stale_solutions() {
    let state = SharedState::new(address());

    let t1 = target("aaaaaaaaaaaa", 1);
    state.set_target(t1);
    state.push_solution(solution(t1, "ab000000000a"));
    state.push_solution(solution(t1, "ab000000000b"));

    // a new block arrives; nothing found under t1 may survive
    let t2 = target("bbbbbbbbbbbb", 1_000_000_000);
    state.set_target(t2);

    assert_eq!(state.pop_solution_now(), None);

    // solutions for the new target flow normally
    let fresh = solution(t2, "ab000000000c");
    state.push_solution(fresh);
    assert_eq!(state.pop_solution_now(), Some(fresh));
}

#[test]
fn test_stop_unblocks_every_waiter() {
    let state = Arc::new(SharedState::new(address()));
    let submit = Arc::new(SubmitState::new());

    // occupy the submission slot so the next set blocks
    assert!(submit.set(solution(target("aaaaaaaaaaaa", 1), "ab000000000a")));

    let target_waiter = {
        let state = Arc::clone(&state);
        thread::spawn(move || state.get_target())
    };
    let solution_waiter = {
        let state = Arc::clone(&state);
        thread::spawn(move || state.pop_solution())
    };
    let submit_waiter = {
        let submit = Arc::clone(&submit);
        thread::spawn(move || submit.set(solution(target("aaaaaaaaaaaa", 1), "ab000000000b")))
    };

    thread::sleep(Duration::from_millis(100));

    state.stop();
    submit.shutdown();

    assert_eq!(target_waiter.join().unwrap(), None);
    assert_eq!(solution_waiter.join().unwrap(), None);
    assert!(!submit_waiter.join().unwrap());
}
