use crate::{TimerIntervals, TimerManager};

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
}

fn arm_counting(timers: &mut TimerManager, ticks: &Arc<AtomicUsize>, polls: &Arc<AtomicUsize>) {
    let ticks = Arc::clone(ticks);
    let polls = Arc::clone(polls);
    timers.arm(
        move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        },
        move |_live| {
            let polls = Arc::clone(&polls);
            async move {
                polls.fetch_add(1, Ordering::SeqCst);
            }
        },
    );
}

/// WHAT: Armed timers tick at 1 Hz and poll at 10 Hz
/// WHY: Elapsed seconds and the amplitude indicator depend on these rates
#[tokio::test(start_paused = true)]
async fn given_armed_timers_when_time_passes_then_callbacks_fire_at_their_rates() {
    // Given
    let (ticks, polls) = counters();
    let mut timers = TimerManager::new(TimerIntervals::default());
    arm_counting(&mut timers, &ticks, &polls);
    assert!(timers.is_armed());

    // When
    tokio::time::sleep(Duration::from_millis(3_050)).await;

    // Then
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert!((29..=30).contains(&polls.load(Ordering::SeqCst)));
    timers.disarm();
}

/// WHAT: Neither callback fires immediately on arming
/// WHY: The first elapsed increment belongs one second in
#[tokio::test(start_paused = true)]
async fn given_fresh_arming_when_less_than_a_period_passes_then_no_callbacks() {
    let (ticks, polls) = counters();
    let mut timers = TimerManager::new(TimerIntervals::default());
    arm_counting(&mut timers, &ticks, &polls);

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(polls.load(Ordering::SeqCst), 0);
}

/// WHAT: Disarmed timers never fire again
/// WHY: Stale callbacks must not mutate state after recording ends
#[tokio::test(start_paused = true)]
async fn given_armed_timers_when_disarmed_then_no_further_callbacks() {
    // Given
    let (ticks, polls) = counters();
    let mut timers = TimerManager::new(TimerIntervals::default());
    arm_counting(&mut timers, &ticks, &polls);
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    let ticks_before = ticks.load(Ordering::SeqCst);
    let polls_before = polls.load(Ordering::SeqCst);

    // When
    timers.disarm();
    timers.disarm();
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Then
    assert!(!timers.is_armed());
    assert_eq!(ticks.load(Ordering::SeqCst), ticks_before);
    assert_eq!(polls.load(Ordering::SeqCst), polls_before);
}

/// WHAT: Re-arming replaces the running pair
/// WHY: Two armings must never double the tick rate
#[tokio::test(start_paused = true)]
async fn given_armed_timers_when_rearmed_then_only_new_pair_runs() {
    // Given
    let (old_ticks, old_polls) = counters();
    let (new_ticks, new_polls) = counters();
    let mut timers = TimerManager::new(TimerIntervals::default());
    arm_counting(&mut timers, &old_ticks, &old_polls);

    // When
    arm_counting(&mut timers, &new_ticks, &new_polls);
    tokio::time::sleep(Duration::from_millis(2_050)).await;

    // Then
    assert_eq!(old_ticks.load(Ordering::SeqCst), 0);
    assert_eq!(old_polls.load(Ordering::SeqCst), 0);
    assert_eq!(new_ticks.load(Ordering::SeqCst), 2);
    timers.disarm();
}

/// WHAT: The liveness flag handed to a poll goes dead on disarm
/// WHY: A poll suspended mid-read must be able to tell it is stale
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_poll_in_flight_when_disarmed_then_liveness_reports_dead() {
    // Given: A poll that parks its liveness flag
    let parked = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&parked);
    let mut timers = TimerManager::new(TimerIntervals::default());
    timers.arm(
        || {},
        move |live| {
            *slot.lock().unwrap() = Some(live);
            async {}
        },
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    let live = parked.lock().unwrap().clone().unwrap();
    assert!(live.is_live());

    // When
    timers.disarm();

    // Then
    assert!(!live.is_live());
}

/// WHAT: Dropping the manager stops its timers
/// WHY: A discarded attempt must not leave tasks running
#[tokio::test(start_paused = true)]
async fn given_armed_timers_when_manager_dropped_then_callbacks_stop() {
    let (ticks, polls) = counters();
    let mut timers = TimerManager::new(TimerIntervals::default());
    arm_counting(&mut timers, &ticks, &polls);

    drop(timers);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(polls.load(Ordering::SeqCst), 0);
}
