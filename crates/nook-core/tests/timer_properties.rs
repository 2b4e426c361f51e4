//! Property tests for the timer engine.

use nook_core::stats::is_long_break;
use nook_core::{Event, Settings, TimerEngine, TimerMode, TimerState};
use proptest::prelude::*;

const T0: u64 = 1_767_225_600_000;

fn mode_strategy() -> impl Strategy<Value = TimerMode> {
    prop_oneof![
        Just(TimerMode::Focus),
        Just(TimerMode::Short),
        Just(TimerMode::Long),
    ]
}

proptest! {
    #[test]
    fn progress_never_decreases_and_ends_at_one(
        mode in mode_strategy(),
        steps in prop::collection::vec(1u64..5_000, 1..400),
    ) {
        let settings = Settings::default();
        let mut engine = TimerEngine::new(&settings);
        engine.start_session(mode, T0, &settings);

        let mut now = T0;
        let mut last = engine.progress();
        let mut completed = false;
        for step in steps {
            now += step;
            let event = engine.tick(now);
            prop_assert!(engine.progress() >= last);
            prop_assert!(engine.remaining_secs() <= engine.initial_secs());
            last = engine.progress();
            if let Some(Event::TimerCompleted { .. }) = event {
                prop_assert_eq!(engine.progress(), 1.0);
                completed = true;
                break;
            }
        }

        if !completed {
            // Drive to the end instant exactly: ties complete.
            let end = engine.end_time_ms().unwrap();
            let event = engine.tick(end);
            prop_assert!(matches!(event, Some(Event::TimerCompleted { .. })), "expected completion at end instant");
            prop_assert_eq!(engine.progress(), 1.0);
        }
        prop_assert_eq!(engine.state(), TimerState::Idle);
        prop_assert_eq!(engine.end_time_ms(), None);
    }

    #[test]
    fn pause_then_resume_preserves_remaining(
        elapsed_ms in 0u64..(25 * 60 * 1000 - 1000),
        idle_ms in 0u64..10_000_000,
    ) {
        let settings = Settings::default();
        let mut engine = TimerEngine::new(&settings);
        engine.start(T0, &settings);
        engine.tick(T0 + elapsed_ms);
        engine.pause(T0 + elapsed_ms);
        let frozen = engine.remaining_secs();
        prop_assert!(frozen > 0);

        let resumed_at = T0 + elapsed_ms + idle_ms;
        engine.resume(resumed_at, &settings);
        prop_assert_eq!(engine.remaining_secs(), frozen);
        prop_assert_eq!(engine.end_time_ms(), Some(resumed_at + frozen * 1000));
    }

    #[test]
    fn long_breaks_fall_on_multiples_of_interval(sessions in 1u64..1_000, interval in 1u64..12) {
        prop_assert_eq!(is_long_break(sessions, interval), sessions % interval == 0);
    }
}

#[test]
fn interval_four_gives_long_breaks_at_four_eight_twelve() {
    let long: Vec<u64> = (1..=12).filter(|&n| is_long_break(n, 4)).collect();
    assert_eq!(long, vec![4, 8, 12]);
}
