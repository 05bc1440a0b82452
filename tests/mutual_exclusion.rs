#![allow(missing_docs)]

//! Fork exclusivity and gate occupancy, checked from the outside.

mod common;

use dining::{EventLog, Observer, Strategy, Table};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn no_fork_is_ever_held_twice() {
    common::init_test_logging();
    for strategy in Strategy::ALL {
        let config = common::quick_config(strategy, 21)
            .with_seats(7)
            .with_meals(10)
            .with_deadline(Duration::from_secs(30));
        let table = Table::new(config).expect("build");
        let log = Arc::new(EventLog::new());
        let report = table
            .run_observed(Arc::clone(&log) as Arc<dyn Observer>)
            .expect("run");

        assert!(report.is_complete(), "{strategy}: {report}");
        assert_eq!(log.check_mutual_exclusion(), Ok(()), "{strategy}");
        assert_eq!(log.matched_pairs(), report.total_meals(), "{strategy}");
    }
}

#[test]
fn gate_occupancy_stays_within_bounds() {
    common::init_test_logging();
    let config = common::quick_config(Strategy::Gated, 22)
        .with_meals(20)
        .with_deadline(Duration::from_secs(30));
    let table = Table::new(config).expect("build");
    let gate = Arc::clone(table.gate().expect("gated table has a gate"));
    let log = Arc::new(EventLog::new());
    let done = AtomicBool::new(false);

    let (report, sampled_peak) = thread::scope(|scope| {
        let sampler = scope.spawn(|| {
            let mut peak = 0;
            while !done.load(Ordering::Acquire) {
                let in_use = gate.in_use();
                assert!(in_use <= gate.capacity());
                peak = peak.max(in_use);
                thread::yield_now();
            }
            peak
        });
        let report = table.run_observed(Arc::clone(&log) as Arc<dyn Observer>);
        done.store(true, Ordering::Release);
        (report, sampler.join().expect("sampler"))
    });
    let report = report.expect("run");

    assert!(report.is_complete(), "{report}");
    assert!(sampled_peak <= 4);
    assert!(gate.peak_in_use() <= 4);
    assert!(sampled_peak <= gate.peak_in_use());
    let (low, high) = log.gate_occupancy_range();
    assert!(low >= 0);
    assert!(high <= 4);
    assert_eq!(gate.in_use(), 0);
}
