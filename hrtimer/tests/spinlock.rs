use std::{
    thread,
    time::Duration,
};

use rstest::rstest;

use hrtimer::{
    log::debug,
    sync::{
        IrqSpinlock,
        Spinlock,
    },
};

use platform::TestPlatform;

mod log;
mod platform;

#[rstest]
#[timeout(Duration::from_secs(1))]
fn lock_unlock() {
    let spinlock = Spinlock::new(0);

    let mut lock = spinlock.lock();
    *lock += 1;
    debug!(?spinlock, "locked");

    assert!(spinlock.try_lock().is_none());

    drop(lock);
    debug!(?spinlock, "unlocked");

    assert_eq!(*spinlock.lock(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn exclusive_access() {
    let mut spinlock = Spinlock::new(0);

    *spinlock.get_mut() += 1;

    assert_eq!(*spinlock.lock(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn irq_spinlock_disables_interrupts() {
    let platform = TestPlatform::new(1);
    let spinlock = IrqSpinlock::new(Vec::new());

    assert!(platform::irq_enabled());
    {
        let mut lock = spinlock.lock(&platform);
        lock.push(1);
        assert!(!platform::irq_enabled());

        let nested = IrqSpinlock::new(());
        {
            let _lock = nested.lock(&platform);
            assert!(!platform::irq_enabled());
        }
        assert!(!platform::irq_enabled());
    }
    assert!(platform::irq_enabled());

    assert_eq!(*spinlock.lock(&platform), [1]);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
fn concurrent_increments() {
    let spinlock = Spinlock::new(0);

    thread::scope(|scope| {
        for _ in 0 .. THREAD_COUNT {
            scope.spawn(|| {
                for _ in 0 .. ITERATIONS {
                    *spinlock.lock() += 1;
                }
            });
        }
    });

    assert_eq!(*spinlock.lock(), THREAD_COUNT * ITERATIONS);
}

const ITERATIONS: usize = 10_000;
const THREAD_COUNT: usize = 4;

#[ctor::ctor]
fn init() {
    log::init();
}
