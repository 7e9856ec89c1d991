/// Примитив синхронизации [`IrqSpinlock`].
pub mod irq_spinlock;

/// Примитив синхронизации [`SequenceLock`].
pub mod sequence_lock;

/// Примитив синхронизации [`Spinlock`].
pub mod spinlock;

pub use irq_spinlock::{
    IrqSpinlock,
    IrqSpinlockGuard,
};
pub use sequence_lock::{
    SequenceLock,
    SequenceLockGuard,
};
pub use spinlock::{
    Spinlock,
    SpinlockGuard,
};
