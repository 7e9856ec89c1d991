use core::{
    cell::UnsafeCell,
    hint,
    sync::atomic::{
        self,
        AtomicU64,
        Ordering,
    },
};

// Used in docs.
#[allow(unused)]
use super::spinlock::Spinlock;

/// Реализует блокировку [sequence lock](https://en.wikipedia.org/wiki/Seqlock)
/// для согласованного доступа к разделяемым данным.
///
/// Она позволяет не захватывать блокировку в читателе,
/// поэтому писатели никогда не ждут читателей.
/// Подходит для данных с единственным писателем,
/// которые часто читаются на горячем пути.
///
/// См. также:
///   - [Writing a seqlock in Rust.](https://pitdicker.github.io/Writing-a-seqlock-in-Rust/)
///   - [Can Seqlocks Get Along With Programming Language Memory Models?](https://www.hpl.hp.com/techreports/2012/HPL-2012-68.pdf)
pub struct SequenceLock<T: Copy> {
    /// Защищаемые данные.
    data: UnsafeCell<T>,

    /// Возрастающая последовательность чисел, которая позволяет понять:
    ///   - Взята ли блокировка на запись.
    ///   - Согласованно ли прочитаны данные.
    sequence: AtomicU64,
}

impl<T: Copy> SequenceLock<T> {
    /// Создаёт новый [`SequenceLock`] для защиты `data`.
    pub const fn new(data: T) -> Self {
        Self {
            data: UnsafeCell::new(data),
            sequence: AtomicU64::new(0),
        }
    }

    /// Захватывает блокировку на запись.
    /// При этом ожидает в активном цикле освобождения блокировки, если она уже захвачена.
    ///
    /// Возвращает [`SequenceLockGuard`], который:
    ///   - Позволяет читать и писать в защищаемые [`SequenceLock`] данные
    ///     методами [`SequenceLockGuard::get()`] и [`SequenceLockGuard::set()`] соответственно.
    ///   - Автоматически освобождает блокировку в реализации типажа [`Drop`].
    pub fn write_lock(&self) -> SequenceLockGuard<'_, T> {
        loop {
            let sequence = self.sequence.load(Ordering::Relaxed);

            if !Self::is_locked(sequence) &&
                self.sequence
                    .compare_exchange_weak(
                        sequence,
                        sequence + 1,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                atomic::fence(Ordering::Release);
                return SequenceLockGuard {
                    sequence_lock: self,
                };
            }

            hint::spin_loop();
        }
    }

    /// Помечает [`SequenceLock`] как записываемый в текущий момент,
    /// если вызывающая сторона может гарантировать,
    /// что [`SequenceLock`] не захвачен на запись.
    ///
    /// # Safety
    ///
    /// Вызывающая сторона должна быть уже синхронизирована с другими писателями.
    /// То есть, обеспечить эксклюзивность записи.
    ///
    /// # Panics
    ///
    /// Паникует, если обнаруживается, что вызывающая сторона не обладает эксклюзивностью записи.
    pub unsafe fn write(&self) -> SequenceLockGuard<'_, T> {
        let sequence = self.sequence.fetch_add(1, Ordering::Acquire);
        assert!(
            !Self::is_locked(sequence),
            "concurrent writers detected on a sequence lock",
        );
        atomic::fence(Ordering::Release);

        SequenceLockGuard {
            sequence_lock: self,
        }
    }

    /// Читает защищаемые [`SequenceLock`] данные.
    /// При этом в активном цикле ожидает освобождения блокировки на запись, если она захвачена.
    pub fn read(&self) -> T {
        loop {
            if let Some(data) = self.try_read() {
                return data;
            }

            hint::spin_loop();
        }
    }

    /// Пытается прочитать защищаемые [`SequenceLock`] данные.
    /// Возвращает [`None`], если конкурентно захвачена блокировка на запись.
    fn try_read(&self) -> Option<T> {
        let before = self.sequence.load(Ordering::Acquire);
        if Self::is_locked(before) {
            return None;
        }

        let data = unsafe { atomic_memcpy::atomic_load(self.data.get(), Ordering::Acquire) };

        atomic::fence(Ordering::Acquire);
        let after = self.sequence.load(Ordering::Relaxed);

        if before == after {
            Some(unsafe { data.assume_init() })
        } else {
            None
        }
    }

    /// Позволяет читать и писать в защищаемые [`SequenceLock`] данные без блокирования в случае,
    /// если вызывающий код эксклюзивно владеет [`SequenceLock`] --- `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Возвращает `true`, если значение `sequence` означает,
    /// что захвачена блокировка на запись.
    fn is_locked(sequence: u64) -> bool {
        sequence % 2 != 0
    }
}

/// См. [The Rustonomicon, "Send and Sync"](https://doc.rust-lang.org/nomicon/send-and-sync.html).
unsafe impl<T: Copy + Send> Send for SequenceLock<T> {
}

/// См. [The Rustonomicon, "Send and Sync"](https://doc.rust-lang.org/nomicon/send-and-sync.html).
unsafe impl<T: Copy + Send> Sync for SequenceLock<T> {
}

/// Захваченный на запись [`SequenceLock`].
///
/// - Позволяет читать и писать в защищаемые [`SequenceLock`] данные
///   методами [`SequenceLockGuard::get()`] и [`SequenceLockGuard::set()`] соответственно.
/// - Автоматически освобождает блокировку в реализации типажа [`Drop`].
pub struct SequenceLockGuard<'a, T: Copy> {
    /// Захваченный на запись [`SequenceLock`].
    sequence_lock: &'a SequenceLock<T>,
}

impl<T: Copy> SequenceLockGuard<'_, T> {
    /// Читает защищаемые [`SequenceLock`] данные.
    pub fn get(&self) -> T {
        unsafe { *self.sequence_lock.data.get() }
    }

    /// Записывает защищаемые [`SequenceLock`] данные.
    pub fn set(
        &mut self,
        value: T,
    ) {
        unsafe {
            atomic_memcpy::atomic_store(self.sequence_lock.data.get(), value, Ordering::Release);
        }
    }
}

impl<T: Copy> Drop for SequenceLockGuard<'_, T> {
    fn drop(&mut self) {
        self.sequence_lock.sequence.fetch_add(1, Ordering::Release);
    }
}
