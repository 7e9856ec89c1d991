use core::{
    fmt,
    ops::{
        Deref,
        DerefMut,
    },
    panic::Location,
    sync::atomic::{
        AtomicUsize,
        Ordering,
    },
};

use crate::log::trace;

/// Спин-блокировка, которая позволяет синхронизировать доступ
/// к защищаемым ею данным из разных потоков исполнения.
///
/// <https://en.wikipedia.org/wiki/Spinlock>
///
/// Для избежания
/// [ложного совместного использования](https://en.wikipedia.org/wiki/False_sharing)
/// выровнена на размер линии кэша.
/// Точнее, на её
/// [удвоенный размер](https://docs.rs/crossbeam/latest/crossbeam/utils/struct.CachePadded.html#size-and-alignment).
///
/// # Examples
///
/// ```rust
/// # use hrtimer::sync::Spinlock;
/// #
/// let spinlock: Spinlock<i32> = Spinlock::new(42);
///
/// {
///     let mut lock = spinlock.lock();
///     *lock += 1;
///     assert!(spinlock.try_lock().is_none());
/// }
///
/// assert_eq!(*spinlock.lock(), 43);
/// ```
#[repr(align(128))]
pub struct Spinlock<T> {
    /// Данные, защищаемые спин-блокировкой.
    data: spin::Mutex<T>,

    /// Место кода, в котором определена переменная спин-блокировки.
    /// Используется для отладочной печати.
    defined: &'static Location<'static>,

    /// Количество захватов спин-блокировки.
    locks: AtomicUsize,
}

impl<T> Spinlock<T> {
    /// Создаёт новую спин-блокировку для защиты `data`.
    #[track_caller]
    pub const fn new(data: T) -> Self {
        Self {
            data: spin::Mutex::new(data),
            defined: Location::caller(),
            locks: AtomicUsize::new(0),
        }
    }

    /// Захватывает спин-блокировку.
    /// При этом ожидает в активном цикле освобождения блокировки, если она уже захвачена.
    ///
    /// Возвращает [`SpinlockGuard`], который:
    ///   - Позволяет читать и писать в защищаемые [`Spinlock`] данные
    ///     с помощью типажей [`Deref`] и [`DerefMut`] соответственно.
    ///   - Автоматически освобождает блокировку в реализации типажа [`Drop`].
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        self.locks.fetch_add(1, Ordering::Relaxed);

        SpinlockGuard {
            guard: self.data.lock(),
        }
    }

    /// Пытается захватить спин-блокировку.
    /// Если она уже захвачена, возвращает [`None`].
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        let guard = self.data.try_lock()?;
        self.locks.fetch_add(1, Ordering::Relaxed);

        Some(SpinlockGuard { guard })
    }

    /// Позволяет читать и писать в защищаемые [`Spinlock`] данные без блокирования в случае,
    /// если вызывающий код эксклюзивно владеет [`Spinlock`] --- `&mut self`.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: fmt::Debug> fmt::Debug for Spinlock<T> {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        write!(formatter, "Spinlock {{ defined: {}, ", self.defined)?;

        if let Some(data) = self.data.try_lock() {
            write!(formatter, "data: {:?}", *data)?;
        } else {
            write!(formatter, "<locked>")?;
        }

        write!(formatter, ", locks: {} }}", self.locks.load(Ordering::Relaxed))
    }
}

impl<T> Drop for Spinlock<T> {
    fn drop(&mut self) {
        trace!(spinlock = %self.defined, locks = self.locks.load(Ordering::Relaxed), "dropping");
    }
}

impl<T: Default> Default for Spinlock<T> {
    #[track_caller]
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Захваченный на запись [`Spinlock`].
///
/// - Позволяет читать и писать в защищаемые [`Spinlock`] данные
///   с помощью типажей [`Deref`] и [`DerefMut`] соответственно.
/// - Автоматически освобождает блокировку в реализации типажа [`Drop`].
pub struct SpinlockGuard<'a, T> {
    /// Захваченная блокировка библиотеки [`spin`].
    guard: spin::MutexGuard<'a, T>,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinlockGuard<'_, T> {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        write!(formatter, "{:?}", self.deref())
    }
}
