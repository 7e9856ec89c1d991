use core::ops::{
    Deref,
    DerefMut,
};

use crate::platform::LocalIrq;

use super::{
    Spinlock,
    SpinlockGuard,
};

/// Спин-блокировка, которая позволяет синхронизировать доступ
/// к защищаемым ею данным как из обычного кода, так и из обработчика прерываний.
/// В остальном аналогична [`Spinlock`].
///
/// Прерывания запрещаются через [`LocalIrq`] окружения, который передаётся при захвате.
pub struct IrqSpinlock<T>(Spinlock<T>);

impl<T> IrqSpinlock<T> {
    /// Создаёт новую спин-блокировку для защиты `data`.
    #[track_caller]
    pub const fn new(data: T) -> Self {
        Self(Spinlock::new(data))
    }

    /// Запрещает прерывания с помощью `irq` и захватывает спин-блокировку.
    /// При этом ожидает в активном цикле освобождения блокировки, если она уже захвачена.
    ///
    /// Возвращает [`IrqSpinlockGuard`], который:
    ///   - Позволяет читать и писать в защищаемые [`IrqSpinlock`] данные
    ///     с помощью типажей [`Deref`] и [`DerefMut`] соответственно.
    ///   - Автоматически освобождает блокировку в реализации типажа [`Drop`],
    ///     а затем возвращает флаг разрешения прерываний в исходное состояние.
    pub fn lock<'a, I: LocalIrq + ?Sized>(
        &'a self,
        irq: &'a I,
    ) -> IrqSpinlockGuard<'a, T, I> {
        let irq_guard = IrqGuard::new(irq);

        IrqSpinlockGuard {
            spinlock_guard: self.0.lock(),
            irq_guard,
        }
    }
}

impl<T> Deref for IrqSpinlock<T> {
    type Target = Spinlock<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for IrqSpinlock<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Вспомогательная структура для [`IrqSpinlock`].
///
/// - Запоминает состояние флага разрешения прерываний в момент создания.
/// - После чего запрещает прерывания.
/// - Автоматически возвращает флаг разрешения прерываний
///   в исходное состояние в реализации типажа [`Drop`].
pub(crate) struct IrqGuard<'a, I: LocalIrq + ?Sized> {
    /// Управление прерываниями текущего процессора.
    irq: &'a I,

    /// Были ли разрешены прерывания в момент создания [`IrqGuard`].
    were_enabled: bool,
}

impl<'a, I: LocalIrq + ?Sized> IrqGuard<'a, I> {
    /// Создаёт [`IrqGuard`], запрещая прерывания.
    pub(crate) fn new(irq: &'a I) -> Self {
        let were_enabled = irq.save_and_disable();
        Self { irq, were_enabled }
    }
}

impl<I: LocalIrq + ?Sized> Drop for IrqGuard<'_, I> {
    fn drop(&mut self) {
        self.irq.restore(self.were_enabled);
    }
}

/// Захваченный на запись [`IrqSpinlock`].
pub struct IrqSpinlockGuard<'a, T, I: LocalIrq + ?Sized> {
    /// Захваченный на запись [`Spinlock`].
    spinlock_guard: SpinlockGuard<'a, T>,

    /// Должен быть после [`IrqSpinlockGuard::spinlock_guard`],
    /// чтобы при разрушении [`IrqSpinlockGuard`] сначала освободилась спин-блокировка,
    /// а уже потом включились прерывания.
    #[allow(dead_code)]
    irq_guard: IrqGuard<'a, I>,
}

impl<T, I: LocalIrq + ?Sized> Deref for IrqSpinlockGuard<'_, T, I> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.spinlock_guard.deref()
    }
}

impl<T, I: LocalIrq + ?Sized> DerefMut for IrqSpinlockGuard<'_, T, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.spinlock_guard.deref_mut()
    }
}
