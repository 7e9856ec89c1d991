use alloc::vec::Vec;

use crate::{
    cpu::CpuId,
    log::debug,
    platform::LocalIrq,
    sync::{
        IrqSpinlock,
        IrqSpinlockGuard,
    },
};

use super::TimerBackend;

/// Реестр зарегистрированных таймеров,
/// упорядоченный по убыванию [`TimerBackend::rating()`].
///
/// Таймеры с равной оценкой идут в порядке регистрации.
/// Таймеры никогда не удаляются из реестра.
pub struct Registry {
    /// Таймеры в порядке убывания оценки.
    timers: IrqSpinlock<Vec<&'static TimerBackend>>,
}

impl Registry {
    /// Создаёт пустой реестр.
    #[track_caller]
    pub const fn new() -> Self {
        Self {
            timers: IrqSpinlock::new(Vec::new()),
        }
    }

    /// Добавляет `timer` в реестр после всех таймеров с не меньшей оценкой.
    /// Прерывания на время вставки запрещаются через `irq`.
    pub fn insert<I: LocalIrq + ?Sized>(
        &self,
        timer: &'static TimerBackend,
        irq: &I,
    ) {
        let mut timers = self.timers.lock(irq);
        let position = timers.partition_point(|other| other.rating() >= timer.rating());
        timers.insert(position, timer);

        debug!(timer = timer.name(), position, count = timers.len(), "inserted into the registry");
    }

    /// Снимок реестра в порядке убывания оценки.
    pub fn timers<I: LocalIrq + ?Sized>(
        &self,
        irq: &I,
    ) -> Vec<&'static TimerBackend> {
        self.timers.lock(irq).clone()
    }

    /// Лучший таймер реестра, который доступен на процессоре `cpu`.
    pub fn find<I: LocalIrq + ?Sized>(
        &self,
        cpu: CpuId,
        irq: &I,
    ) -> Option<&'static TimerBackend> {
        find(&self.timers.lock(irq), cpu)
    }

    /// Захватывает реестр, запрещая прерывания через `irq`.
    pub(crate) fn lock<'a, I: LocalIrq + ?Sized>(
        &'a self,
        irq: &'a I,
    ) -> IrqSpinlockGuard<'a, Vec<&'static TimerBackend>, I> {
        self.timers.lock(irq)
    }
}

impl Default for Registry {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

/// Первый в порядке `timers` таймер, который обслуживает процессор `cpu`
/// и устройство которого не выключено.
pub(crate) fn find(
    timers: &[&'static TimerBackend],
    cpu: CpuId,
) -> Option<&'static TimerBackend> {
    timers.iter().find(|timer| timer.covers(cpu) && timer.is_available()).copied()
}
