use derive_more::{
    Display,
    From,
    Into,
};

use crate::{
    cpu::CpuId,
    error::Result,
};

// Used in docs.
#[allow(unused)]
use crate::{
    error::Error,
    timer::HrTimers,
};

/// Номер линии прерывания.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq, PartialOrd)]
pub struct Irq(pub u32);

/// Домен, которому принадлежит обработчик прерывания.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Domain {
    /// Домен реального времени, который обслуживается первым.
    Head,

    /// Ядро общего назначения.
    Host,
}

/// Обработчик тика таймера head domain.
pub type TickHandler = fn(Irq);

/// Управление флагом разрешения прерываний текущего процессора.
pub trait LocalIrq {
    /// Запрещает прерывания на текущем процессоре.
    /// Возвращает `true`, если до этого они были разрешены.
    fn save_and_disable(&self) -> bool;

    /// Возвращает флаг разрешения прерываний в состояние,
    /// которое вернул соответствующий вызов [`LocalIrq::save_and_disable()`].
    fn restore(
        &self,
        were_enabled: bool,
    );
}

/// Контроллер прерываний, которому нужно подтверждать прерывания таймера.
pub trait IrqChip {
    /// Подтверждает получение прерывания `irq` на уровне контроллера.
    fn ack(
        &self,
        irq: Irq,
    );

    /// Сообщает контроллеру о завершении обработки прерывания `irq` ---
    /// [end of interrupt (EOI)](https://en.wikipedia.org/wiki/End_of_interrupt).
    fn end(
        &self,
        irq: Irq,
    );
}

/// Окружение, в котором работает [`HrTimers`].
pub trait Platform: LocalIrq + Sync {
    /// Количество процессоров в системе.
    fn cpu_count(&self) -> usize;

    /// Номер процессора, на котором исполняется вызывающий код.
    fn current_cpu(&self) -> CpuId;

    /// Программно возбуждает прерывание `irq` на текущем процессоре.
    /// Обработчик прерывания будет вызван так же, как при срабатывании таймера.
    fn raise_irq(
        &self,
        irq: Irq,
    );

    /// Однократно выполняет `f` на процессоре `cpu` с запрещёнными прерываниями.
    ///
    /// Остальные процессоры на это время либо остановлены,
    /// либо гарантированно не находятся внутри такой же критической секции.
    /// Возвращается после того как `f` отработала.
    fn run_exclusively(
        &self,
        cpu: CpuId,
        f: &mut dyn FnMut(),
    );

    /// Подключает `handler` к линии прерывания `irq` в домене `domain`.
    ///
    /// Платформа должна подтверждать прерывания таймера head domain через
    /// [`HrTimers::ack_irq()`].
    ///
    /// Возвращает ошибку [`Error::IrqBusy`], если линия уже занята.
    fn request_irq(
        &self,
        domain: Domain,
        irq: Irq,
        handler: TickHandler,
    ) -> Result<()>;

    /// Отключает обработчик линии прерывания `irq` в домене `domain`.
    fn free_irq(
        &self,
        domain: Domain,
        irq: Irq,
    );
}
