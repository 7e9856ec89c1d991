use crate::time::Hz;

// Used in docs.
#[allow(unused)]
use crate::{
    Ratio,
    timer::HrTimers,
};

/// Частота тика ядра общего назначения по умолчанию, аналог `HZ`.
pub const DEFAULT_HOST_TICK_HZ: u32 = 100;

/// Настройки [`HrTimers`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Частота часов head domain, в тактах которых задаются задержки [`HrTimers::program()`].
    ///
    /// Если [`None`], задержки задаются в логических тиках,
    /// частоту которых фиксирует первый выбранный таймер.
    /// Тогда [`Ratio`] каждого процессора переводит логические тики в собственные тики его таймера.
    pub clock_frequency: Option<Hz>,

    /// Частота тика ядра общего назначения.
    ///
    /// Определяет первый "осторожный" дедлайн, который программируется
    /// при переводе устройства в однократный режим:
    /// один тик ядра общего назначения, то есть `frequency / host_tick_hz` тиков таймера.
    pub host_tick_hz: u32,
}

impl Config {
    /// Возвращает [`Config`] с частотой часов head domain `clock_frequency`.
    pub fn with_clock(clock_frequency: Hz) -> Self {
        Self {
            clock_frequency: Some(clock_frequency),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            host_tick_hz: DEFAULT_HOST_TICK_HZ,
        }
    }
}
