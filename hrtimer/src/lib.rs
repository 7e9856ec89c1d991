//! Виртуализация аппаратных таймеров для
//! [со-ядра](https://en.wikipedia.org/wiki/Adeos) реального времени.
//!
//! На каждом процессоре есть одно физическое устройство таймера,
//! которое делят между собой:
//!   - ядро общего назначения (host domain), планировщик которого использует его для тика;
//!   - домен реального времени (head domain), которому нужны точные одноразовые дедлайны.
//!
//! Эта библиотека выбирает для каждого процессора лучший доступный таймер,
//! перехватывает у host domain его устройство [`clock_event::ClockEventDevice`]
//! и программирует дедлайны head domain напрямую, а при отключении head domain
//! возвращает устройство обратно в исходном состоянии.

#![no_std]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(missing_docs)]

extern crate alloc;

/// Устройства событий таймера ядра общего назначения ---
/// [clock event devices](https://docs.kernel.org/timers/highres.html).
pub mod clock_event;

/// Настройки [`HrTimers`].
pub mod config;

/// Номера процессоров [`CpuId`] и множества процессоров [`CpuMask`].
pub mod cpu;

/// Перечисление для возможных ошибок [`Error`] и соответствующий [`Result`].
pub mod error;

/// Поддержка журналирования макросами библиотеки [`tracing`].
pub mod log;

/// Интерфейсы окружения, которые библиотека использует, но не реализует.
pub mod platform;

/// Примитивы синхронизации [`sync::Spinlock`], [`sync::IrqSpinlock`] и [`sync::SequenceLock`].
pub mod sync;

/// Частоты и перевод отсчётов между доменами разной частоты.
pub mod time;

/// Реестр таймеров, их выбор, перехват и программирование дедлайнов.
pub mod timer;

pub use clock_event::{
    ClockEventDevice,
    Features,
    Mode,
    TickSource,
    TickSourceSnapshot,
};
pub use config::Config;
pub use cpu::{
    CpuId,
    CpuMask,
};
pub use error::{
    Error,
    Result,
};
pub use platform::{
    Domain,
    Irq,
    IrqChip,
    LocalIrq,
    Platform,
    TickHandler,
};
pub use time::{
    Hz,
    Ratio,
};
pub use timer::{
    ActiveTimer,
    HrTimers,
    Registry,
    TimerBackend,
    TimerHardware,
};
