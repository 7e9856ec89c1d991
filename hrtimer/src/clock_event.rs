use core::{
    fmt,
    ptr,
};

use bitflags::bitflags;

use crate::{
    cpu::CpuMask,
    error::Result,
    sync::Spinlock,
    time::Hz,
};

bitflags! {
    /// Возможности устройства событий таймера.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Features: u32 {
        /// Устройство умеет генерировать периодические прерывания.
        const PERIODIC = 1 << 0;

        /// Устройство умеет генерировать однократное прерывание через заданное время.
        const ONESHOT = 1 << 1;
    }
}

/// Режим работы устройства событий таймера.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Устройство не используется ядром общего назначения.
    Unused,

    /// Устройство выключено.
    Shutdown,

    /// Периодические прерывания.
    Periodic,

    /// Однократное прерывание через заданное время.
    Oneshot,

    /// Устройство возобновляет работу после приостановки.
    Resume,
}

/// Реализация управления устройством событий таймера.
///
/// Устройство [`ClockEventDevice`] всегда привязано ровно к одной реализации.
/// Перехват устройства head domain'ом заключается в замене этой привязки.
pub trait TickSource: Sync {
    /// Переводит устройство в режим `mode`.
    fn set_mode(
        &self,
        mode: Mode,
    );

    /// Программирует прерывание через `delta` тиков.
    ///
    /// Единицы `delta` зависят от множителя и сдвига устройства,
    /// см. [`ClockEventDevice::set_next_event()`].
    fn program(
        &self,
        delta: u64,
    ) -> Result<()>;

    /// Подтверждает прерывание на уровне самого устройства.
    fn acknowledge(&self) {
    }
}

/// Привязка устройства [`ClockEventDevice`] к реализации [`TickSource`]
/// вместе с множителем и сдвигом перевода наносекунд в тики.
#[derive(Clone, Copy)]
pub struct TickSourceSnapshot {
    /// Множитель перевода наносекунд в тики.
    mult: u32,

    /// Сдвиг перевода наносекунд в тики.
    shift: u32,

    /// Реализация управления устройством.
    source: &'static dyn TickSource,
}

impl TickSourceSnapshot {
    /// Множитель перевода наносекунд в тики.
    pub fn mult(&self) -> u32 {
        self.mult
    }

    /// Сдвиг перевода наносекунд в тики.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Реализация управления устройством.
    pub fn source(&self) -> &'static dyn TickSource {
        self.source
    }
}

impl PartialEq for TickSourceSnapshot {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.mult == other.mult &&
            self.shift == other.shift &&
            ptr::addr_eq(self.source, other.source)
    }
}

impl Eq for TickSourceSnapshot {
}

impl fmt::Debug for TickSourceSnapshot {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        formatter
            .debug_struct("TickSourceSnapshot")
            .field("mult", &self.mult)
            .field("shift", &self.shift)
            .field("source", &(self.source as *const dyn TickSource))
            .finish()
    }
}

/// Изменяемая часть состояния [`ClockEventDevice`].
#[derive(Clone, Copy, Debug)]
struct DeviceState {
    /// Режим, который последним установило ядро общего назначения.
    mode: Mode,

    /// Текущая привязка устройства.
    binding: TickSourceSnapshot,

    /// Исходная привязка, если устройство перехвачено head domain'ом.
    saved: Option<TickSourceSnapshot>,
}

/// Устройство событий таймера ядра общего назначения ---
/// [clock event device](https://docs.kernel.org/timers/highres.html).
///
/// Ядро общего назначения управляет им через
/// [`ClockEventDevice::set_mode()`] и [`ClockEventDevice::set_next_event()`],
/// не зная, перехвачено ли устройство.
pub struct ClockEventDevice {
    /// Имя устройства.
    name: &'static str,

    /// Оценка качества устройства, чем больше, тем лучше.
    rating: u32,

    /// Возможности устройства.
    features: Features,

    /// Процессоры, которые обслуживает устройство.
    cpumask: CpuMask,

    /// Минимальная задержка, которую устройство способно запрограммировать, в наносекундах.
    min_delta_ns: u64,

    /// Изменяемая часть состояния.
    state: Spinlock<DeviceState>,
}

impl ClockEventDevice {
    /// Создаёт устройство, которое переводит наносекунды в свои тики как
    /// `ticks = (ns * mult) >> shift`, и привязано к реализации `source`.
    /// Изначально устройство не используется --- [`Mode::Unused`].
    #[allow(clippy::too_many_arguments)]
    #[track_caller]
    pub const fn new(
        name: &'static str,
        rating: u32,
        features: Features,
        cpumask: CpuMask,
        mult: u32,
        shift: u32,
        min_delta_ns: u64,
        source: &'static dyn TickSource,
    ) -> Self {
        Self {
            name,
            rating,
            features,
            cpumask,
            min_delta_ns,
            state: Spinlock::new(DeviceState {
                mode: Mode::Unused,
                binding: TickSourceSnapshot {
                    mult,
                    shift,
                    source,
                },
                saved: None,
            }),
        }
    }

    /// Имя устройства.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Оценка качества устройства.
    pub fn rating(&self) -> u32 {
        self.rating
    }

    /// Возможности устройства.
    pub fn features(&self) -> Features {
        self.features
    }

    /// Процессоры, которые обслуживает устройство.
    pub fn cpumask(&self) -> CpuMask {
        self.cpumask
    }

    /// Минимальная задержка в наносекундах.
    pub fn min_delta_ns(&self) -> u64 {
        self.min_delta_ns
    }

    /// Режим, который последним установило ядро общего назначения.
    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    /// Текущая привязка устройства к реализации [`TickSource`].
    pub fn binding(&self) -> TickSourceSnapshot {
        self.state.lock().binding
    }

    /// Возвращает `true`, если устройство перехвачено head domain'ом.
    pub fn is_stolen(&self) -> bool {
        self.state.lock().saved.is_some()
    }

    /// Частота устройства согласно текущим множителю и сдвигу.
    pub fn frequency(&self) -> Option<Hz> {
        let binding = self.binding();
        Hz::from_mult_shift(binding.mult, binding.shift)
    }

    /// Минимальная задержка в тиках устройства согласно текущим множителю и сдвигу.
    pub fn min_delta_ticks(&self) -> u64 {
        let binding = self.binding();
        Self::ns_to_ticks(self.min_delta_ns, binding)
    }

    /// Запоминает и устанавливает режим `mode` от имени ядра общего назначения.
    pub fn set_mode(
        &self,
        mode: Mode,
    ) {
        let source = {
            let mut state = self.state.lock();
            state.mode = mode;
            state.binding.source
        };

        source.set_mode(mode);
    }

    /// Программирует прерывание через `delta_ns` наносекунд от имени ядра общего назначения.
    ///
    /// Привязанная реализация получает `(delta_ns * mult) >> shift` тиков.
    /// Пока устройство перехвачено, множитель равен единице, а сдвиг нулю,
    /// и head domain получает задержку в наносекундах.
    pub fn set_next_event(
        &self,
        delta_ns: u64,
    ) -> Result<()> {
        let binding = self.binding();
        binding.source.program(Self::ns_to_ticks(delta_ns, binding))
    }

    /// Подтверждает прерывание через привязанную реализацию.
    pub fn acknowledge(&self) {
        self.binding().source.acknowledge();
    }

    /// Перенаправляет устройство на реализацию `emulation` с единичным множителем и
    /// нулевым сдвигом. Возвращает исходную привязку, которая сохраняется до
    /// [`ClockEventDevice::restore()`].
    ///
    /// # Panics
    ///
    /// Паникует, если устройство уже перехвачено.
    pub(crate) fn steal(
        &self,
        emulation: &'static dyn TickSource,
    ) -> TickSourceSnapshot {
        let mut state = self.state.lock();

        assert!(
            state.saved.is_none(),
            "clock event device {} is already stolen",
            self.name,
        );

        let original = state.binding;
        state.saved = Some(original);
        state.binding = TickSourceSnapshot {
            mult: 1,
            shift: 0,
            source: emulation,
        };

        original
    }

    /// Возвращает устройству привязку, сохранённую в [`ClockEventDevice::steal()`].
    ///
    /// Возвращает восстановленную привязку или [`None`], если устройство не перехвачено.
    pub(crate) fn restore(&self) -> Option<TickSourceSnapshot> {
        let mut state = self.state.lock();

        let original = state.saved.take()?;
        state.binding = original;

        Some(original)
    }

    /// Переводит устройство в режим `mode`, не меняя запомненный режим ядра общего назначения.
    pub(crate) fn switch_mode(
        &self,
        mode: Mode,
    ) {
        self.binding().source.set_mode(mode);
    }

    /// Программирует прерывание через `ticks` тиков устройства, минуя перевод из наносекунд.
    pub(crate) fn program_ticks(
        &self,
        ticks: u64,
    ) -> Result<()> {
        self.binding().source.program(ticks)
    }

    /// Переводит `ns` в тики согласно привязке `binding`.
    fn ns_to_ticks(
        ns: u64,
        binding: TickSourceSnapshot,
    ) -> u64 {
        let ticks = (u128::from(ns) * u128::from(binding.mult)).checked_shr(binding.shift);
        ticks.and_then(|ticks| u64::try_from(ticks).ok()).unwrap_or(u64::MAX)
    }
}

impl fmt::Debug for ClockEventDevice {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        let state = *self.state.lock();

        formatter
            .debug_struct("ClockEventDevice")
            .field("name", &self.name)
            .field("rating", &self.rating)
            .field("cpumask", &self.cpumask)
            .field("mode", &state.mode)
            .field("stolen", &state.saved.is_some())
            .finish()
    }
}
