use core::fmt;

use crate::{
    clock_event::{
        ClockEventDevice,
        Mode,
        TickSource,
    },
    cpu::{
        CpuId,
        CpuMask,
    },
    error::{
        Error::InvalidArgument,
        Result,
    },
    platform::Irq,
    time::Hz,
};

// Used in docs.
#[allow(unused)]
use crate::error::Error;

/// Аппаратная часть таймера, которую head domain программирует напрямую.
pub trait TimerHardware: Sync {
    /// Программирует прерывание через `ticks` собственных тиков таймера.
    ///
    /// Возвращает ошибку [`Error::ProgramFailed`], если таймер не может выполнить запрос,
    /// например потому что дедлайн уже в прошлом.
    fn set(
        &self,
        ticks: u64,
    ) -> Result<()>;

    /// Подтверждает прерывание на уровне таймера.
    fn ack(&self) {
    }

    /// Специфичная для таймера подготовка при его захвате head domain'ом.
    /// Вызывается после того как обработано устройство ядра общего назначения, если оно есть.
    #[allow(unused_variables)]
    fn request(
        &self,
        steal: bool,
    ) {
    }

    /// Специфичная для таймера работа при его возврате ядру общего назначения.
    fn release(&self) {
    }
}

/// Через что программируется таймер.
#[derive(Clone, Copy)]
enum Hardware {
    /// Собственная реализация таймера.
    Native(&'static dyn TimerHardware),

    /// Исходная привязка устройства ядра общего назначения,
    /// запомненная до его возможного перехвата.
    Host(&'static dyn TickSource),
}

/// Аппаратный таймер, доступный на одном или нескольких процессорах.
///
/// Регистрируется один раз через [`crate::HrTimers::register()`] и больше не уничтожается.
/// После регистрации не меняется.
pub struct TimerBackend {
    /// Имя таймера.
    name: &'static str,

    /// Оценка качества таймера, чем больше, тем предпочтительнее.
    rating: u32,

    /// Линия прерывания таймера.
    irq: Irq,

    /// Собственная частота таймера.
    frequency: Hz,

    /// Минимальная задержка, которую можно запрограммировать, в собственных тиках таймера.
    min_delay_ticks: u64,

    /// Процессоры, на которых доступен таймер.
    /// Если не задано, при регистрации подставляется регистрирующий процессор.
    cpumask: Option<CpuMask>,

    /// Через что программируется таймер.
    hardware: Hardware,

    /// Устройство ядра общего назначения, которое использует этот таймер.
    host: Option<&'static ClockEventDevice>,
}

impl TimerBackend {
    /// Создаёт таймер с собственной реализацией `hardware`.
    pub const fn new(
        name: &'static str,
        rating: u32,
        irq: Irq,
        frequency: Hz,
        hardware: &'static dyn TimerHardware,
    ) -> Self {
        Self {
            name,
            rating,
            irq,
            frequency,
            min_delay_ticks: 0,
            cpumask: None,
            hardware: Hardware::Native(hardware),
            host: None,
        }
    }

    /// Создаёт таймер поверх устройства ядра общего назначения `device`
    /// с линией прерывания `irq`.
    ///
    /// Имя, оценка и процессоры берутся у устройства,
    /// частота и минимальная задержка вычисляются по его множителю и сдвигу.
    /// Head domain программирует таймер через текущую привязку устройства,
    /// которая остаётся в силе и после перехвата устройства.
    ///
    /// Возвращает ошибку [`Error::InvalidArgument`], если устройство уже перехвачено
    /// или его частота меньше одного Герца.
    pub fn from_host(
        device: &'static ClockEventDevice,
        irq: Irq,
    ) -> Result<Self> {
        if device.is_stolen() {
            return Err(InvalidArgument);
        }

        let binding = device.binding();
        let frequency = device.frequency().ok_or(InvalidArgument)?;

        Ok(Self {
            name: device.name(),
            rating: device.rating(),
            irq,
            frequency,
            min_delay_ticks: device.min_delta_ticks(),
            cpumask: Some(device.cpumask()),
            hardware: Hardware::Host(binding.source()),
            host: Some(device),
        })
    }

    /// Задаёт оценку качества таймера.
    pub const fn with_rating(
        mut self,
        rating: u32,
    ) -> Self {
        self.rating = rating;
        self
    }

    /// Задаёт процессоры, на которых доступен таймер.
    pub const fn with_cpumask(
        mut self,
        cpumask: CpuMask,
    ) -> Self {
        self.cpumask = Some(cpumask);
        self
    }

    /// Задаёт минимальную задержку в собственных тиках таймера.
    pub const fn with_min_delay_ticks(
        mut self,
        min_delay_ticks: u64,
    ) -> Self {
        self.min_delay_ticks = min_delay_ticks;
        self
    }

    /// Связывает таймер с устройством ядра общего назначения `device`,
    /// которое head domain перехватывает при захвате таймера.
    pub const fn with_host(
        mut self,
        device: &'static ClockEventDevice,
    ) -> Self {
        self.host = Some(device);
        self
    }

    /// Имя таймера.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Оценка качества таймера.
    pub fn rating(&self) -> u32 {
        self.rating
    }

    /// Линия прерывания таймера.
    pub fn irq(&self) -> Irq {
        self.irq
    }

    /// Собственная частота таймера.
    pub fn frequency(&self) -> Hz {
        self.frequency
    }

    /// Минимальная задержка в собственных тиках таймера.
    pub fn min_delay_ticks(&self) -> u64 {
        self.min_delay_ticks
    }

    /// Процессоры, на которых доступен таймер.
    pub fn cpumask(&self) -> Option<CpuMask> {
        self.cpumask
    }

    /// Устройство ядра общего назначения, которое использует этот таймер.
    pub fn host(&self) -> Option<&'static ClockEventDevice> {
        self.host
    }

    /// Возвращает `true`, если таймер доступен на процессоре `cpu`.
    pub fn covers(
        &self,
        cpu: CpuId,
    ) -> bool {
        self.cpumask.is_some_and(|cpumask| cpumask.contains(cpu))
    }

    /// Возвращает `false`, если устройство ядра общего назначения выключено
    /// и перехватывать его бессмысленно.
    pub fn is_available(&self) -> bool {
        self.host.is_none_or(|device| device.mode() != Mode::Shutdown)
    }

    /// Подставляет значения по умолчанию для незаданных при создании полей.
    pub(crate) fn normalize(
        &mut self,
        current_cpu: CpuId,
    ) {
        self.cpumask.get_or_insert(CpuMask::of(current_cpu));
    }

    /// Программирует прерывание через `ticks` собственных тиков таймера.
    pub(crate) fn set(
        &self,
        ticks: u64,
    ) -> Result<()> {
        match self.hardware {
            Hardware::Native(hardware) => hardware.set(ticks),
            Hardware::Host(source) => source.program(ticks),
        }
    }

    /// Подтверждает прерывание на уровне таймера.
    pub(crate) fn ack(&self) {
        match self.hardware {
            Hardware::Native(hardware) => hardware.ack(),
            Hardware::Host(source) => source.acknowledge(),
        }
    }

    /// Специфичная для таймера подготовка при захвате.
    pub(crate) fn hardware_request(
        &self,
        steal: bool,
    ) {
        if let Hardware::Native(hardware) = self.hardware {
            hardware.request(steal);
        }
    }

    /// Специфичная для таймера работа при возврате.
    pub(crate) fn hardware_release(&self) {
        if let Hardware::Native(hardware) = self.hardware {
            hardware.release();
        }
    }
}

impl fmt::Debug for TimerBackend {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        formatter
            .debug_struct("TimerBackend")
            .field("name", &self.name)
            .field("rating", &self.rating)
            .field("irq", &self.irq)
            .field("frequency", &format_args!("{}", self.frequency))
            .field("min_delay_ticks", &self.min_delay_ticks)
            .field("cpumask", &self.cpumask)
            .field("host", &self.host.map(ClockEventDevice::name))
            .finish()
    }
}
