use alloc::boxed::Box;
use core::sync::atomic::{
    AtomicU64,
    Ordering,
};

use scopeguard::ScopeGuard;

use crate::{
    clock_event::{
        ClockEventDevice,
        Mode,
        TickSource,
    },
    config::Config,
    cpu::{
        CpuId,
        CpuMask,
        MAX_CPU_COUNT,
    },
    error::{
        Error::{
            NoTimer,
            NoTimerFound,
        },
        Result,
    },
    log::{
        debug,
        error,
        info,
        trace,
        warn,
    },
    platform::{
        Domain,
        Irq,
        IrqChip,
        Platform,
        TickHandler,
    },
    sync::SequenceLock,
    time::{
        self,
        Hz,
        Ratio,
    },
};

// Used in docs.
#[allow(unused)]
use crate::error::Error;

pub use backend::{
    TimerBackend,
    TimerHardware,
};
pub use registry::Registry;

/// Описание аппаратного таймера [`TimerBackend`] и его аппаратной части [`TimerHardware`].
mod backend;

/// Реестр таймеров [`Registry`].
mod registry;

/// Передача таймера между ядром общего назначения и head domain.
mod takeover;

/// Таймер, выбранный для процессора, вместе с коэффициентами перевода задержек
/// из часов head domain в его собственные тики.
#[derive(Clone, Copy, Debug)]
pub struct ActiveTimer {
    /// Выбранный таймер.
    timer: &'static TimerBackend,

    /// Перевод задержек в собственные тики таймера.
    ratio: Ratio,
}

impl ActiveTimer {
    /// Выбранный таймер.
    pub fn timer(&self) -> &'static TimerBackend {
        self.timer
    }

    /// Перевод задержек в собственные тики таймера.
    pub fn ratio(&self) -> Ratio {
        self.ratio
    }
}

/// Арбитр аппаратных таймеров между head domain и ядром общего назначения.
///
/// Таймеры регистрируются в [`HrTimers::register()`] и живут до конца работы системы.
/// [`HrTimers::select()`] выбирает для каждого процессора лучший доступный таймер
/// и забирает его у ядра общего назначения, а [`HrTimers::release_all()`] возвращает.
/// Между ними [`HrTimers::program()`] программирует дедлайны head domain.
pub struct HrTimers<P: Platform> {
    /// Окружение.
    platform: P,

    /// Настройки.
    config: Config,

    /// Реализация, на которую перенаправляются перехваченные устройства ядра общего назначения.
    emulation: &'static dyn TickSource,

    /// Зарегистрированные таймеры.
    registry: Registry,

    /// Выбранные таймеры процессоров.
    /// Пишутся только при выборе и освобождении,
    /// а читаются без блокировки на горячем пути [`HrTimers::program()`].
    active: [SequenceLock<Option<ActiveTimer>>; MAX_CPU_COUNT],

    /// Частота логических тиков в Герцах, которую фиксирует первый выбранный таймер.
    /// Ноль, пока таймеры не выбраны.
    frequency: AtomicU64,
}

impl<P: Platform> HrTimers<P> {
    /// Создаёт арбитр без зарегистрированных таймеров.
    ///
    /// Перехваченные устройства ядра общего назначения перенаправляются на `emulation`,
    /// которая получает их задержки в наносекундах.
    pub fn new(
        platform: P,
        config: Config,
        emulation: &'static dyn TickSource,
    ) -> Self {
        Self {
            platform,
            config,
            emulation,
            registry: Registry::new(),
            active: [const { SequenceLock::new(None) }; MAX_CPU_COUNT],
            frequency: AtomicU64::new(0),
        }
    }

    /// Окружение.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Настройки.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Зарегистрированные таймеры.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Регистрирует `timer`.
    ///
    /// Если для таймера не заданы процессоры,
    /// он считается доступным только на процессоре, выполняющем регистрацию.
    pub fn register(
        &self,
        timer: &'static mut TimerBackend,
    ) {
        timer.normalize(self.platform.current_cpu());
        let timer: &'static TimerBackend = timer;

        debug!(
            timer = timer.name(),
            rating = timer.rating(),
            frequency = %timer.frequency(),
            irq = %timer.irq(),
            cpumask = ?timer.cpumask(),
            "register",
        );

        self.registry.insert(timer, &self.platform);
    }

    /// Регистрирует таймер поверх устройства ядра общего назначения `device`
    /// с линией прерывания `irq`, см. [`TimerBackend::from_host()`].
    pub fn register_host(
        &self,
        device: &'static ClockEventDevice,
        irq: Irq,
    ) -> Result<()> {
        let timer = TimerBackend::from_host(device, irq)?;
        self.register(Box::leak(Box::new(timer)));

        Ok(())
    }

    /// Выбирает таймер для каждого процессора из `cpus` и забирает его у ядра общего назначения.
    ///
    /// Каждый процессор получает лучший по оценке таймер, который его обслуживает
    /// и устройство которого не выключено.
    /// Частоту логических тиков фиксирует таймер первого процессора.
    /// Сам захват таймера выполняется на его процессоре в [`Platform::run_exclusively()`].
    ///
    /// Возвращает ошибку [`Error::NoTimerFound`], если хотя бы для одного процессора
    /// таймер не нашёлся. Тогда ни один процессор из `cpus` не остаётся с выбранным таймером.
    pub fn select(
        &self,
        cpus: CpuMask,
    ) -> Result<()> {
        {
            let timers = self.registry.lock(&self.platform);
            let rollback = scopeguard::guard((), |()| self.clear(cpus));

            for cpu in cpus.iter() {
                let timer = registry::find(&timers, cpu).ok_or_else(|| {
                    error!(cpu, "could not find a timer");
                    NoTimerFound(cpu)
                })?;

                let frequency = self.fix_frequency(timer.frequency());
                let clock = self.config.clock_frequency.unwrap_or(frequency);
                let ratio = Ratio::new(clock, timer.frequency());

                self.active[usize::from(cpu)].write_lock().set(Some(ActiveTimer { timer, ratio }));
            }

            ScopeGuard::into_inner(rollback);
        }

        for cpu in cpus.iter() {
            self.platform.run_exclusively(cpu, &mut || self.request(cpu));

            if let Some(active) = self.active(cpu) {
                info!(
                    cpu,
                    timer = active.timer.name(),
                    frequency = %active.timer.frequency(),
                    ratio = ?active.ratio,
                    "selected",
                );
            }
        }

        Ok(())
    }

    /// Возвращает все выбранные таймеры ядру общего назначения
    /// и забывает частоту логических тиков.
    ///
    /// Повторный вызов ничего не делает.
    pub fn release_all(&self) {
        let cpus = CpuMask::first(self.platform.cpu_count().min(MAX_CPU_COUNT));

        for cpu in cpus.iter() {
            if self.active(cpu).is_some() {
                self.platform.run_exclusively(cpu, &mut || self.release(cpu));
            }
        }

        self.clear(cpus);
    }

    /// Подключает `handler` к линии прерывания таймера процессора `cpu` в head domain.
    ///
    /// Если таймер процессора `cpu` делит линию прерывания с таймером нулевого процессора,
    /// обработчик не подключается повторно.
    ///
    /// Возвращает режим, который ядро общего назначения установило устройству таймера,
    /// или [`Mode::Unused`], если таймер не связан с устройством ядра общего назначения.
    ///
    /// Возвращает ошибки:
    ///   - [`Error::NoTimer`], если для процессора не выбран таймер;
    ///   - ошибку [`Platform::request_irq()`], если платформа отказалась подключить обработчик.
    pub fn start(
        &self,
        cpu: CpuId,
        handler: TickHandler,
    ) -> Result<Mode> {
        let active = self.active(cpu).ok_or(NoTimer(cpu))?;
        let irq = active.timer.irq();
        let shared = self.shares_irq_with_boot_cpu(cpu, irq);

        let mut result = Ok(Mode::Unused);
        self.platform.run_exclusively(cpu, &mut || {
            result = if shared {
                Ok(())
            } else {
                self.platform.request_irq(Domain::Head, irq, handler)
            }
            .map(|()| active.timer.host().map_or(Mode::Unused, ClockEventDevice::mode));
        });

        match &result {
            Ok(mode) => info!(cpu, timer = active.timer.name(), %irq, ?mode, "started"),
            Err(error) => warn!(cpu, timer = active.timer.name(), %irq, ?error, "failed to start"),
        }

        result
    }

    /// Отключает обработчик head domain от линии прерывания таймера процессора `cpu`.
    ///
    /// Ничего не делает, если для процессора не выбран таймер.
    pub fn stop(
        &self,
        cpu: CpuId,
    ) {
        let Some(active) = self.active(cpu) else {
            return;
        };
        let irq = active.timer.irq();

        if !self.shares_irq_with_boot_cpu(cpu, irq) {
            self.platform.run_exclusively(cpu, &mut || {
                self.platform.free_irq(Domain::Head, irq);
            });
        }

        info!(cpu, timer = active.timer.name(), %irq, "stopped");
    }

    /// Программирует на текущем процессоре прерывание через `delay` тиков часов head domain.
    ///
    /// Задержка ограничивается сверху [`u32::MAX`] и переводится в тики таймера.
    /// Если она меньше минимальной для таймера или таймер отказался её принять,
    /// прерывание возбуждается программно и обработчик head domain всё равно будет вызван.
    ///
    /// Вызывается с запрещёнными прерываниями.
    #[inline]
    pub fn program(
        &self,
        delay: u64,
    ) {
        let cpu = self.platform.current_cpu();

        let Some(active) = self.active(cpu) else {
            error!(cpu, delay, "no timer selected");
            return;
        };

        let delay = u32::try_from(delay).unwrap_or(u32::MAX);
        let ticks = active.ratio.apply(delay);
        let timer = active.timer;

        if ticks < timer.min_delay_ticks() || timer.set(ticks).is_err() {
            trace!(cpu, ticks, timer = timer.name(), "raising the timer interrupt");
            self.platform.raise_irq(timer.irq());
        }
    }

    /// Подтверждает прерывание таймера `irq` текущего процессора:
    /// сначала на контроллере `chip`, затем на самом таймере,
    /// и наконец сообщает контроллеру о завершении обработки.
    pub fn ack_irq(
        &self,
        irq: Irq,
        chip: Option<&dyn IrqChip>,
    ) {
        if let Some(chip) = chip {
            chip.ack(irq);
        }

        if let Some(active) = self.active(self.platform.current_cpu()) {
            active.timer.ack();
        }

        if let Some(chip) = chip {
            chip.end(irq);
        }
    }

    /// Таймер, выбранный для процессора `cpu`.
    pub fn active(
        &self,
        cpu: CpuId,
    ) -> Option<ActiveTimer> {
        self.active.get(usize::from(cpu))?.read()
    }

    /// Частота логических тиков или [`None`], если таймеры не выбраны.
    pub fn frequency(&self) -> Option<Hz> {
        Hz::new(self.frequency.load(Ordering::Acquire))
    }

    /// Имя таймера нулевого процессора.
    pub fn name(&self) -> Option<&'static str> {
        self.active(0).map(|active| active.timer.name())
    }

    /// Линия прерывания таймера процессора `cpu`.
    pub fn irq(
        &self,
        cpu: CpuId,
    ) -> Option<Irq> {
        self.active(cpu).map(|active| active.timer.irq())
    }

    /// Переводит `ns` наносекунд в логические тики.
    /// Возвращает [`None`], если таймеры не выбраны.
    pub fn ns_to_ticks(
        &self,
        ns: u64,
    ) -> Option<u64> {
        self.frequency().map(|frequency| time::ns_to_ticks(ns, frequency))
    }

    /// Переводит `ticks` логических тиков в наносекунды.
    /// Возвращает [`None`], если таймеры не выбраны.
    pub fn ticks_to_ns(
        &self,
        ticks: u64,
    ) -> Option<u64> {
        self.frequency().map(|frequency| time::ticks_to_ns(ticks, frequency))
    }

    /// Фиксирует частоту логических тиков, если она ещё не зафиксирована.
    /// Возвращает зафиксированную частоту.
    fn fix_frequency(
        &self,
        frequency: Hz,
    ) -> Hz {
        match self.frequency.compare_exchange(
            0,
            frequency.get(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => frequency,
            Err(fixed) => Hz::new(fixed).unwrap_or(frequency),
        }
    }

    /// Забывает выбранные таймеры процессоров `cpus` и частоту логических тиков.
    fn clear(
        &self,
        cpus: CpuMask,
    ) {
        for cpu in cpus.iter() {
            if let Some(active) = self.active.get(usize::from(cpu)) {
                active.write_lock().set(None);
            }
        }

        self.frequency.store(0, Ordering::Release);
    }

    /// Забирает таймер процессора `cpu` у ядра общего назначения.
    /// Выполняется на процессоре `cpu`.
    fn request(
        &self,
        cpu: CpuId,
    ) {
        if let Some(active) = self.active(cpu) {
            let steal = active.timer.host().is_none_or(|device| device.mode() != Mode::Unused);
            takeover::request(active.timer, steal, self.emulation, self.config.host_tick_hz);
        }
    }

    /// Возвращает таймер процессора `cpu` ядру общего назначения.
    /// Выполняется на процессоре `cpu`.
    fn release(
        &self,
        cpu: CpuId,
    ) {
        if let Some(active) = self.active(cpu) {
            takeover::release(active.timer, self.config.host_tick_hz);
        }
    }

    /// Возвращает `true`, если `cpu` не нулевой процессор
    /// и линия прерывания `irq` его таймера совпадает с линией таймера нулевого процессора.
    fn shares_irq_with_boot_cpu(
        &self,
        cpu: CpuId,
        irq: Irq,
    ) -> bool {
        cpu != 0 && self.irq(0) == Some(irq)
    }
}
