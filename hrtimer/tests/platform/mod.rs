#![allow(dead_code)]

use std::{
    cell::Cell,
    sync::{
        Mutex,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
};

use hrtimer::{
    ClockEventDevice,
    CpuId,
    CpuMask,
    Domain,
    Error,
    Features,
    Irq,
    IrqChip,
    LocalIrq,
    Mode,
    Platform,
    Result,
    TickSource,
    TimerHardware,
};

thread_local! {
    static CURRENT_CPU: Cell<CpuId> = const { Cell::new(0) };
    static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Процессор, от имени которого исполняется текущий поток.
pub fn current_cpu() -> CpuId {
    CURRENT_CPU.with(Cell::get)
}

/// Разрешены ли прерывания на текущем процессоре.
pub fn irq_enabled() -> bool {
    IRQ_ENABLED.with(Cell::get)
}

/// Выполняет `f` от имени процессора `cpu`.
pub fn on_cpu<T>(
    cpu: CpuId,
    f: impl FnOnce() -> T,
) -> T {
    let previous = CURRENT_CPU.with(|current| current.replace(cpu));
    let result = f();
    CURRENT_CPU.with(|current| current.set(previous));
    result
}

pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformEvent {
    Exclusive {
        cpu: CpuId,
    },
    Raise {
        cpu: CpuId,
        irq: Irq,
    },
    RequestIrq {
        cpu: CpuId,
        domain: Domain,
        irq: Irq,
    },
    FreeIrq {
        cpu: CpuId,
        domain: Domain,
        irq: Irq,
    },
}

/// Окружение, в котором процессоры моделируются потоками,
/// а атомарная секция на процессоре --- глобальной блокировкой.
pub struct TestPlatform {
    cpu_count: usize,
    exclusive: Mutex<()>,
    events: Mutex<Vec<PlatformEvent>>,
    busy: Mutex<Vec<Irq>>,
}

impl TestPlatform {
    pub fn new(cpu_count: usize) -> Self {
        Self {
            cpu_count,
            exclusive: Mutex::new(()),
            events: Mutex::new(Vec::new()),
            busy: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn take_events(&self) -> Vec<PlatformEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn raised(&self) -> Vec<Irq> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlatformEvent::Raise { irq, .. } => Some(irq),
                _ => None,
            })
            .collect()
    }

    /// Запрещает подключать обработчики к линии `irq`.
    pub fn set_busy(
        &self,
        irq: Irq,
    ) {
        self.busy.lock().unwrap().push(irq);
    }

    fn record(
        &self,
        event: PlatformEvent,
    ) {
        self.events.lock().unwrap().push(event);
    }
}

impl LocalIrq for TestPlatform {
    fn save_and_disable(&self) -> bool {
        IRQ_ENABLED.with(|enabled| enabled.replace(false))
    }

    fn restore(
        &self,
        were_enabled: bool,
    ) {
        IRQ_ENABLED.with(|enabled| enabled.set(were_enabled));
    }
}

impl Platform for TestPlatform {
    fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    fn current_cpu(&self) -> CpuId {
        current_cpu()
    }

    fn raise_irq(
        &self,
        irq: Irq,
    ) {
        self.record(PlatformEvent::Raise {
            cpu: current_cpu(),
            irq,
        });
    }

    fn run_exclusively(
        &self,
        cpu: CpuId,
        f: &mut dyn FnMut(),
    ) {
        let _exclusive = self.exclusive.lock().unwrap();
        self.record(PlatformEvent::Exclusive { cpu });

        on_cpu(cpu, || {
            let were_enabled = self.save_and_disable();
            f();
            self.restore(were_enabled);
        });
    }

    fn request_irq(
        &self,
        domain: Domain,
        irq: Irq,
        _handler: hrtimer::TickHandler,
    ) -> Result<()> {
        if self.busy.lock().unwrap().contains(&irq) {
            return Err(Error::IrqBusy(irq));
        }

        self.record(PlatformEvent::RequestIrq {
            cpu: current_cpu(),
            domain,
            irq,
        });

        Ok(())
    }

    fn free_irq(
        &self,
        domain: Domain,
        irq: Irq,
    ) {
        self.record(PlatformEvent::FreeIrq {
            cpu: current_cpu(),
            domain,
            irq,
        });
    }
}

pub fn tick(_irq: Irq) {
}

/// Всё, что происходит с тестовыми реализациями таймеров,
/// в порядке возникновения.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Record {
    SetMode {
        source: &'static str,
        mode: Mode,
    },
    Program {
        source: &'static str,
        delta: u64,
    },
    Acknowledge {
        source: &'static str,
    },
    Set {
        ticks: u64,
    },
    Ack,
    Request {
        cpu: CpuId,
        steal: bool,
        irq_enabled: bool,
    },
    Release {
        cpu: CpuId,
    },
    ChipAck(Irq),
    ChipEnd(Irq),
}

#[derive(Debug, Default)]
pub struct Journal(Mutex<Vec<Record>>);

impl Journal {
    pub fn new() -> &'static Self {
        leak(Self::default())
    }

    pub fn push(
        &self,
        record: Record,
    ) {
        self.0.lock().unwrap().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.0.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Реализация [`TickSource`], которая записывает все обращения в [`Journal`].
pub struct MockSource {
    name: &'static str,
    journal: &'static Journal,
    fail: AtomicBool,
}

impl MockSource {
    pub fn new(
        name: &'static str,
        journal: &'static Journal,
    ) -> &'static Self {
        leak(Self {
            name,
            journal,
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(
        &self,
        fail: bool,
    ) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl TickSource for MockSource {
    fn set_mode(
        &self,
        mode: Mode,
    ) {
        self.journal.push(Record::SetMode {
            source: self.name,
            mode,
        });
    }

    fn program(
        &self,
        delta: u64,
    ) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::ProgramFailed);
        }

        self.journal.push(Record::Program {
            source: self.name,
            delta,
        });

        Ok(())
    }

    fn acknowledge(&self) {
        self.journal.push(Record::Acknowledge { source: self.name });
    }
}

/// Реализация [`TimerHardware`], которая записывает все обращения в [`Journal`].
pub struct MockHardware {
    journal: &'static Journal,
    fail: AtomicBool,
}

impl MockHardware {
    pub fn new(journal: &'static Journal) -> &'static Self {
        leak(Self {
            journal,
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(
        &self,
        fail: bool,
    ) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl TimerHardware for MockHardware {
    fn set(
        &self,
        ticks: u64,
    ) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::ProgramFailed);
        }

        self.journal.push(Record::Set { ticks });

        Ok(())
    }

    fn ack(&self) {
        self.journal.push(Record::Ack);
    }

    fn request(
        &self,
        steal: bool,
    ) {
        self.journal.push(Record::Request {
            cpu: current_cpu(),
            steal,
            irq_enabled: irq_enabled(),
        });
    }

    fn release(&self) {
        self.journal.push(Record::Release { cpu: current_cpu() });
    }
}

pub struct MockChip {
    journal: &'static Journal,
}

impl MockChip {
    pub fn new(journal: &'static Journal) -> Self {
        Self { journal }
    }
}

impl IrqChip for MockChip {
    fn ack(
        &self,
        irq: Irq,
    ) {
        self.journal.push(Record::ChipAck(irq));
    }

    fn end(
        &self,
        irq: Irq,
    ) {
        self.journal.push(Record::ChipEnd(irq));
    }
}

/// Устройство ядра общего назначения частотой 1 ГГц на процессорах `cpus`.
/// Множитель и сдвиг дают ровно один тик на наносекунду.
pub fn gigahertz_device(
    name: &'static str,
    rating: u32,
    features: Features,
    cpus: CpuMask,
    source: &'static MockSource,
) -> &'static ClockEventDevice {
    leak(ClockEventDevice::new(
        name, rating, features, cpus, 1 << 16, 16, 1_000, source,
    ))
}
