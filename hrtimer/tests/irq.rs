use std::time::Duration;

use rstest::rstest;

use hrtimer::{
    Config,
    CpuMask,
    Domain,
    Error,
    Features,
    HrTimers,
    Hz,
    Irq,
    Mode,
    TimerBackend,
};

use platform::{
    Journal,
    MockChip,
    MockHardware,
    MockSource,
    PlatformEvent,
    Record,
    TestPlatform,
    gigahertz_device,
    tick,
};

mod log;
mod platform;

fn hrtimers(journal: &'static Journal) -> HrTimers<TestPlatform> {
    let emulation = MockSource::new("emulation", journal);
    HrTimers::new(TestPlatform::new(3), Config::default(), emulation)
}

fn register(
    hrtimers: &HrTimers<TestPlatform>,
    irq: Irq,
    cpus: CpuMask,
    journal: &'static Journal,
) {
    let frequency = Hz::new(1_000_000).unwrap();
    let timer = TimerBackend::new("timer", 100, irq, frequency, MockHardware::new(journal))
        .with_cpumask(cpus);
    hrtimers.register(Box::leak(Box::new(timer)));
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn ack_order() {
    let journal = Journal::new();
    let hrtimers = hrtimers(journal);
    register(&hrtimers, Irq(30), CpuMask::of(0), journal);
    hrtimers.select(CpuMask::of(0)).unwrap();
    journal.take();

    let chip = MockChip::new(journal);
    hrtimers.ack_irq(Irq(30), Some(&chip));

    assert_eq!(
        journal.take(),
        [Record::ChipAck(Irq(30)), Record::Ack, Record::ChipEnd(Irq(30))],
    );

    hrtimers.ack_irq(Irq(30), None);
    assert_eq!(journal.take(), [Record::Ack]);
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn host_device_ack() {
    let journal = Journal::new();
    let hrtimers = hrtimers(journal);
    let source = MockSource::new("hardware", journal);
    let device = gigahertz_device("local", 100, Features::ONESHOT, CpuMask::of(0), source);
    device.set_mode(Mode::Oneshot);
    hrtimers.register_host(device, Irq(7)).unwrap();
    hrtimers.select(CpuMask::of(0)).unwrap();
    journal.take();

    hrtimers.ack_irq(Irq(7), Some(&MockChip::new(journal)));

    assert_eq!(
        journal.take(),
        [
            Record::ChipAck(Irq(7)),
            Record::Acknowledge { source: "hardware" },
            Record::ChipEnd(Irq(7)),
        ],
    );
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn start_and_stop() {
    let journal = Journal::new();
    let hrtimers = hrtimers(journal);
    register(&hrtimers, Irq(30), CpuMask::first(2), journal);
    register(&hrtimers, Irq(31), CpuMask::of(2), journal);
    hrtimers.select(CpuMask::first(3)).unwrap();
    hrtimers.platform().take_events();

    for cpu in 0 .. 3 {
        assert_eq!(hrtimers.start(cpu, tick), Ok(Mode::Unused));
    }

    let requested: Vec<_> = hrtimers
        .platform()
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, PlatformEvent::RequestIrq { .. }))
        .collect();
    assert_eq!(
        requested,
        [
            PlatformEvent::RequestIrq {
                cpu: 0,
                domain: Domain::Head,
                irq: Irq(30),
            },
            PlatformEvent::RequestIrq {
                cpu: 2,
                domain: Domain::Head,
                irq: Irq(31),
            },
        ],
    );

    for cpu in 0 .. 3 {
        hrtimers.stop(cpu);
    }

    let freed: Vec<_> = hrtimers
        .platform()
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, PlatformEvent::FreeIrq { .. }))
        .collect();
    assert_eq!(
        freed,
        [
            PlatformEvent::FreeIrq {
                cpu: 0,
                domain: Domain::Head,
                irq: Irq(30),
            },
            PlatformEvent::FreeIrq {
                cpu: 2,
                domain: Domain::Head,
                irq: Irq(31),
            },
        ],
    );
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn start_reports_host_mode() {
    let journal = Journal::new();
    let hrtimers = hrtimers(journal);
    let source = MockSource::new("hardware", journal);
    let device = gigahertz_device("local", 100, Features::ONESHOT, CpuMask::of(0), source);
    device.set_mode(Mode::Periodic);
    hrtimers.register_host(device, Irq(7)).unwrap();
    hrtimers.select(CpuMask::of(0)).unwrap();

    assert_eq!(hrtimers.start(0, tick), Ok(Mode::Periodic));
}

#[rstest]
#[timeout(Duration::from_secs(1))]
fn start_failures() {
    let journal = Journal::new();
    let hrtimers = hrtimers(journal);

    assert_eq!(hrtimers.start(0, tick), Err(Error::NoTimer(0)));

    register(&hrtimers, Irq(30), CpuMask::of(0), journal);
    hrtimers.select(CpuMask::of(0)).unwrap();
    hrtimers.platform().set_busy(Irq(30));

    assert_eq!(hrtimers.start(0, tick), Err(Error::IrqBusy(Irq(30))));
}

#[ctor::ctor]
fn init() {
    log::init();
}
