use crate::{
    clock_event::{
        ClockEventDevice,
        Features,
        Mode,
        TickSource,
    },
    log::{
        debug,
        warn,
    },
};

use super::TimerBackend;

/// Забирает `timer` у ядра общего назначения.
/// Выполняется на процессоре, который обслуживает `timer`, с запрещёнными прерываниями.
///
/// Если `steal` установлен и устройство ядра общего назначения не выключено,
/// устройство перенаправляется на `emulation`.
/// В любом случае устройство, умеющее однократный режим, переводится в него,
/// а первый дедлайн через один тик ядра общего назначения `host_tick_hz`
/// сохраняет тому ход времени.
pub(super) fn request(
    timer: &TimerBackend,
    steal: bool,
    emulation: &'static dyn TickSource,
    host_tick_hz: u32,
) {
    if let Some(device) = timer.host() {
        enter_oneshot(timer, device, host_tick_hz);

        if steal && device.mode() != Mode::Shutdown {
            let original = device.steal(emulation);
            debug!(
                timer = timer.name(),
                mult = original.mult(),
                shift = original.shift(),
                "stole the clock event device",
            );
        }
    }

    timer.hardware_request(steal);
}

/// Возвращает `timer` ядру общего назначения.
/// Выполняется на процессоре, который обслуживает `timer`, с запрещёнными прерываниями.
///
/// Перехваченное устройство получает обратно в точности свою исходную привязку.
/// Затем ему возвращается режим, который последним установило ядро общего назначения.
pub(super) fn release(
    timer: &TimerBackend,
    host_tick_hz: u32,
) {
    if let Some(device) = timer.host() {
        if let Some(original) = device.restore() {
            debug!(
                timer = timer.name(),
                mult = original.mult(),
                shift = original.shift(),
                "restored the clock event device",
            );
        }

        let mode = device.mode();
        device.switch_mode(mode);
        if mode == Mode::Oneshot {
            program_host_tick(timer, device, host_tick_hz);
        }
    }

    timer.hardware_release();
}

/// Переводит устройство в однократный режим, если оно его поддерживает и ещё не в нём.
fn enter_oneshot(
    timer: &TimerBackend,
    device: &ClockEventDevice,
    host_tick_hz: u32,
) {
    if device.features().contains(Features::ONESHOT) && device.mode() != Mode::Oneshot {
        device.switch_mode(Mode::Oneshot);
        program_host_tick(timer, device, host_tick_hz);
    }
}

/// Программирует дедлайн через один тик ядра общего назначения.
fn program_host_tick(
    timer: &TimerBackend,
    device: &ClockEventDevice,
    host_tick_hz: u32,
) {
    let ticks = timer.frequency().period(host_tick_hz);

    if let Err(error) = device.program_ticks(ticks) {
        warn!(timer = timer.name(), ticks, ?error, "failed to program the host tick");
    }
}
