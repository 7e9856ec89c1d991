/// Вспомогательная структура [`Hz`] для хранения и форматирования
/// [частоты](https://en.wikipedia.org/wiki/Hertz) при журналировании.
mod hz;

/// Отношение частот [`Ratio`] в формате с фиксированной точкой.
mod ratio;

pub use hz::Hz;
pub use ratio::Ratio;

/// Количество наносекунд в одной секунде.
pub const NSECS_PER_SEC: u64 = 1_000_000_000;

/// Переводит `ns` наносекунд в тики часов частоты `frequency`, округляя вниз.
///
/// Насыщается на [`u64::MAX`].
pub fn ns_to_ticks(
    ns: u64,
    frequency: Hz,
) -> u64 {
    let ticks = u128::from(ns) * u128::from(frequency.get()) / u128::from(NSECS_PER_SEC);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Переводит `ticks` тиков часов частоты `frequency` в наносекунды, округляя вниз.
///
/// Насыщается на [`u64::MAX`].
pub fn ticks_to_ns(
    ticks: u64,
    frequency: Hz,
) -> u64 {
    let ns = u128::from(ticks) * u128::from(NSECS_PER_SEC) / u128::from(frequency.get());
    u64::try_from(ns).unwrap_or(u64::MAX)
}
