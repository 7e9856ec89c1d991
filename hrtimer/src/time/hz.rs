use core::{
    fmt::{
        Display,
        Formatter,
        Result,
    },
    num::NonZeroU64,
};

use number_prefix::NumberPrefix;

use super::NSECS_PER_SEC;

/// Вспомогательная структура для хранения и форматирования
/// [частоты](https://en.wikipedia.org/wiki/Hertz)
/// при журналировании.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Hz(NonZeroU64);

impl Hz {
    /// Возвращает [`Some`] для ненулевой частоты
    /// `hz` [Герц](https://en.wikipedia.org/wiki/Hertz).
    pub const fn new(hz: u64) -> Option<Self> {
        match NonZeroU64::new(hz) {
            Some(hz) => Some(Self(hz)),
            None => None,
        }
    }

    /// Возвращает содержащееся значение частоты в
    /// [Герцах](https://en.wikipedia.org/wiki/Hertz).
    pub const fn get(&self) -> u64 {
        self.0.get()
    }

    /// Частота устройства, которое переводит наносекунды в свои тики как
    /// `ticks = (ns * mult) >> shift`.
    ///
    /// Возвращает [`None`], если такая частота меньше одного Герца.
    pub fn from_mult_shift(
        mult: u32,
        shift: u32,
    ) -> Option<Self> {
        let hz = (u128::from(NSECS_PER_SEC) * u128::from(mult)).checked_shr(shift).unwrap_or(0);
        Self::new(u64::try_from(hz).ok()?)
    }

    /// Количество тактов этой частоты в одном периоде частоты `rate` Герц.
    /// Но не меньше одного такта.
    pub fn period(
        &self,
        rate: u32,
    ) -> u64 {
        (self.get() / u64::from(rate.max(1))).max(1)
    }
}

impl Display for Hz {
    fn fmt(
        &self,
        formatter: &mut Formatter,
    ) -> Result {
        let hz = self.get();
        match NumberPrefix::decimal(hz as f64) {
            NumberPrefix::Standalone(_) => {
                write!(formatter, "{hz} Hz")
            },
            NumberPrefix::Prefixed(prefix, value) => {
                write!(formatter, "{value:.3} {}Hz", prefix.symbol())
            },
        }
    }
}
