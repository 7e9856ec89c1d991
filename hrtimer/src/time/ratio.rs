use super::Hz;

/// Отношение двух частот в формате с фиксированной точкой.
///
/// Переводит количество отсчётов `count` часов частоты `from`
/// в количество отсчётов часов частоты `to` как
/// `count * integer + ((count * fraction) >> 32)`.
///
/// Деление выполняется один раз, при вычислении коэффициентов в [`Ratio::new()`].
/// На горячем пути [`Ratio::apply()`] обходится умножениями и сдвигом.
///
/// Дробная часть округляется вверх, поэтому результат [`Ratio::apply()`] отличается от
/// точного значения `floor(count * to / from)` не более чем на единицу и только в большую сторону.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ratio {
    /// Целая часть отношения частот `to / from`.
    integer: u64,

    /// Дробная часть отношения частот `to / from`, умноженная на `2^32`.
    /// Не превышает `2^32`, поэтому произведение с 32-битным количеством отсчётов
    /// помещается в [`u64`].
    fraction: u64,
}

impl Ratio {
    /// Тождественное отношение.
    pub const IDENTITY: Self = Self {
        integer: 1,
        fraction: 0,
    };

    /// Количество бит дробной части.
    const FRACTION_BITS: u32 = 32;

    /// Вычисляет коэффициенты перевода отсчётов часов частоты `from`
    /// в отсчёты часов частоты `to`.
    pub fn new(
        from: Hz,
        to: Hz,
    ) -> Self {
        let from = from.get();
        let to = to.get();

        let integer = to / from;
        let remainder = u128::from(to % from);
        let fraction =
            ((remainder << Self::FRACTION_BITS) + u128::from(from) - 1) / u128::from(from);

        Self {
            integer,
            fraction: fraction as u64,
        }
    }

    /// Целая часть отношения частот.
    pub fn integer(&self) -> u64 {
        self.integer
    }

    /// Дробная часть отношения частот, умноженная на `2^32`.
    pub fn fraction(&self) -> u64 {
        self.fraction
    }

    /// Переводит `count` отсчётов одних часов в отсчёты других.
    ///
    /// Насыщается на [`u64::MAX`], если результат в [`u64`] не помещается.
    #[inline]
    pub fn apply(
        &self,
        count: u32,
    ) -> u64 {
        let count = u64::from(count);

        let mut result = if self.integer == 1 {
            count
        } else {
            count.saturating_mul(self.integer)
        };

        if self.fraction != 0 {
            result = result.saturating_add((count * self.fraction) >> Self::FRACTION_BITS);
        }

        result
    }
}

#[cfg(test)]
mod test {
    use super::{
        Hz,
        Ratio,
    };

    fn hz(hz: u64) -> Hz {
        Hz::new(hz).unwrap()
    }

    #[test]
    fn multiple_has_no_fraction() {
        let ratio = Ratio::new(hz(1_000_000), hz(3_000_000));

        assert_eq!(ratio.integer(), 3);
        assert_eq!(ratio.fraction(), 0);
        assert_eq!(ratio.apply(7), 21);
    }

    #[test]
    fn slower_destination_has_no_integer_part() {
        let ratio = Ratio::new(hz(3_000_000), hz(1_000_000));

        assert_eq!(ratio.integer(), 0);
        assert_ne!(ratio.fraction(), 0);
        assert_eq!(ratio.apply(3), 1);
        assert_eq!(ratio.apply(3_000_000), 1_000_000);
    }

    #[test]
    fn identity() {
        assert_eq!(Ratio::new(hz(19_200_000), hz(19_200_000)), Ratio::IDENTITY);
        assert_eq!(Ratio::IDENTITY.apply(u32::MAX), u64::from(u32::MAX));
    }

    #[test]
    fn fraction_fits_the_multiplication() {
        let ratio = Ratio::new(hz(10_000_000_000), hz(9_999_999_999));

        assert!(ratio.fraction() <= 1 << 32);
        assert!(ratio.apply(u32::MAX) <= u64::from(u32::MAX));
    }
}
