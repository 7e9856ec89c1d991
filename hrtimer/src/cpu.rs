use core::fmt;

use itertools::Itertools;
use static_assertions::const_assert;

/// Идентификатор процессора.
pub type CpuId = u8;

/// Максимальное количество процессоров, которое поддерживает [`CpuMask`].
pub const MAX_CPU_COUNT: usize = 64;

const_assert!(MAX_CPU_COUNT <= u64::BITS as usize);
const_assert!(MAX_CPU_COUNT <= CpuId::MAX as usize + 1);

/// Множество процессоров, например процессоров, которые обслуживает таймер.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct CpuMask(u64);

impl CpuMask {
    /// Пустое множество.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Множество из одного процессора `cpu`.
    ///
    /// # Panics
    ///
    /// Паникует, если `cpu` не меньше [`MAX_CPU_COUNT`].
    pub const fn of(cpu: CpuId) -> Self {
        Self(Self::bit(cpu))
    }

    /// Множество процессоров с номерами от `0` до `count - 1`.
    ///
    /// # Panics
    ///
    /// Паникует, если `count` больше [`MAX_CPU_COUNT`].
    pub const fn first(count: usize) -> Self {
        assert!(count <= MAX_CPU_COUNT);

        if count == MAX_CPU_COUNT {
            Self(u64::MAX)
        } else {
            Self((1 << count) - 1)
        }
    }

    /// Возвращает `true`, если `cpu` входит в множество.
    pub const fn contains(
        &self,
        cpu: CpuId,
    ) -> bool {
        (cpu as usize) < MAX_CPU_COUNT && self.0 & Self::bit(cpu) != 0
    }

    /// Добавляет `cpu` в множество.
    pub fn insert(
        &mut self,
        cpu: CpuId,
    ) {
        self.0 |= Self::bit(cpu);
    }

    /// Удаляет `cpu` из множества.
    pub fn remove(
        &mut self,
        cpu: CpuId,
    ) {
        self.0 &= !Self::bit(cpu);
    }

    /// Возвращает `true`, если множество пусто.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Количество процессоров в множестве.
    pub const fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Итератор по процессорам множества в порядке возрастания номеров.
    pub fn iter(&self) -> impl Iterator<Item = CpuId> + use<> {
        let mask = self.0;
        (0 .. MAX_CPU_COUNT as u8).filter(move |&cpu| mask & (1 << cpu) != 0)
    }

    /// Бит, соответствующий процессору `cpu`.
    const fn bit(cpu: CpuId) -> u64 {
        assert!((cpu as usize) < MAX_CPU_COUNT, "CPU id is out of range");
        1 << cpu
    }
}

impl FromIterator<CpuId> for CpuMask {
    fn from_iter<I: IntoIterator<Item = CpuId>>(cpus: I) -> Self {
        let mut mask = Self::empty();
        for cpu in cpus {
            mask.insert(cpu);
        }
        mask
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        write!(formatter, "{{{}}}", self.iter().format(", "))
    }
}

impl fmt::Display for CpuMask {
    fn fmt(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}
