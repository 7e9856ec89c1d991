use core::{
    num::TryFromIntError,
    result,
};

use crate::{
    cpu::CpuId,
    platform::Irq,
};

/// Перечисление для возможных ошибок.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Заданное целое значение не помещается в указанный тип.
    Int(TryFromIntError),

    /// Задано недопустимое значение аргумента.
    InvalidArgument,

    /// Платформа отказалась подключить обработчик head domain к линии прерывания.
    IrqBusy(Irq),

    /// Для процессора не выбран таймер.
    NoTimer(CpuId),

    /// Ни один из зарегистрированных таймеров не обслуживает процессор.
    NoTimerFound(CpuId),

    /// Таймер не смог запрограммировать дедлайн,
    /// например потому что тот уже в прошлом.
    ProgramFailed,
}

impl From<TryFromIntError> for Error {
    fn from(e: TryFromIntError) -> Self {
        Error::Int(e)
    }
}

/// Тип возвращаемого результата `T` или ошибки [`Error`] ---
/// мономорфизация [`result::Result`] по типу ошибки.
pub type Result<T> = result::Result<T, Error>;
