//! PID関連。

use std::fmt;

use crate::utils::BytesExt;

/// MPEG2-TSのPID（13ビット）。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(u16);

impl Pid {
    /// PIDの最大値。
    pub const MAX: u16 = 0x1FFF;

    /// Program Association Table
    pub const PAT: Pid = Pid::new(0x0000);
    /// Conditional Access Table
    pub const CAT: Pid = Pid::new(0x0001);
    /// Network Information Table
    pub const NIT: Pid = Pid::new(0x0010);
    /// Service Description Table
    pub const SDT: Pid = Pid::new(0x0011);
    /// Event Information Table
    pub const EIT: Pid = Pid::new(0x0012);
    /// Time and Date Table / Time Offset Table
    pub const TDT: Pid = Pid::new(0x0014);
    /// Null packet
    pub const NULL: Pid = Pid::new(0x1FFF);

    /// `Pid`を生成する。
    ///
    /// # パニック
    ///
    /// `pid`の値が範囲外の際はパニックする。
    #[inline]
    pub const fn new(pid: u16) -> Pid {
        assert!(pid <= Pid::MAX);
        Pid(pid)
    }

    /// `data`の先頭2バイトからPIDを読み出す。
    ///
    /// # パニック
    ///
    /// `data`の長さが2未満の場合、このメソッドはパニックする。
    #[inline]
    pub fn read(data: &[u8]) -> Pid {
        Pid(data.read_be_16() & Pid::MAX)
    }

    /// PIDを`u16`で返す。
    #[inline]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

impl Default for Pid {
    #[inline]
    fn default() -> Pid {
        Pid::NULL
    }
}

impl From<Pid> for u16 {
    #[inline]
    fn from(value: Pid) -> u16 {
        value.get()
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pid(0x{:04X})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid() {
        assert_eq!(Pid::new(0x1FFF), Pid::NULL);
        std::panic::catch_unwind(|| Pid::new(0x2000)).unwrap_err();

        assert_eq!(Pid::read(&u16::to_be_bytes(0x0012)), Pid::EIT);
        // 上位ビットはPIDに含まれない
        assert_eq!(Pid::read(&u16::to_be_bytes(0x4011)), Pid::SDT);

        assert_eq!(Pid::default(), Pid::NULL);
        assert_eq!(u16::from(Pid::NIT), 0x0010);
        assert_eq!(format!("{:?}", Pid::EIT), "Pid(0x0012)");
        assert_eq!(format!("{}", Pid::NULL), "8191");
    }
}
