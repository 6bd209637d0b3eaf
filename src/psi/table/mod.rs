//! PSI/SIテーブルの定義。

#[macro_use]
mod macros;
mod b10;
mod iso;

pub use b10::*;
pub use iso::*;
