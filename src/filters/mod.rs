//! セクションを仕分けるためのフィルター。

pub mod frames;

pub use frames::FrameFilter;
