//! ARIBに基づいたMPEG2-TSからPSI/SIを取り出すためのクレート。
//!
//! 188バイトのTSパケットからPSI/SIセクションを再構成し、
//! PAT・PMT・NIT・SDT・EITとして解釈する。
//! 各テーブル中の文字列はARIB STD-B24の8単位符号としてデコードされる。
//!
//! # サンプル
//!
//! ```no_run
//! use epgts::decoder::{Frame, TsDecoder};
//!
//! let file = std::fs::File::open("cap.ts")?;
//! let mut decoder = TsDecoder::new(std::io::BufReader::new(file));
//! while let Some(frame) = decoder.read_frame()? {
//!     if let Frame::Eit(eit) = frame {
//!         for event in &eit.events {
//!             println!("{}", event.name);
//!         }
//!     }
//! }
//! # Ok::<(), epgts::decoder::Error>(())
//! ```

#![deny(missing_docs)]

pub mod crc;
pub mod decoder;
pub mod demux;
pub mod eight;
pub mod filters;
pub mod lang;
pub mod packet;
pub mod pid;
pub mod psi;
pub mod time;
mod utils;

pub use decoder::TsDecoder;
pub use eight::{AribStr, AribString};
pub use packet::Packet;
pub use pid::Pid;
