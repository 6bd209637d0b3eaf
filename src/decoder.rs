//! TSを読み込んで解釈済みのフレームを取り出すデコーダー。
//!
//! [`TsDecoder`]は呼び出し側が1フレームずつ引き出すプル型の構造で、
//! [`read_frame`][`TsDecoder::read_frame`]はフレームを1つ取り出せるまで
//! バイトソースからパケットを消費して返る。

use std::io::Read;

use thiserror::Error;

use crate::demux::{DemuxError, Demuxer};
use crate::filters::frames::FrameFilter;
use crate::packet::{self, Packet};

pub use crate::filters::frames::{
    EitFrame, EventInfo, ExtendedEventInfo, ExtendedEventItemInfo, Frame, FrameError, NitFrame,
    NitTsInfo, PmtFrame, PmtStreamInfo, SdtFrame, SdtServiceInfo,
};

/// [`TsDecoder`]で発生するエラー。
#[derive(Debug, Error)]
pub enum Error {
    /// 同期バイトが0x47ではなく、ストリームが壊れている。
    #[error("sync byte lost")]
    SyncLost,

    /// 解釈できないパケットがあった。
    #[error("malformed packet")]
    MalformedPacket,

    /// セクションの解釈に失敗した。
    ///
    /// ストリーム自体は壊れていないため読み込みを続行できる。
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// 読み込み中のIOエラー。
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<packet::ReadError> for Error {
    fn from(value: packet::ReadError) -> Error {
        match value {
            packet::ReadError::SyncLost => Error::SyncLost,
            packet::ReadError::Io(e) => Error::Io(e),
        }
    }
}

impl From<DemuxError> for Error {
    fn from(value: DemuxError) -> Error {
        match value {
            DemuxError::MalformedPacket => Error::MalformedPacket,
        }
    }
}

/// TSからPSI/SIのフレームを取り出すデコーダー。
///
/// 生成した時点ではPAT・NIT・SDT・EITの各PIDを監視し、
/// PATの受信を通してPMTのPIDが監視対象へ追加される。
pub struct TsDecoder<R> {
    r: R,
    demuxer: Demuxer<FrameFilter>,
}

impl<R: Read> TsDecoder<R> {
    /// `r`からTSを読み込む`TsDecoder`を生成する。
    pub fn new(r: R) -> TsDecoder<R> {
        TsDecoder {
            r,
            demuxer: Demuxer::new(FrameFilter::new()),
        }
    }

    /// 次のフレームを取り出す。
    ///
    /// ストリームの終端に達した場合は`Ok(None)`を返す。
    /// セクション単位のエラー（[`Error::Frame`]）は致命的ではないため、
    /// 呼び出し側は読み込みを続行して構わない。
    pub fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            if let Some(result) = self.demuxer.filter_mut().pop() {
                return result.map(Some).map_err(Error::from);
            }

            let Some(packet) = Packet::read(&mut self.r)? else {
                return Ok(None);
            };
            self.demuxer.feed(&packet)?;
        }
    }

    /// `TsDecoder`を消費してバイトソースを返す。
    #[inline]
    pub fn into_inner(self) -> R {
        self.r
    }
}
