//! MPEG2-TSのパケット。

use std::fmt;
use std::io::{self, Read};

use thiserror::Error;

use crate::pid::Pid;

const SYNC_BYTE: u8 = 0x47;
const PACKET_SIZE: usize = 188;

/// [`Packet::read`]で発生するエラー。
#[derive(Debug, Error)]
pub enum ReadError {
    /// 同期バイトが0x47ではなく、ストリームが壊れている。
    #[error("sync byte lost")]
    SyncLost,

    /// 読み込み中のIOエラー。
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// MPEG2-TSのパケット。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Packet(pub [u8; PACKET_SIZE]);

impl Packet {
    /// `r`からTSパケットを順次読み込むイテレーターを生成する。
    #[inline]
    #[must_use]
    pub fn iter<R: Read>(r: R) -> PacketIter<R> {
        PacketIter { r }
    }

    /// `r`からTSパケットを読み込む。
    ///
    /// ストリームの終端では`None`を返す。
    /// 読み込んだ188バイトの先頭が同期バイトでない場合は
    /// [`ReadError::SyncLost`]を返し、以降の読み込み結果は保証されない。
    pub fn read<R: Read>(mut r: R) -> Result<Option<Packet>, ReadError> {
        let mut packet = Packet([0; PACKET_SIZE]);
        match r.read_exact(&mut packet.0) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if packet.sync_byte() != SYNC_BYTE {
            return Err(ReadError::SyncLost);
        }
        Ok(Some(packet))
    }

    /// パケットが正常かどうかを返す。
    pub fn is_normal(&self) -> bool {
        if self.sync_byte() != SYNC_BYTE {
            // 同期バイト不正
            return false;
        }
        if self.error_indicator() {
            // ビット誤りあり
            return false;
        }
        if self.adaptation_field_control() == 0b00 {
            // 未定義アダプテーションフィールド制御値
            return false;
        }
        if self.has_adaptation_field() && self.adaptation_field_length_raw() > 183 {
            // アダプテーションフィールド長異常
            return false;
        }

        true
    }

    /// sync byteを返す。
    #[inline]
    pub fn sync_byte(&self) -> u8 {
        self.0[0]
    }

    /// transport error indicatorを返す。
    #[inline]
    pub fn error_indicator(&self) -> bool {
        self.0[1] & 0b10000000 != 0
    }

    /// payload unit start indicatorを返す。
    #[inline]
    pub fn unit_start_indicator(&self) -> bool {
        self.0[1] & 0b01000000 != 0
    }

    /// PID（13ビット）を返す。
    #[inline]
    pub fn pid(&self) -> Pid {
        Pid::read(&self.0[1..])
    }

    /// transport scrambling control（2ビット）を返す。
    #[inline]
    pub fn scrambling_control(&self) -> u8 {
        (self.0[3] & 0b11000000) >> 6
    }

    /// adaptation field control（2ビット）を返す。
    #[inline]
    pub fn adaptation_field_control(&self) -> u8 {
        (self.0[3] & 0b00110000) >> 4
    }

    /// continuity counter（4ビット）を返す。
    #[inline]
    pub fn continuity_counter(&self) -> u8 {
        self.0[3] & 0b00001111
    }

    /// パケットがadaptation fieldを含むかどうかを返す。
    #[inline]
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control() & 0b10 != 0
    }

    #[inline]
    fn adaptation_field_length_raw(&self) -> u8 {
        self.0[4]
    }

    /// adaptation fieldがある場合、adaptation_field_lengthを返す。
    pub fn adaptation_field_length(&self) -> Option<u8> {
        self.has_adaptation_field()
            .then(|| self.adaptation_field_length_raw())
    }

    /// パケットがペイロードを含むかどうかを返す。
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control() & 0b01 != 0
    }

    /// ペイロードを返す。
    ///
    /// ペイロードがない場合やadaptation fieldの長さが異常な場合は`None`を返す。
    pub fn payload(&self) -> Option<&[u8]> {
        if !self.has_payload() {
            None
        } else if let Some(afl) = self.adaptation_field_length() {
            let offset = 4 + 1 + afl as usize;
            self.0.get(offset..)
        } else {
            self.0.get(4..)
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Packet")
            .field("sync_byte", &self.sync_byte())
            .field("error_indicator", &self.error_indicator())
            .field("unit_start_indicator", &self.unit_start_indicator())
            .field("pid", &self.pid())
            .field("scrambling_control", &self.scrambling_control())
            .field("adaptation_field_control", &self.adaptation_field_control())
            .field("continuity_counter", &self.continuity_counter())
            .finish_non_exhaustive()
    }
}

/// TSパケットを順次読み込むイテレーター。
#[derive(Debug)]
pub struct PacketIter<R> {
    r: R,
}

impl<R: Read> Iterator for PacketIter<R> {
    type Item = Result<Packet, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        Packet::read(&mut self.r).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn packet(parts: &[&[u8]]) -> Packet {
        let mut data = parts.concat();
        assert!(data.len() <= PACKET_SIZE);
        data.resize(PACKET_SIZE, 0x00);
        Packet(data.try_into().unwrap())
    }

    #[test]
    fn test_packet_read() {
        let pkt = packet(&[&[SYNC_BYTE, 0x40, 0x12, 0x18]]);
        let data: &[u8] = &pkt.0;

        assert_matches!(Packet::read(&mut &data[..0]), Ok(None));
        assert_matches!(Packet::read(&mut &data[..10]), Ok(None));
        assert_matches!(Packet::read(&mut &*data), Ok(Some(p)) if p == pkt);

        let broken = [&[0x00u8] as &[u8], data].concat();
        assert_matches!(Packet::read(&mut &*broken), Err(ReadError::SyncLost));
    }

    #[test]
    fn test_packet_read_err() {
        struct ReadErr(io::ErrorKind);
        impl Read for ReadErr {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(self.0.into())
            }
        }

        assert_matches!(Packet::read(ReadErr(io::ErrorKind::UnexpectedEof)), Ok(None));
        assert_matches!(
            Packet::read(ReadErr(io::ErrorKind::BrokenPipe)),
            Err(ReadError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_packet_accessor() {
        let pkt = packet(&[&[SYNC_BYTE, 0x40, 0x12, 0x18]]);
        assert!(pkt.is_normal());
        assert!(!pkt.error_indicator());
        assert!(pkt.unit_start_indicator());
        assert_eq!(pkt.pid(), Pid::EIT);
        assert_eq!(pkt.scrambling_control(), 0b00);
        assert_eq!(pkt.adaptation_field_control(), 0b01);
        assert_eq!(pkt.continuity_counter(), 8);
        assert_eq!(pkt.adaptation_field_length(), None);
        assert_eq!(pkt.payload(), Some(&pkt.0[4..]));

        // adaptation field付き
        let pkt = packet(&[&[SYNC_BYTE, 0x01, 0x40, 0x37, 0x3F]]);
        assert!(pkt.is_normal());
        assert!(!pkt.unit_start_indicator());
        assert_eq!(pkt.pid(), Pid::new(0x0140));
        assert_eq!(pkt.adaptation_field_control(), 0b11);
        assert_eq!(pkt.continuity_counter(), 7);
        assert_eq!(pkt.adaptation_field_length(), Some(63));
        assert_eq!(pkt.payload(), Some(&pkt.0[68..]));

        // adaptation fieldのみ
        let pkt = packet(&[&[SYNC_BYTE, 0x01, 0x11, 0x20, 0xB7]]);
        assert!(pkt.is_normal());
        assert_eq!(pkt.adaptation_field_length(), Some(183));
        assert_eq!(pkt.payload(), None);
    }

    #[test]
    fn test_packet_abnormal() {
        let pkt = packet(&[&[0x00]]);
        assert!(!pkt.is_normal());

        let pkt = packet(&[&[SYNC_BYTE, 0b10000000]]);
        assert!(pkt.error_indicator());
        assert!(!pkt.is_normal());

        let pkt = packet(&[&[SYNC_BYTE, 0x00, 0x00, 0b00000000]]);
        assert_eq!(pkt.adaptation_field_control(), 0b00);
        assert!(!pkt.is_normal());

        // adaptation_field_lengthが183を超えるのは異常
        let pkt = packet(&[&[SYNC_BYTE, 0x00, 0x00, 0b00110000, 184]]);
        assert!(!pkt.is_normal());
        let pkt = packet(&[&[SYNC_BYTE, 0x00, 0x00, 0b00110000, 183]]);
        assert!(pkt.is_normal());
        assert_eq!(pkt.payload(), Some(&[] as &[u8]));
    }

    #[test]
    fn test_packet_iter() {
        let a = packet(&[&[SYNC_BYTE, 0x40, 0x00, 0x10]]);
        let b = packet(&[&[SYNC_BYTE, 0x00, 0x11, 0x11]]);
        let data = [a.0, b.0].concat();

        let mut iter = Packet::iter(&*data);
        assert_matches!(iter.next(), Some(Ok(p)) if p == a);
        assert_matches!(iter.next(), Some(Ok(p)) if p == b);
        assert_matches!(iter.next(), None);
    }
}
