//! ARIB STD-B10で規定されるテーブルと関連する型の定義。

use std::num::NonZeroU16;
use std::ops::RangeInclusive;

use crate::psi::desc::DescriptorBlock;
use crate::psi::{PsiTable, Section};
use crate::time::DateTime;
use crate::utils::BytesExt;

use super::iso::{NetworkId, ServiceId, TransportStreamId};

/// イベント識別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub NonZeroU16);

impl_id!(EventId);

/// 進行状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunningStatus {
    /// 未定義。
    Undefined,
    /// 非実行中。
    NotRunning,
    /// 数秒以内に開始。
    StartsSoon,
    /// 停止中。
    Pausing,
    /// 実行中。
    Running,
    /// 予約。
    Reserved,
}

impl From<u8> for RunningStatus {
    #[inline]
    fn from(value: u8) -> RunningStatus {
        match value {
            0 => RunningStatus::Undefined,
            1 => RunningStatus::NotRunning,
            2 => RunningStatus::StartsSoon,
            3 => RunningStatus::Pausing,
            4 => RunningStatus::Running,
            _ => RunningStatus::Reserved,
        }
    }
}

/// 特定のトランスポートストリームに含まれるサービス。
#[derive(Debug, PartialEq, Eq)]
pub struct SdtService<'a> {
    /// サービス識別。
    pub service_id: ServiceId,
    /// EIT［スケジュール］フラグ。
    pub eit_schedule_flag: bool,
    /// EIT［現在／次］フラグ。
    pub eit_present_following_flag: bool,
    /// 進行状態。
    pub running_status: RunningStatus,
    /// スクランブル。
    pub free_ca_mode: bool,
    /// 記述子の塊。
    pub descriptors: DescriptorBlock<'a>,
}

/// SDT（Service Description Table）。
#[derive(Debug, PartialEq, Eq)]
pub struct Sdt<'a> {
    /// テーブル識別。自TSなら[`Sdt::TABLE_ID_ACTUAL`]。
    pub table_id: u8,
    /// トランスポートストリーム識別。
    pub transport_stream_id: TransportStreamId,
    /// オリジナルネットワーク識別。
    pub original_network_id: NetworkId,
    /// TSのサービスを格納する配列。
    pub services: Vec<SdtService<'a>>,
}

impl<'a> Sdt<'a> {
    /// 現在のTSにおけるSDTのテーブルID。
    pub const TABLE_ID_ACTUAL: u8 = 0x42;
    /// 他のTSにおけるSDTのテーブルID。
    pub const TABLE_ID_OTHER: u8 = 0x46;
}

impl<'a> PsiTable<'a> for Sdt<'a> {
    fn read(psi: &Section<'a>) -> Option<Sdt<'a>> {
        if !matches!(psi.table_id, Self::TABLE_ID_ACTUAL | Self::TABLE_ID_OTHER) {
            log::debug!("invalid Sdt::table_id");
            return None;
        }
        let Some(syntax) = psi.syntax.as_ref() else {
            log::debug!("invalid Sdt::syntax");
            return None;
        };

        let data = psi.data;
        if data.len() < 3 {
            log::debug!("invalid Sdt");
            return None;
        }

        let Some(transport_stream_id) = TransportStreamId::new(syntax.table_id_extension) else {
            log::debug!("invalid Sdt::table_id_extension");
            return None;
        };
        let Some(original_network_id) = NetworkId::new(data[0..=1].read_be_16()) else {
            log::debug!("invalid Sdt::original_network_id");
            return None;
        };

        let mut data = &data[3..];
        let mut services = Vec::new();
        while !data.is_empty() {
            if data.len() < 5 {
                log::debug!("invalid SdtService");
                return None;
            }

            let Some(service_id) = ServiceId::new(data[0..=1].read_be_16()) else {
                log::debug!("invalid SdtService::service_id");
                return None;
            };
            let eit_schedule_flag = data[2] & 0b00000010 != 0;
            let eit_present_following_flag = data[2] & 0b00000001 != 0;
            let running_status = ((data[3] & 0b11100000) >> 5).into();
            let free_ca_mode = data[3] & 0b00010000 != 0;
            let Some((descriptors, rem)) = DescriptorBlock::read(&data[3..]) else {
                log::debug!("invalid SdtService::descriptors");
                return None;
            };
            data = rem;

            services.push(SdtService {
                service_id,
                eit_schedule_flag,
                eit_present_following_flag,
                running_status,
                free_ca_mode,
                descriptors,
            });
        }

        Some(Sdt {
            table_id: psi.table_id,
            transport_stream_id,
            original_network_id,
            services,
        })
    }
}

/// 各サービスに含まれるイベント。
#[derive(Debug, PartialEq, Eq)]
pub struct EitEvent<'a> {
    /// イベント識別。
    pub event_id: EventId,
    /// 開始時間。未定義の場合は`None`。
    pub start_time: Option<DateTime>,
    /// 継続時間（単位は秒）。未定義の場合は`None`。
    pub duration: Option<u32>,
    /// 進行状態。
    pub running_status: RunningStatus,
    /// スクランブル。
    pub free_ca_mode: bool,
    /// 記述子の塊。
    pub descriptors: DescriptorBlock<'a>,
}

/// EIT（Event Information Table）。
#[derive(Debug, PartialEq, Eq)]
pub struct Eit<'a> {
    /// テーブル識別。
    pub table_id: u8,
    /// サービス識別。
    pub service_id: ServiceId,
    /// セクション番号。
    pub section_number: u8,
    /// トランスポートストリーム識別。
    pub transport_stream_id: TransportStreamId,
    /// オリジナルネットワーク識別。
    pub original_network_id: NetworkId,
    /// セグメント最終セクション番号。
    pub segment_last_section_number: u8,
    /// 最終テーブル識別。
    pub last_table_id: u8,
    /// イベントを格納する配列。
    pub events: Vec<EitEvent<'a>>,
}

impl<'a> Eit<'a> {
    /// 自TSにおけるイベント［現在／次］を格納するEITのテーブルID。
    pub const TABLE_ID_PF_ACTUAL: u8 = 0x4E;
    /// 他TSにおけるイベント［現在／次］を格納するEITのテーブルID。
    pub const TABLE_ID_PF_OTHER: u8 = 0x4F;
    /// 自TSにおけるイベント［スケジュール］を格納するEITのテーブルID。
    pub const TABLE_ID_SCHEDULE_ACTUAL: RangeInclusive<u8> = 0x50..=0x5F;
    /// 他TSにおけるイベント［スケジュール］を格納するEITのテーブルID。
    pub const TABLE_ID_SCHEDULE_OTHER: RangeInclusive<u8> = 0x60..=0x6F;

    /// EITを格納し得るテーブルIDかどうかを返す。
    pub fn is_eit_table_id(table_id: u8) -> bool {
        matches!(table_id, 0x4E..=0x4F | 0x50..=0x5F | 0x60..=0x6F)
    }
}

impl<'a> PsiTable<'a> for Eit<'a> {
    fn read(psi: &Section<'a>) -> Option<Eit<'a>> {
        if !Self::is_eit_table_id(psi.table_id) {
            log::debug!("invalid Eit::table_id");
            return None;
        }
        let Some(syntax) = psi.syntax.as_ref() else {
            log::debug!("invalid Eit::syntax");
            return None;
        };

        let data = psi.data;
        if data.len() < 6 {
            log::debug!("invalid Eit");
            return None;
        }

        let Some(service_id) = ServiceId::new(syntax.table_id_extension) else {
            log::debug!("invalid Eit::table_id_extension");
            return None;
        };
        let Some(transport_stream_id) = TransportStreamId::new(data[0..=1].read_be_16()) else {
            log::debug!("invalid Eit::transport_stream_id");
            return None;
        };
        let Some(original_network_id) = NetworkId::new(data[2..=3].read_be_16()) else {
            log::debug!("invalid Eit::original_network_id");
            return None;
        };
        let segment_last_section_number = data[4];
        let last_table_id = data[5];

        let mut data = &data[6..];
        let mut events = Vec::new();
        while !data.is_empty() {
            if data.len() < 12 {
                log::debug!("invalid EitEvent");
                return None;
            }

            let Some(event_id) = EventId::new(data[0..=1].read_be_16()) else {
                log::debug!("invalid EitEvent::event_id");
                return None;
            };
            let start_time = DateTime::read_opt(data[2..=6].try_into().unwrap());
            let duration = if data[7..=9] == [0xFF; 3] {
                None
            } else {
                Some(data[7..=9].read_bcd_second())
            };
            let running_status = ((data[10] & 0b11100000) >> 5).into();
            let free_ca_mode = data[10] & 0b00010000 != 0;
            let Some((descriptors, rem)) = DescriptorBlock::read(&data[10..]) else {
                log::debug!("invalid EitEvent::descriptors");
                return None;
            };
            data = rem;

            events.push(EitEvent {
                event_id,
                start_time,
                duration,
                running_status,
                free_ca_mode,
                descriptors,
            });
        }

        Some(Eit {
            table_id: psi.table_id,
            service_id,
            section_number: syntax.section_number,
            transport_stream_id,
            original_network_id,
            segment_last_section_number,
            last_table_id,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::desc::{ServiceDescriptor, ShortEventDescriptor};
    use hex_literal::hex;

    #[test]
    fn test_sdt() {
        let buf = hex!(
            "42 F0 1F 7F E1 C1 00 00
             00 04 FF
             04 08 03 E0 0E 48 0C 01 03 41 42 43 06 44 45 46 47 48 49
             12 34 56 78"
        );
        let (section, _) = Section::parse(&buf).unwrap();
        let sdt = Sdt::read(&section).unwrap();
        assert_eq!(sdt.table_id, Sdt::TABLE_ID_ACTUAL);
        assert_eq!(sdt.transport_stream_id.get(), 0x7FE1);
        assert_eq!(sdt.original_network_id.get(), 0x0004);
        assert_eq!(sdt.services.len(), 1);

        let service = &sdt.services[0];
        assert_eq!(service.service_id.get(), 0x0408);
        assert!(service.eit_schedule_flag);
        assert!(service.eit_present_following_flag);
        assert_eq!(service.running_status, RunningStatus::Reserved);
        assert!(!service.free_ca_mode);

        let sd = service.descriptors.get::<ServiceDescriptor>().unwrap();
        assert_eq!(sd.service_provider_name.as_bytes(), b"ABC");
        assert_eq!(sd.service_name.as_bytes(), b"DEFGHI");
    }

    #[test]
    fn test_eit() {
        let buf = hex!(
            "4E F0 27 04 08 C1 00 01
             7F E1 00 04 01 4E
             80 01 DE AD 12 34 56 00 30 00 00 0C
             4D 0A 6A 70 6E 03 41 42 43 02 44 45
             12 34 56 78"
        );
        let (section, _) = Section::parse(&buf).unwrap();
        let eit = Eit::read(&section).unwrap();
        assert_eq!(eit.table_id, Eit::TABLE_ID_PF_ACTUAL);
        assert_eq!(eit.service_id.get(), 0x0408);
        assert_eq!(eit.section_number, 0);
        assert_eq!(eit.transport_stream_id.get(), 0x7FE1);
        assert_eq!(eit.original_network_id.get(), 0x0004);
        assert_eq!(eit.segment_last_section_number, 1);
        assert_eq!(eit.last_table_id, 0x4E);
        assert_eq!(eit.events.len(), 1);

        let event = &eit.events[0];
        assert_eq!(event.event_id.get(), 0x8001);
        let start = event.start_time.as_ref().unwrap();
        assert_eq!(start.to_string(), "2014-12-14 12:34:56");
        assert_eq!(event.duration, Some(30 * 60));
        assert_eq!(event.running_status, RunningStatus::Undefined);
        assert!(!event.free_ca_mode);

        let sed = event.descriptors.get::<ShortEventDescriptor>().unwrap();
        assert_eq!(sed.event_name.as_bytes(), b"ABC");
        assert_eq!(sed.text.as_bytes(), b"DE");
    }

    #[test]
    fn test_eit_undefined_time() {
        let buf = hex!(
            "4E F0 1B 04 08 C1 00 01
             7F E1 00 04 01 4E
             80 01 FF FF FF FF FF FF FF FF F0 00
             12 34 56 78"
        );
        let (section, _) = Section::parse(&buf).unwrap();
        let eit = Eit::read(&section).unwrap();
        let event = &eit.events[0];
        assert_eq!(event.start_time, None);
        assert_eq!(event.duration, None);
    }
}
