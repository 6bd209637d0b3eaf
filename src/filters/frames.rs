//! セクションを解釈済みのフレームへ仕分けるフィルター。
//!
//! [`FrameFilter`]は完成したセクションをテーブルごとの構造体に変換し、
//! 文字列フィールドを8単位符号からデコードした[`Frame`]として取り出せる形で
//! キューに積む。PATを受信すると、そこから得たPMTのPIDを監視対象へ追加する。

use std::collections::VecDeque;

use thiserror::Error;

use crate::demux::{Context, Filter, Table};
use crate::eight::DecodeError;
use crate::pid::Pid;
use crate::psi::desc::{
    AudioComponentDescriptor, ContentDescriptor, ContentGenre, Descriptor, DescriptorBlock,
    ExtendedEventDescriptor, LogoTransmissionDescriptor, NetworkNameDescriptor, ServiceDescriptor,
    ServiceEntry, ServiceListDescriptor, ServiceType, ShortEventDescriptor, StreamIdDescriptor,
    StreamType, TsInformationDescriptor,
};
use crate::psi::table::{
    Eit, EventId, NetworkId, Nit, Pat, Pmt, RunningStatus, Sdt, ServiceId, TransportStreamId,
};
use crate::psi::{PsiTable, Section};
use crate::time::DateTime;

/// フレームの解釈で発生するエラー。
#[derive(Debug, Error)]
pub enum FrameError {
    /// テーブルに対してセクションの内容が不正である。
    #[error("illegal section (table_id 0x{table_id:02X}) on {pid:?}")]
    IllegalSection {
        /// セクションが運ばれてきたPID。
        pid: Pid,
        /// セクション先頭のテーブル識別。
        table_id: u8,
    },

    /// 記述子の長さが記述子ループの残りを超えている。
    #[error("truncated descriptor (tag 0x{tag:02X})")]
    TruncatedDescriptor {
        /// 壊れていた記述子のタグ。
        tag: u8,
    },

    /// 文字列フィールドのデコードに失敗した。
    #[error(transparent)]
    Text(#[from] DecodeError),
}

/// 解釈済みのセクション1つ分のデータ。
#[derive(Debug)]
pub enum Frame {
    /// PAT。
    Pat(Pat),
    /// PMT。
    Pmt(PmtFrame),
    /// NIT。
    Nit(NitFrame),
    /// SDT。
    Sdt(SdtFrame),
    /// EIT。
    Eit(EitFrame),
}

/// PMTから得たストリームの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStreamInfo {
    /// ストリーム形式種別。
    pub stream_type: StreamType,
    /// エレメンタリーPID。
    pub elementary_pid: Pid,
    /// コンポーネントタグ。
    pub component_tag: Option<u8>,
}

/// 解釈済みのPMT。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtFrame {
    /// 放送番組番号識別。
    pub program_number: ServiceId,
    /// PCRのPID。
    pub pcr_pid: Pid,
    /// ストリームを格納する配列。
    pub streams: Vec<PmtStreamInfo>,
}

/// NITから得たトランスポートストリームの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NitTsInfo {
    /// トランスポートストリーム識別。
    pub transport_stream_id: TransportStreamId,
    /// オリジナルネットワーク識別。
    pub original_network_id: NetworkId,
    /// TS名。TS情報記述子がない場合は空。
    pub ts_name: String,
    /// リモコンキー識別。
    pub remote_control_key_id: Option<u8>,
    /// TSに含まれるサービスの一覧。
    pub services: Vec<ServiceEntry>,
}

/// 解釈済みのNIT。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NitFrame {
    /// テーブル識別。
    pub table_id: u8,
    /// ネットワーク識別。
    pub network_id: NetworkId,
    /// ネットワーク名。
    pub network_name: String,
    /// TSの情報を格納する配列。
    pub transport_streams: Vec<NitTsInfo>,
}

/// SDTから得たサービスの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdtServiceInfo {
    /// サービス識別。
    pub service_id: ServiceId,
    /// サービス形式種別。サービス記述子がない場合は`None`。
    pub service_type: Option<ServiceType>,
    /// 事業者名。
    pub provider_name: String,
    /// サービス名。
    pub service_name: String,
    /// ロゴ識別。
    pub logo_id: Option<u16>,
}

/// 解釈済みのSDT。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdtFrame {
    /// テーブル識別。
    pub table_id: u8,
    /// トランスポートストリーム識別。
    pub transport_stream_id: TransportStreamId,
    /// オリジナルネットワーク識別。
    pub original_network_id: NetworkId,
    /// サービスを格納する配列。
    pub services: Vec<SdtServiceInfo>,
}

/// 拡張形式イベント記述子から得た項目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedEventItemInfo {
    /// 項目名。
    pub description: String,
    /// 項目記述。
    pub item: String,
}

/// 拡張形式イベント記述子1つ分の情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedEventInfo {
    /// 項目を格納する配列。
    pub items: Vec<ExtendedEventItemInfo>,
    /// 拡張記述。
    pub text: String,
}

/// EITから得たイベントの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
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
    /// 音声がデュアルモノかどうか。
    pub dual_mono: bool,
    /// コンテント分類を格納する配列。
    pub contents: Vec<ContentGenre>,
    /// 番組名。
    pub name: String,
    /// 番組記述。
    pub text: String,
    /// 拡張形式イベント記述子を格納する配列。
    pub extended: Vec<ExtendedEventInfo>,
}

/// 解釈済みのEIT。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EitFrame {
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
    /// イベントを格納する配列。
    pub events: Vec<EventInfo>,
}

/// セクションの仕分け先。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTag {
    /// PAT。
    Pat,
    /// PMT。
    Pmt,
    /// NIT。
    Nit,
    /// SDT。
    Sdt,
    /// EIT。
    Eit,
}

/// セクションを[`Frame`]へ変換するフィルター。
#[derive(Default)]
pub struct FrameFilter {
    queue: VecDeque<Result<Frame, FrameError>>,
}

impl FrameFilter {
    /// `FrameFilter`を生成する。
    pub fn new() -> FrameFilter {
        FrameFilter::default()
    }

    /// 仕分け済みのフレームを取り出す。
    #[inline]
    pub fn pop(&mut self) -> Option<Result<Frame, FrameError>> {
        self.queue.pop_front()
    }

    fn build(
        &mut self,
        ctx: &mut Context<FrameTag>,
        section: &[u8],
    ) -> Result<Frame, FrameError> {
        let illegal = |pid| FrameError::IllegalSection {
            pid,
            table_id: section.first().copied().unwrap_or(0xFF),
        };

        let Ok((psi, _)) = Section::parse(section) else {
            return Err(illegal(ctx.pid()));
        };

        let frame = match ctx.tag() {
            FrameTag::Pat => {
                let pat = Pat::read(&psi).ok_or_else(|| illegal(ctx.pid()))?;

                // PATから知ったPMTのPIDを監視対象に加える
                for program in &pat.pmts {
                    ctx.table().set(program.program_map_pid, FrameTag::Pmt);
                }

                Frame::Pat(pat)
            }
            FrameTag::Pmt => {
                let pmt = Pmt::read(&psi).ok_or_else(|| illegal(ctx.pid()))?;
                Frame::Pmt(build_pmt(&pmt)?)
            }
            FrameTag::Nit => {
                let nit = Nit::read(&psi).ok_or_else(|| illegal(ctx.pid()))?;
                Frame::Nit(build_nit(psi.table_id, &nit)?)
            }
            FrameTag::Sdt => {
                let sdt = Sdt::read(&psi).ok_or_else(|| illegal(ctx.pid()))?;
                Frame::Sdt(build_sdt(&sdt)?)
            }
            FrameTag::Eit => {
                let eit = Eit::read(&psi).ok_or_else(|| illegal(ctx.pid()))?;
                Frame::Eit(build_eit(&eit)?)
            }
        };
        Ok(frame)
    }
}

impl Filter for FrameFilter {
    type Tag = FrameTag;

    fn on_setup(&mut self, table: &mut Table<FrameTag>) {
        table.set(Pid::PAT, FrameTag::Pat);
        table.set(Pid::NIT, FrameTag::Nit);
        table.set(Pid::SDT, FrameTag::Sdt);
        table.set(Pid::EIT, FrameTag::Eit);
    }

    fn on_section(&mut self, ctx: &mut Context<FrameTag>, section: &[u8]) {
        let result = self.build(ctx, section);
        self.queue.push_back(result);
    }

    fn on_discontinued(&mut self, pid: Pid) {
        log::debug!("section dropped by discontinuity: {:?}", pid);
    }
}

/// 記述子群から`T`のタグと一致する記述子を読み取る。
///
/// タグが存在するのに読み取れない場合は記述子が壊れているため
/// [`FrameError::TruncatedDescriptor`]を返す。
fn read_desc<'a, T: Descriptor<'a>>(
    block: &DescriptorBlock<'a>,
) -> Result<Option<T>, FrameError> {
    match block.iter().find(|d| d.tag == T::TAG) {
        Some(d) => match T::read(d.data) {
            Some(desc) => Ok(Some(desc)),
            None => Err(FrameError::TruncatedDescriptor { tag: T::TAG }),
        },
        None => Ok(None),
    }
}

fn build_pmt(pmt: &Pmt) -> Result<PmtFrame, FrameError> {
    let streams = pmt
        .streams
        .iter()
        .map(|stream| {
            let component_tag = read_desc::<StreamIdDescriptor>(&stream.descriptors)?
                .map(|sid| sid.component_tag);
            Ok(PmtStreamInfo {
                stream_type: stream.stream_type,
                elementary_pid: stream.elementary_pid,
                component_tag,
            })
        })
        .collect::<Result<_, FrameError>>()?;

    Ok(PmtFrame {
        program_number: pmt.program_number,
        pcr_pid: pmt.pcr_pid,
        streams,
    })
}

fn build_nit(table_id: u8, nit: &Nit) -> Result<NitFrame, FrameError> {
    let network_name = match read_desc::<NetworkNameDescriptor>(&nit.network_descriptors)? {
        Some(desc) => desc.network_name.decode()?,
        None => String::new(),
    };

    let transport_streams = nit
        .transport_streams
        .iter()
        .map(|ts| {
            let (ts_name, remote_control_key_id) =
                match read_desc::<TsInformationDescriptor>(&ts.transport_descriptors)? {
                    Some(info) => (info.ts_name.decode()?, Some(info.remote_control_key_id)),
                    None => (String::new(), None),
                };
            let services = read_desc::<ServiceListDescriptor>(&ts.transport_descriptors)?
                .map(|list| list.services)
                .unwrap_or_default();

            Ok(NitTsInfo {
                transport_stream_id: ts.transport_stream_id,
                original_network_id: ts.original_network_id,
                ts_name,
                remote_control_key_id,
                services,
            })
        })
        .collect::<Result<_, FrameError>>()?;

    Ok(NitFrame {
        table_id,
        network_id: nit.network_id,
        network_name,
        transport_streams,
    })
}

fn build_sdt(sdt: &Sdt) -> Result<SdtFrame, FrameError> {
    let services = sdt
        .services
        .iter()
        .map(|service| {
            let (service_type, provider_name, service_name) =
                match read_desc::<ServiceDescriptor>(&service.descriptors)? {
                    Some(sd) => (
                        Some(sd.service_type),
                        sd.service_provider_name.decode()?,
                        sd.service_name.decode()?,
                    ),
                    None => (None, String::new(), String::new()),
                };
            let logo_id = read_desc::<LogoTransmissionDescriptor>(&service.descriptors)?
                .and_then(|ltd| ltd.logo_id());

            Ok(SdtServiceInfo {
                service_id: service.service_id,
                service_type,
                provider_name,
                service_name,
                logo_id,
            })
        })
        .collect::<Result<_, FrameError>>()?;

    Ok(SdtFrame {
        table_id: sdt.table_id,
        transport_stream_id: sdt.transport_stream_id,
        original_network_id: sdt.original_network_id,
        services,
    })
}

fn build_eit(eit: &Eit) -> Result<EitFrame, FrameError> {
    let events = eit
        .events
        .iter()
        .map(|event| {
            let (name, text) = match read_desc::<ShortEventDescriptor>(&event.descriptors)? {
                Some(sed) => (sed.event_name.decode()?, sed.text.decode()?),
                None => (String::new(), String::new()),
            };
            let contents = read_desc::<ContentDescriptor>(&event.descriptors)?
                .map(|cd| cd.genres)
                .unwrap_or_default();
            let dual_mono = read_desc::<AudioComponentDescriptor>(&event.descriptors)?
                .is_some_and(|acd| acd.is_dual_mono());

            // 拡張形式イベント記述子は複数並ぶため順番どおりに集める
            let mut extended = Vec::new();
            for raw in event.descriptors.iter() {
                if raw.tag != ExtendedEventDescriptor::TAG {
                    continue;
                }
                let Some(eed) = ExtendedEventDescriptor::read(raw.data) else {
                    return Err(FrameError::TruncatedDescriptor {
                        tag: ExtendedEventDescriptor::TAG,
                    });
                };

                let items = eed
                    .items
                    .iter()
                    .map(|item| {
                        Ok(ExtendedEventItemInfo {
                            description: item.item_description.decode()?,
                            item: item.item.decode()?,
                        })
                    })
                    .collect::<Result<_, FrameError>>()?;
                extended.push(ExtendedEventInfo {
                    items,
                    text: eed.text.decode()?,
                });
            }

            Ok(EventInfo {
                event_id: event.event_id,
                start_time: event.start_time.clone(),
                duration: event.duration,
                running_status: event.running_status,
                free_ca_mode: event.free_ca_mode,
                dual_mono,
                contents,
                name,
                text,
                extended,
            })
        })
        .collect::<Result<_, FrameError>>()?;

    Ok(EitFrame {
        table_id: eit.table_id,
        service_id: eit.service_id,
        section_number: eit.section_number,
        transport_stream_id: eit.transport_stream_id,
        original_network_id: eit.original_network_id,
        events,
    })
}
