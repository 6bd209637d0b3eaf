//! ARIB STD-B10で規定される記述子と関連する型の定義。

use std::fmt;

use crate::eight::AribStr;
use crate::lang::LangCode;
use crate::utils::BytesExt;

use super::base::Descriptor;

/// ストリーム形式種別。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamType(pub u8);

impl StreamType {
    /// ITU-T勧告H.262|ISO/IEC 13818-2映像。
    pub const MPEG2_VIDEO: StreamType = StreamType(0x02);
    /// プライベートデータを収容したPESパケット。字幕はこれで送られる。
    pub const PRIVATE_DATA: StreamType = StreamType(0x06);
    /// ISO/IEC 13818-7音声（ADTSトランスポート構造）。
    pub const AAC: StreamType = StreamType(0x0F);
    /// ISO/IEC 13818-6（タイプD）。データ放送はこれで送られる。
    pub const DATA_CARROUSEL: StreamType = StreamType(0x0D);
    /// ITU-T勧告H.264|ISO/IEC 14496-10映像。
    pub const H264: StreamType = StreamType(0x1B);
    /// HEVC映像ストリーム。
    pub const H265: StreamType = StreamType(0x24);

    /// ストリーム形式が映像を示す場合に`true`を返す。
    pub fn is_video(&self) -> bool {
        matches!(
            *self,
            StreamType::MPEG2_VIDEO | StreamType::H264 | StreamType::H265
        )
    }

    /// ストリーム形式が音声を示す場合に`true`を返す。
    pub fn is_audio(&self) -> bool {
        matches!(*self, StreamType::AAC)
    }
}

impl fmt::Debug for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamType(0x{:02X})", self.0)
    }
}

/// ネットワーク名記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct NetworkNameDescriptor<'a> {
    /// ネットワーク名。
    pub network_name: &'a AribStr,
}

impl<'a> Descriptor<'a> for NetworkNameDescriptor<'a> {
    const TAG: u8 = 0x40;

    fn read(data: &'a [u8]) -> Option<NetworkNameDescriptor<'a>> {
        Some(NetworkNameDescriptor {
            network_name: AribStr::from_bytes(data),
        })
    }
}

/// サービス記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceDescriptor<'a> {
    /// サービス形式種別。
    pub service_type: super::ServiceType,
    /// 事業者名。
    pub service_provider_name: &'a AribStr,
    /// サービス名。
    pub service_name: &'a AribStr,
}

impl<'a> Descriptor<'a> for ServiceDescriptor<'a> {
    const TAG: u8 = 0x48;

    fn read(data: &'a [u8]) -> Option<ServiceDescriptor<'a>> {
        let [service_type, service_provider_name_length, ref data @ ..] = *data else {
            log::debug!("invalid ServiceDescriptor");
            return None;
        };
        let Some((service_provider_name, data)) =
            data.split_at_checked(service_provider_name_length as usize)
        else {
            log::debug!("invalid ServiceDescriptor::service_provider_name");
            return None;
        };
        let [service_name_length, ref service_name @ ..] = *data else {
            log::debug!("invalid ServiceDescriptor::service_name_length");
            return None;
        };
        if service_name.len() != service_name_length as usize {
            log::debug!("invalid ServiceDescriptor::service_name");
            return None;
        }

        Some(ServiceDescriptor {
            service_type: super::ServiceType(service_type),
            service_provider_name: AribStr::from_bytes(service_provider_name),
            service_name: AribStr::from_bytes(service_name),
        })
    }
}

/// 短形式イベント記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct ShortEventDescriptor<'a> {
    /// 言語コード。
    pub lang_code: LangCode,
    /// 番組名。
    pub event_name: &'a AribStr,
    /// 番組記述。
    pub text: &'a AribStr,
}

impl<'a> Descriptor<'a> for ShortEventDescriptor<'a> {
    const TAG: u8 = 0x4D;

    fn read(data: &'a [u8]) -> Option<ShortEventDescriptor<'a>> {
        if data.len() < 4 {
            log::debug!("invalid ShortEventDescriptor");
            return None;
        }

        let lang_code = LangCode(data[0..=2].try_into().unwrap());
        let event_name_length = data[3];
        let Some((event_name, data)) = data[4..].split_at_checked(event_name_length as usize)
        else {
            log::debug!("invalid ShortEventDescriptor::event_name");
            return None;
        };
        let event_name = AribStr::from_bytes(event_name);
        let [text_length, ref text @ ..] = *data else {
            log::debug!("invalid ShortEventDescriptor::text_length");
            return None;
        };
        if text.len() != text_length as usize {
            log::debug!("invalid ShortEventDescriptor::text");
            return None;
        }
        let text = AribStr::from_bytes(text);

        Some(ShortEventDescriptor {
            lang_code,
            event_name,
            text,
        })
    }
}

/// 拡張形式イベント記述子における項目。
#[derive(Debug, PartialEq, Eq)]
pub struct ExtendedEventItem<'a> {
    /// 項目名。
    pub item_description: &'a AribStr,
    /// 項目記述。
    pub item: &'a AribStr,
}

/// 拡張形式イベント記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct ExtendedEventDescriptor<'a> {
    /// 記述子番号（4ビット）。
    pub descriptor_number: u8,
    /// 最終記述子番号（4ビット）。
    pub last_descriptor_number: u8,
    /// 言語コード。
    pub lang_code: LangCode,
    /// 項目を格納する配列。
    pub items: Vec<ExtendedEventItem<'a>>,
    /// 拡張記述。
    pub text: &'a AribStr,
}

impl<'a> Descriptor<'a> for ExtendedEventDescriptor<'a> {
    const TAG: u8 = 0x4E;

    fn read(data: &'a [u8]) -> Option<ExtendedEventDescriptor<'a>> {
        if data.len() < 5 {
            log::debug!("invalid ExtendedEventDescriptor");
            return None;
        }

        let descriptor_number = (data[0] & 0b11110000) >> 4;
        let last_descriptor_number = data[0] & 0b00001111;
        let lang_code = LangCode(data[1..=3].try_into().unwrap());
        let length_of_items = data[4];
        let Some((mut data, rem)) = data[5..].split_at_checked(length_of_items as usize) else {
            log::debug!("invalid ExtendedEventDescriptor::length_of_items");
            return None;
        };

        let mut items = Vec::new();
        while !data.is_empty() {
            let [item_description_length, ref rem @ ..] = *data else {
                log::debug!("invalid ExtendedEventDescriptor::item_description_length");
                return None;
            };
            let Some((item_description, rem)) =
                rem.split_at_checked(item_description_length as usize)
            else {
                log::debug!("invalid ExtendedEventDescriptor::item_description");
                return None;
            };
            let item_description = AribStr::from_bytes(item_description);

            let [item_length, ref rem @ ..] = *rem else {
                log::debug!("invalid ExtendedEventDescriptor::item_length");
                return None;
            };
            let Some((item, rem)) = rem.split_at_checked(item_length as usize) else {
                log::debug!("invalid ExtendedEventDescriptor::item");
                return None;
            };
            let item = AribStr::from_bytes(item);
            data = rem;

            items.push(ExtendedEventItem {
                item_description,
                item,
            });
        }

        let [text_length, ref text @ ..] = *rem else {
            log::debug!("invalid ExtendedEventDescriptor::text_length");
            return None;
        };
        if text.len() != text_length as usize {
            log::debug!("invalid ExtendedEventDescriptor::text");
            return None;
        }
        let text = AribStr::from_bytes(text);

        Some(ExtendedEventDescriptor {
            descriptor_number,
            last_descriptor_number,
            lang_code,
            items,
            text,
        })
    }
}

/// コンテント分類。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGenre {
    /// ジャンル1（4ビット）。
    pub large_genre_classification: u8,
    /// ジャンル2（4ビット）。
    pub middle_genre_classification: u8,
    /// ユーザジャンル（4ビット）。
    pub user_genre_1: u8,
    /// ユーザジャンル（4ビット）。
    pub user_genre_2: u8,
}

/// コンテント記述子。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// [`ContentGenre`]の配列。
    pub genres: Vec<ContentGenre>,
}

impl Descriptor<'_> for ContentDescriptor {
    const TAG: u8 = 0x54;

    fn read(data: &[u8]) -> Option<ContentDescriptor> {
        // genresは7要素以下
        if data.len() > 2 * 7 {
            log::debug!("invalid ContentDescriptor");
            return None;
        }

        let genres = data
            .chunks_exact(2)
            .map(|chunk| {
                let large_genre_classification = (chunk[0] & 0b11110000) >> 4;
                let middle_genre_classification = chunk[0] & 0b00001111;
                let user_genre_1 = (chunk[1] & 0b11110000) >> 4;
                let user_genre_2 = chunk[1] & 0b00001111;

                ContentGenre {
                    large_genre_classification,
                    middle_genre_classification,
                    user_genre_1,
                    user_genre_2,
                }
            })
            .collect();

        Some(ContentDescriptor { genres })
    }
}

/// 音声コンポーネント記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct AudioComponentDescriptor<'a> {
    /// コンポーネント内容（4ビット）。
    pub stream_content: u8,
    /// コンポーネント種別。下位5ビットが音声モードを表し、0b00010はデュアルモノ。
    pub component_type: u8,
    /// コンポーネントタグ。
    pub component_tag: u8,
    /// ストリーム形式種別。
    pub stream_type: StreamType,
    /// サイマルキャストグループ識別。
    pub simulcast_group_tag: u8,
    /// 主コンポーネントフラグ。
    pub main_component_flag: bool,
    /// 音質表示（2ビット）。
    pub quality_indicator: u8,
    /// サンプリング周波数（3ビット）。
    pub sampling_rate: u8,
    /// 言語コード。
    pub lang_code: LangCode,
    /// 言語コードその2。ES多言語フラグが立つ場合のみ存在する。
    pub lang_code_2: Option<LangCode>,
    /// コンポーネント記述。
    pub text: &'a AribStr,
}

impl<'a> AudioComponentDescriptor<'a> {
    /// デュアルモノの音声モード。
    pub const MODE_DUAL_MONO: u8 = 0b00010;

    /// 音声モードがデュアルモノかどうかを返す。
    #[inline]
    pub fn is_dual_mono(&self) -> bool {
        self.component_type & 0b00011111 == Self::MODE_DUAL_MONO
    }
}

impl<'a> Descriptor<'a> for AudioComponentDescriptor<'a> {
    const TAG: u8 = 0xC4;

    fn read(data: &'a [u8]) -> Option<AudioComponentDescriptor<'a>> {
        if data.len() < 9 {
            log::debug!("invalid AudioComponentDescriptor");
            return None;
        }

        let stream_content = data[0] & 0b00001111;
        let component_type = data[1];
        let component_tag = data[2];
        let stream_type = StreamType(data[3]);
        let simulcast_group_tag = data[4];
        let es_multi_lingual_flag = (data[5] & 0b10000000) != 0;
        let main_component_flag = (data[5] & 0b01000000) != 0;
        let quality_indicator = (data[5] & 0b00110000) >> 4;
        let sampling_rate = (data[5] & 0b00001110) >> 1;
        let lang_code = LangCode(data[6..=8].try_into().unwrap());

        let mut data = &data[9..];
        let lang_code_2 = if es_multi_lingual_flag {
            let Some((lang_code, rem)) = data.split_at_checked(3) else {
                log::debug!("invalid AudioComponentDescriptor::ISO_639_language_code_2");
                return None;
            };
            let lang_code = LangCode(lang_code.try_into().unwrap());
            data = rem;

            Some(lang_code)
        } else {
            None
        };

        let text = AribStr::from_bytes(data);

        Some(AudioComponentDescriptor {
            stream_content,
            component_type,
            component_tag,
            stream_type,
            simulcast_group_tag,
            main_component_flag,
            quality_indicator,
            sampling_rate,
            lang_code,
            lang_code_2,
            text,
        })
    }
}

/// TS情報記述子における伝送種別。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsInformationTransmissionType {
    /// 伝送種別情報。
    pub transmission_type_info: u8,
    /// サービス識別を格納する配列。
    pub service_ids: Vec<u16>,
}

/// TS情報記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct TsInformationDescriptor<'a> {
    /// リモコンキー識別。
    pub remote_control_key_id: u8,
    /// TS名記述。
    pub ts_name: &'a AribStr,
    /// 伝送種別を格納する配列。
    pub transmission_types: Vec<TsInformationTransmissionType>,
}

impl<'a> Descriptor<'a> for TsInformationDescriptor<'a> {
    const TAG: u8 = 0xCD;

    fn read(data: &'a [u8]) -> Option<TsInformationDescriptor<'a>> {
        if data.len() < 2 {
            log::debug!("invalid TsInformationDescriptor");
            return None;
        }

        let remote_control_key_id = data[0];
        let length_of_ts_name = (data[1] & 0b11111100) >> 2;
        let transmission_type_count = data[1] & 0b00000011;
        let Some((ts_name, mut data)) = data[2..].split_at_checked(length_of_ts_name as usize)
        else {
            log::debug!("invalid TsInformationDescriptor::ts_name");
            return None;
        };
        let ts_name = AribStr::from_bytes(ts_name);

        let mut transmission_types = Vec::with_capacity(transmission_type_count as usize);
        for _ in 0..transmission_type_count {
            if data.len() < 2 {
                log::debug!("invalid TsInformationTransmissionType");
                return None;
            }

            let transmission_type_info = data[0];
            let num_of_service = data[1] as usize;
            let Some((service_ids, rem)) = data[2..].split_at_checked(num_of_service * 2) else {
                log::debug!("invalid TsInformationTransmissionType::service_ids");
                return None;
            };
            let service_ids = service_ids.chunks_exact(2).map(<[u8]>::read_be_16).collect();
            data = rem;

            transmission_types.push(TsInformationTransmissionType {
                transmission_type_info,
                service_ids,
            });
        }

        Some(TsInformationDescriptor {
            remote_control_key_id,
            ts_name,
            transmission_types,
        })
    }
}

/// ロゴ伝送記述子におけるCDT伝送方式1。
///
/// CDTをダウンロードデータ識別で直接参照する場合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoTransmissionCdt1 {
    /// ロゴ識別（9ビット）。
    pub logo_id: u16,
    /// ロゴバージョン番号（12ビット）。
    pub logo_version: u16,
    /// ダウンロードデータ識別。
    pub download_data_id: u16,
}

/// ロゴ伝送記述子。
#[derive(Debug, PartialEq, Eq)]
pub enum LogoTransmissionDescriptor<'a> {
    /// CDT伝送方式1。
    Cdt1(LogoTransmissionCdt1),
    /// CDT伝送方式2。ロゴ識別（9ビット）による間接参照。
    Cdt2(u16),
    /// 簡易ロゴ方式。
    Simple(&'a [u8]),
    /// 予約。
    Unknown(&'a [u8]),
}

impl<'a> LogoTransmissionDescriptor<'a> {
    /// ロゴ識別を返す。
    ///
    /// 簡易ロゴ方式等でロゴ識別がない場合は`None`を返す。
    pub fn logo_id(&self) -> Option<u16> {
        match *self {
            LogoTransmissionDescriptor::Cdt1(ref cdt1) => Some(cdt1.logo_id),
            LogoTransmissionDescriptor::Cdt2(logo_id) => Some(logo_id),
            _ => None,
        }
    }
}

impl<'a> Descriptor<'a> for LogoTransmissionDescriptor<'a> {
    const TAG: u8 = 0xCF;

    fn read(data: &'a [u8]) -> Option<LogoTransmissionDescriptor<'a>> {
        let [logo_transmission_type, ref data @ ..] = *data else {
            log::debug!("invalid LogoTransmissionDescriptor");
            return None;
        };

        let descriptor = match logo_transmission_type {
            0x01 => {
                if data.len() != 6 {
                    log::debug!("invalid LogoTransmissionCdt1");
                    return None;
                }

                let logo_id = data[0..=1].read_be_16() & 0b0000_0001_1111_1111;
                let logo_version = data[2..=3].read_be_16() & 0b0000_1111_1111_1111;
                let download_data_id = data[4..=5].read_be_16();

                LogoTransmissionDescriptor::Cdt1(LogoTransmissionCdt1 {
                    logo_id,
                    logo_version,
                    download_data_id,
                })
            }
            0x02 => {
                if data.len() != 2 {
                    log::debug!("invalid LogoTransmissionDescriptor::Cdt2");
                    return None;
                }

                LogoTransmissionDescriptor::Cdt2(data[0..=1].read_be_16() & 0b0000_0001_1111_1111)
            }
            0x03 => LogoTransmissionDescriptor::Simple(data),
            _ => LogoTransmissionDescriptor::Unknown(data),
        };
        Some(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_service_descriptor() {
        let data = hex!("01 02 41 42 03 43 44 45");
        let sd = ServiceDescriptor::read(&data).unwrap();
        assert_eq!(sd.service_type, crate::psi::desc::ServiceType::DIGITAL_TV);
        assert_eq!(sd.service_provider_name.as_bytes(), b"AB");
        assert_eq!(sd.service_name.as_bytes(), b"CDE");

        assert!(ServiceDescriptor::read(&hex!("01 05 41")).is_none());
    }

    #[test]
    fn test_short_event_descriptor() {
        let data = hex!("6A 70 6E 02 41 42 01 43");
        let sed = ShortEventDescriptor::read(&data).unwrap();
        assert_eq!(sed.lang_code, LangCode::JPN);
        assert_eq!(sed.event_name.as_bytes(), b"AB");
        assert_eq!(sed.text.as_bytes(), b"C");

        assert!(ShortEventDescriptor::read(&hex!("6A 70 6E 05 41")).is_none());
    }

    #[test]
    fn test_extended_event_descriptor() {
        let data = hex!("01 6A 70 6E 06 01 41 03 42 43 44 02 45 46");
        let eed = ExtendedEventDescriptor::read(&data).unwrap();
        assert_eq!(eed.descriptor_number, 0);
        assert_eq!(eed.last_descriptor_number, 1);
        assert_eq!(eed.lang_code, LangCode::JPN);
        assert_eq!(eed.items.len(), 1);
        assert_eq!(eed.items[0].item_description.as_bytes(), b"A");
        assert_eq!(eed.items[0].item.as_bytes(), b"BCD");
        assert_eq!(eed.text.as_bytes(), b"EF");
    }

    #[test]
    fn test_content_descriptor() {
        let data = hex!("70 FF 72 FF");
        let cd = ContentDescriptor::read(&data).unwrap();
        assert_eq!(cd.genres.len(), 2);
        assert_eq!(cd.genres[0].large_genre_classification, 0x7);
        assert_eq!(cd.genres[0].middle_genre_classification, 0x0);
        assert_eq!(cd.genres[1].middle_genre_classification, 0x2);

        assert!(ContentDescriptor::read(&[0; 16]).is_none());
    }

    #[test]
    fn test_audio_component_descriptor() {
        let data = hex!("01 02 10 0F 00 10 6A 70 6E");
        let acd = AudioComponentDescriptor::read(&data).unwrap();
        assert_eq!(acd.stream_content, 0x1);
        assert_eq!(acd.component_type, 0x02);
        assert!(acd.is_dual_mono());
        assert_eq!(acd.component_tag, 0x10);
        assert_eq!(acd.stream_type, StreamType::AAC);
        assert!(!acd.main_component_flag);
        assert_eq!(acd.lang_code, LangCode::JPN);
        assert_eq!(acd.lang_code_2, None);
        assert!(acd.text.is_empty());

        // ES多言語フラグ付き
        let data = hex!("01 42 11 0F 00 E0 6A 70 6E 65 6E 67 41");
        let acd = AudioComponentDescriptor::read(&data).unwrap();
        assert!(!acd.is_dual_mono());
        assert!(acd.main_component_flag);
        assert_eq!(acd.lang_code_2, Some(LangCode::ENG));
        assert_eq!(acd.text.as_bytes(), b"A");
    }

    #[test]
    fn test_ts_information_descriptor() {
        let data = hex!("01 0D 41 42 43 01 02 04 01 04 02");
        let tid = TsInformationDescriptor::read(&data).unwrap();
        assert_eq!(tid.remote_control_key_id, 1);
        assert_eq!(tid.ts_name.as_bytes(), b"ABC");
        assert_eq!(tid.transmission_types.len(), 1);
        assert_eq!(tid.transmission_types[0].transmission_type_info, 0x01);
        assert_eq!(tid.transmission_types[0].service_ids, [0x0401, 0x0402]);
    }

    #[test]
    fn test_logo_transmission_descriptor() {
        let data = hex!("01 01 30 00 01 00 05");
        let ltd = LogoTransmissionDescriptor::read(&data).unwrap();
        assert_eq!(
            ltd,
            LogoTransmissionDescriptor::Cdt1(LogoTransmissionCdt1 {
                logo_id: 0x130,
                logo_version: 0x001,
                download_data_id: 0x0005,
            })
        );
        assert_eq!(ltd.logo_id(), Some(0x130));

        let data = hex!("02 01 30");
        let ltd = LogoTransmissionDescriptor::read(&data).unwrap();
        assert_eq!(ltd.logo_id(), Some(0x130));

        let data = hex!("03 41 42");
        let ltd = LogoTransmissionDescriptor::read(&data).unwrap();
        assert_matches::assert_matches!(ltd, LogoTransmissionDescriptor::Simple(b"AB"));
    }
}
