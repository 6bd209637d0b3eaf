//! MPEG-2 SystemsおよびDVBで規定される記述子の定義。

use std::fmt;

use crate::utils::BytesExt;

use super::base::Descriptor;

/// サービス形式種別。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceType(pub u8);

impl ServiceType {
    /// デジタルTVサービス。
    pub const DIGITAL_TV: ServiceType = ServiceType(0x01);
    /// デジタル音声サービス。
    pub const DIGITAL_AUDIO: ServiceType = ServiceType(0x02);
    /// データサービス。
    pub const DATA: ServiceType = ServiceType(0xC0);
    /// 臨時映像サービス。
    pub const TEMPORARY_VIDEO: ServiceType = ServiceType(0xA1);
    /// 臨時音声サービス。
    pub const TEMPORARY_AUDIO: ServiceType = ServiceType(0xA2);
    /// 臨時データサービス。
    pub const TEMPORARY_DATA: ServiceType = ServiceType(0xA3);
    /// エンジニアリングサービス。
    pub const ENGINEERING: ServiceType = ServiceType(0xA4);
    /// プロモーション映像サービス。
    pub const PROMOTION_VIDEO: ServiceType = ServiceType(0xA5);
    /// プロモーション音声サービス。
    pub const PROMOTION_AUDIO: ServiceType = ServiceType(0xA6);
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceType(0x{:02X})", self.0)
    }
}

/// サービスリスト記述子におけるサービス。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// サービス識別。
    pub service_id: u16,
    /// サービス形式種別。
    pub service_type: ServiceType,
}

/// サービスリスト記述子。
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceListDescriptor {
    /// サービスを格納する配列。
    pub services: Vec<ServiceEntry>,
}

impl Descriptor<'_> for ServiceListDescriptor {
    const TAG: u8 = 0x41;

    fn read(data: &[u8]) -> Option<ServiceListDescriptor> {
        let services = data
            .chunks_exact(3)
            .map(|chunk| {
                let service_id = chunk[0..=1].read_be_16();
                let service_type = ServiceType(chunk[2]);
                ServiceEntry {
                    service_id,
                    service_type,
                }
            })
            .collect();

        Some(ServiceListDescriptor { services })
    }
}

/// ストリーム識別記述子。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdDescriptor {
    /// コンポーネントタグ。
    pub component_tag: u8,
}

impl Descriptor<'_> for StreamIdDescriptor {
    const TAG: u8 = 0x52;

    fn read(data: &[u8]) -> Option<StreamIdDescriptor> {
        let [component_tag] = *data else {
            log::debug!("invalid StreamIdDescriptor");
            return None;
        };

        Some(StreamIdDescriptor { component_tag })
    }
}
