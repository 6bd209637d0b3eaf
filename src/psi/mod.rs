//! PSI/SIセクション用のモジュール。

pub mod desc;
pub mod table;

use thiserror::Error;

use crate::utils::BytesExt;

/// [`Section::parse`]で発生するエラー。
#[derive(Debug, Error)]
pub enum SectionError {
    /// セクションの長さが足りない。
    #[error("insufficient length of a section")]
    InsufficientLength,

    /// セクションに最低限必要なバイト数がなく、壊れたセクションである。
    #[error("corrupt section")]
    Corrupted,
}

/// PSI/SIのセクション。
///
/// `data`にはセクションヘッダとCRC32を除いたセクション本体が入る。
#[derive(Debug)]
pub struct Section<'a> {
    /// テーブル識別。
    pub table_id: u8,
    /// セクションシンタクス。
    pub syntax: Option<SectionSyntax>,
    /// セクションのデータ。
    pub data: &'a [u8],
    /// CRC32。
    pub crc32: u32,
    /// セクション全体。
    raw: &'a [u8],
}

impl<'a> Section<'a> {
    /// `buf`からセクションをパースする。
    ///
    /// `buf`の長さはセクション長と一致していなければならない。
    /// CRC32の検証は行わない（[`Section::is_crc_valid`]）。
    pub fn parse(buf: &'a [u8]) -> Result<(Section<'a>, usize), SectionError> {
        if buf.len() < 3 {
            return Err(SectionError::InsufficientLength);
        }

        let table_id = buf[0];
        let section_syntax_indicator = buf[1] & 0b10000000 != 0;
        let section_length = buf[1..=2].read_be_16() & 0b0000_1111_1111_1111;

        let Some(raw) = buf.get(..3 + section_length as usize) else {
            return Err(SectionError::InsufficientLength);
        };

        let (syntax, data) = if section_syntax_indicator {
            if raw.len() < 3 + 5 + 4 {
                return Err(SectionError::Corrupted);
            }

            let table_id_extension = raw[3..=4].read_be_16();
            let version_number = (raw[5] & 0b00111110) >> 1;
            let current_next_indicator = raw[5] & 0b00000001 != 0;
            let section_number = raw[6];
            let last_section_number = raw[7];

            let ss = SectionSyntax {
                table_id_extension,
                version_number,
                current_next_indicator,
                section_number,
                last_section_number,
            };
            (Some(ss), &raw[8..raw.len() - 4])
        } else {
            if raw.len() < 3 + 4 {
                return Err(SectionError::Corrupted);
            }

            (None, &raw[3..raw.len() - 4])
        };

        let crc32 = raw[raw.len() - 4..].read_be_32();

        Ok((
            Section {
                table_id,
                syntax,
                data,
                crc32,
                raw,
            },
            raw.len(),
        ))
    }

    /// セクション全体をバイト列で返す。
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// セクション末尾のCRC32が整合しているかを返す。
    #[inline]
    pub fn is_crc_valid(&self) -> bool {
        crate::crc::matches(self.raw)
    }
}

/// PSI/SIセクションのシンタクス。
#[derive(Debug)]
pub struct SectionSyntax {
    /// テーブル識別拡張。
    pub table_id_extension: u16,
    /// バージョン番号（5ビット）。
    pub version_number: u8,
    /// カレントネクスト指示。
    pub current_next_indicator: bool,
    /// セクション番号。
    pub section_number: u8,
    /// 最終セクション番号。
    pub last_section_number: u8,
}

/// PSI/SIテーブルを表すトレイト。
pub trait PsiTable<'a>: Sized {
    /// `psi`からテーブルを読み取る。
    fn read(psi: &Section<'a>) -> Option<Self>;
}
