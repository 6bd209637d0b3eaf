//! ARIBで使用される言語コード。

use std::fmt;

/// ISO 639-2で規定される3文字の言語コード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LangCode(pub [u8; 3]);

impl LangCode {
    /// 日本語。
    pub const JPN: LangCode = LangCode(*b"jpn");
    /// 英語。
    pub const ENG: LangCode = LangCode(*b"eng");
    /// 外国語。
    pub const ETC: LangCode = LangCode(*b"etc");
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.escape_ascii().fmt(f)
    }
}
