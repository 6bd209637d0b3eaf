//! 8単位符号のデコード。
//!
//! G0～G3の4つのバッファに図形集合を指示し、
//! GL（0x21～0x7E）とGR（0xA1～0xFE）のそれぞれに呼び出して1文字ずつ復号する。
//! 初期状態はG0＝漢字、G1＝英数、G2＝平仮名、G3＝片仮名、GL＝G0、GR＝G2。

use std::slice;

use thiserror::Error;

use super::table;

/// 8単位符号のデコードで発生するエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// 解釈できないエスケープシーケンス。
    ///
    /// 内包する値はESCに後続するバイト。
    #[error("unknown escape sequence: {0:02X?}")]
    UnknownEscape(Vec<u8>),

    /// 指示された終端符号に対応する図形集合がない。
    ///
    /// 内包する値は終端符号。
    #[error("unsupported character set: 0x{0:02X}")]
    UnsupportedCharset(u8),

    /// 複数バイトの符号の途中で符号列が終わった。
    #[error("truncated input")]
    TruncatedInput,
}

/// 符号の指示先。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Designator {
    G0 = 0,
    G1 = 1,
    G2 = 2,
    G3 = 3,
}

/// 文字符号集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphicSet {
    /// 漢字、2バイト符号。
    Kanji,
    /// 英数、1バイト符号。
    Alnum,
    /// 平仮名、1バイト符号。
    Hira,
    /// 片仮名、1バイト符号。
    Kata,
    /// JIS X 0201片仮名、1バイト符号。
    JisXKata,
    /// JIS互換漢字1面、2バイト符号。
    JisKanjiPlane1,
    /// JIS互換漢字2面、2バイト符号。
    JisKanjiPlane2,
    /// 追加記号（外字）、2バイト符号。
    ExtraSymbols,
    /// モザイク、1バイト符号。無視される。
    Mosaic,
    /// DRCS、1バイト符号。無視される。
    Drcs1,
    /// DRCS、2バイト符号。無視される。
    Drcs2,
}

/// `bytes`を8単位符号としてデコードし`String`に変換する。
///
/// 未割り当ての文字符号は[`U+FFFD REPLACEMENT
/// CHARACTER`][`char::REPLACEMENT_CHARACTER`]に、
/// 未割り当ての外字は`{gaiji XXXX}`の形式に変換される。
pub fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    decoder.run()?;
    Ok(decoder.buf)
}

/// ARIB STD-B24の8単位符号をデコードする。
///
/// 状態は一度のデコードの間だけ保持され、符号列をまたいで引き継がれることはない。
struct Decoder<'a> {
    iter: slice::Iter<'a, u8>,
    graphic_sets: [GraphicSet; 4],
    gl: Designator,
    gr: Designator,
    /// シングルシフト前のGL。1文字の復号で元に戻す。
    gl_saved: Option<Designator>,
    /// 次の図形文字を出力する回数。
    repeat: usize,
    in_macro_def: bool,
    buf: String,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Decoder<'a> {
        Decoder {
            iter: bytes.iter(),
            graphic_sets: [
                GraphicSet::Kanji,
                GraphicSet::Alnum,
                GraphicSet::Hira,
                GraphicSet::Kata,
            ],
            gl: Designator::G0,
            gr: Designator::G2,
            gl_saved: None,
            repeat: 1,
            in_macro_def: false,
            buf: String::new(),
        }
    }

    #[inline]
    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        self.iter
            .next()
            .copied()
            .ok_or(DecodeError::TruncatedInput)
    }

    /// 長さが最低`n`あると分かっている場合に`n`個の符号をスキップする。
    fn skip(&mut self, n: usize) {
        let _r = self.iter.nth(n - 1);
        debug_assert!(_r.is_some());
    }

    fn run(&mut self) -> Result<(), DecodeError> {
        while let Some(&b) = self.iter.next() {
            if self.in_macro_def {
                // マクロ定義中の符号はすべて読み捨てる
                if b == 0x95 && self.next_byte()? == 0x4F {
                    self.in_macro_def = false;
                }
                continue;
            }

            match b {
                // GL
                0x21..=0x7E => {
                    self.graphic(self.gl, b)?;
                    // シングルシフトは1文字で解除
                    if let Some(saved) = self.gl_saved.take() {
                        self.gl = saved;
                    }
                }

                // GR
                0xA1..=0xFE => self.graphic(self.gr, b & 0x7F)?,

                // C0

                // LS1
                0x0E => self.gl = Designator::G1,
                // LS0
                0x0F => self.gl = Designator::G0,
                // SS2
                0x19 => self.single_shift(Designator::G2),
                // SS3
                0x1D => self.single_shift(Designator::G3),
                // ESC
                0x1B => self.esc()?,
                // CS
                0x0C => self.buf.push('\x0C'),
                // APR
                0x0D => self.buf.push('\n'),
                // PAPF（パラメータ1つ）
                0x16 => {
                    self.next_byte()?;
                }
                // APS（パラメータ2つ）
                0x1C => {
                    self.next_byte()?;
                    self.next_byte()?;
                }
                // SP
                0x20 => self.emit_char(' '),
                // 他のC0制御符号は無視
                0x00..=0x1F => log::trace!("ignored C0: {:02X}", b),

                // DEL
                0x7F => {}

                // C1

                // COL/FLC/POL/WMM/HLC・SZX（パラメータ1つ）
                0x8B | 0x90 | 0x91 | 0x93 | 0x94 | 0x97 => {
                    self.next_byte()?;
                }
                // TIME（パラメータ2つ）
                0x9D => {
                    self.next_byte()?;
                    self.next_byte()?;
                }
                // CDC
                0x92 => {
                    if self.next_byte()? & 0xF0 == 0x20 {
                        self.next_byte()?;
                    }
                }
                // MACRO
                0x95 => {
                    if self.next_byte()? == 0x40 {
                        self.in_macro_def = true;
                    }
                }
                // RPC
                0x98 => match self.next_byte()? & 0x3F {
                    // 行末までの繰り返しは改行扱い
                    0 => {
                        self.buf.push('\n');
                        self.repeat = 1;
                    }
                    n => self.repeat = n as usize,
                },
                // 他のC1制御符号は無視
                0x80..=0xA0 => log::trace!("ignored C1: {:02X}", b),

                0xFF => log::trace!("ignored byte: {:02X}", b),
            }
        }

        Ok(())
    }

    fn single_shift(&mut self, g: Designator) {
        if self.gl_saved.is_none() {
            self.gl_saved = Some(self.gl);
        }
        self.gl = g;
    }

    /// 2バイト符号の2バイト目を読み取る。
    ///
    /// GL・GRどちらの領域の値も受け付け、どちらでもない値は`None`を返す。
    fn next_multi(&mut self) -> Result<Option<u8>, DecodeError> {
        match self.next_byte()? {
            c2 @ (0x21..=0x7E | 0xA1..=0xFE) => Ok(Some(c2 & 0x7F)),
            c2 => {
                log::trace!("invalid second byte: {:02X}", c2);
                Ok(None)
            }
        }
    }

    /// 指示先`g`の図形集合で符号`c1`から始まる1文字を復号する。
    fn graphic(&mut self, g: Designator, c1: u8) -> Result<(), DecodeError> {
        match self.graphic_sets[g as usize] {
            GraphicSet::Alnum => self.emit_char(table::decode_alnum(c1)),
            GraphicSet::Hira => self.emit_opt(table::decode_hira(c1)),
            GraphicSet::Kata => self.emit_opt(table::decode_kata(c1)),
            GraphicSet::JisXKata => self.emit_opt(table::decode_jis_x_kata(c1)),
            GraphicSet::Kanji | GraphicSet::JisKanjiPlane1 => {
                if let Some(c2) = self.next_multi()? {
                    self.emit_opt(table::decode_kanji(c1, c2));
                }
            }
            GraphicSet::JisKanjiPlane2 => {
                if let Some(c2) = self.next_multi()? {
                    self.emit_opt(table::decode_kanji_plane2(c1, c2));
                }
            }
            GraphicSet::ExtraSymbols => {
                if let Some(c2) = self.next_multi()? {
                    let code = u16::from_be_bytes([c1, c2]);
                    match table::gaiji(code) {
                        Some(s) => self.emit_str(s),
                        None => {
                            let s = format!("{{gaiji {:04X}}}", code);
                            self.emit_str(&s);
                        }
                    }
                }
            }

            // モザイクと1バイトDRCSは出力なし
            GraphicSet::Mosaic | GraphicSet::Drcs1 => self.repeat = 1,
            // 2バイトDRCSは2バイト目も読み捨てる
            GraphicSet::Drcs2 => {
                self.next_multi()?;
                self.repeat = 1;
            }
        }
        Ok(())
    }

    #[inline]
    fn emit_opt(&mut self, c: Option<char>) {
        self.emit_char(c.unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    fn emit_char(&mut self, c: char) {
        for _ in 0..self.repeat {
            self.buf.push(c);
        }
        self.repeat = 1;
    }

    fn emit_str(&mut self, s: &str) {
        for _ in 0..self.repeat {
            self.buf.push_str(s);
        }
        self.repeat = 1;
    }

    /// エスケープシーケンスを読み取る。
    fn esc(&mut self) -> Result<(), DecodeError> {
        fn two_byte_set(f: u8) -> Result<GraphicSet, DecodeError> {
            match f {
                0x42 => Ok(GraphicSet::Kanji),
                0x39 => Ok(GraphicSet::JisKanjiPlane1),
                0x3A => Ok(GraphicSet::JisKanjiPlane2),
                0x3B => Ok(GraphicSet::ExtraSymbols),
                _ => Err(DecodeError::UnsupportedCharset(f)),
            }
        }
        fn one_byte_set(f: u8) -> Result<GraphicSet, DecodeError> {
            match f {
                0x4A | 0x36 => Ok(GraphicSet::Alnum),
                0x30 | 0x37 => Ok(GraphicSet::Hira),
                0x31 | 0x38 => Ok(GraphicSet::Kata),
                0x49 => Ok(GraphicSet::JisXKata),
                0x32..=0x35 => Ok(GraphicSet::Mosaic),
                _ => Err(DecodeError::UnsupportedCharset(f)),
            }
        }

        match *self.iter.as_slice() {
            // 符号の呼び出し

            // LS2
            [0x6E, ..] => {
                self.skip(1);
                self.gl = Designator::G2;
            }
            // LS3
            [0x6F, ..] => {
                self.skip(1);
                self.gl = Designator::G3;
            }
            // LS1R
            [0x7E, ..] => {
                self.skip(1);
                self.gr = Designator::G1;
            }
            // LS2R
            [0x7D, ..] => {
                self.skip(1);
                self.gr = Designator::G2;
            }
            // LS3R
            [0x7C, ..] => {
                self.skip(1);
                self.gr = Designator::G3;
            }

            // シーケンスの途中で符号列が終了した
            [] => return Err(DecodeError::TruncatedInput),
            [0x24] | [0x24, 0x28..=0x2B] | [0x24, 0x28..=0x2B, 0x20] => {
                return Err(DecodeError::TruncatedInput)
            }
            [0x28..=0x2B] | [0x28..=0x2B, 0x20] => return Err(DecodeError::TruncatedInput),

            // 符号の指示

            // 2バイトDRCS：ESC 24 28-2B 20 F
            [0x24, g @ 0x28..=0x2B, 0x20, f, ..] => {
                self.skip(4);
                if f != 0x40 {
                    return Err(DecodeError::UnsupportedCharset(f));
                }
                self.designate(g, GraphicSet::Drcs2);
            }
            // 2バイトGセット（G1～G3）：ESC 24 29-2B F
            [0x24, g @ 0x29..=0x2B, f, ..] => {
                self.skip(3);
                self.designate(g, two_byte_set(f)?);
            }
            // 2バイトGセット（G0）：ESC 24 F
            [0x24, f, ..] => {
                self.skip(2);
                self.designate(0x28, two_byte_set(f)?);
            }
            // 1バイトDRCS：ESC 28-2B 20 F
            [g @ 0x28..=0x2B, 0x20, _, ..] => {
                self.skip(3);
                self.designate(g, GraphicSet::Drcs1);
            }
            // 1バイトGセット：ESC 28-2B F
            [g @ 0x28..=0x2B, f, ..] => {
                self.skip(2);
                self.designate(g, one_byte_set(f)?);
            }

            [b, ..] => return Err(DecodeError::UnknownEscape(vec![b])),
        }

        Ok(())
    }

    fn designate(&mut self, g: u8, set: GraphicSet) {
        debug_assert!((0x28..=0x2B).contains(&g));
        self.graphic_sets[(g - 0x28) as usize] = set;
    }
}
