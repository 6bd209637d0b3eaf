//! 8単位符号の符号表。
//!
//! 漢字系集合はJISの区点をシフトJISに変換したうえで[`encoding_rs`]で
//! Unicodeに変換する。仮名と外字は静的な表を引く。

use encoding_rs::SHIFT_JIS;

/// 平仮名集合（0x21～0x7E）。0x74～0x76は未割り当て。
const HIRAGANA: [char; 94] = [
    'ぁ', 'あ', 'ぃ', 'い', 'ぅ', 'う', 'ぇ', 'え', 'ぉ', 'お', 'か', 'が', 'き', 'ぎ', 'く',
    'ぐ', 'け', 'げ', 'こ', 'ご', 'さ', 'ざ', 'し', 'じ', 'す', 'ず', 'せ', 'ぜ', 'そ', 'ぞ',
    'た', 'だ', 'ち', 'ぢ', 'っ', 'つ', 'づ', 'て', 'で', 'と', 'ど', 'な', 'に', 'ぬ', 'ね',
    'の', 'は', 'ば', 'ぱ', 'ひ', 'び', 'ぴ', 'ふ', 'ぶ', 'ぷ', 'へ', 'べ', 'ぺ', 'ほ', 'ぼ',
    'ぽ', 'ま', 'み', 'む', 'め', 'も', 'ゃ', 'や', 'ゅ', 'ゆ', 'ょ', 'よ', 'ら', 'り', 'る',
    'れ', 'ろ', 'ゎ', 'わ', 'ゐ', 'ゑ', 'を', 'ん', '\0', '\0', '\0', 'ゝ', 'ゞ', 'ー', '。',
    '「', '」', '、', '・',
];

/// 片仮名集合（0x21～0x7E）。
const KATAKANA: [char; 94] = [
    'ァ', 'ア', 'ィ', 'イ', 'ゥ', 'ウ', 'ェ', 'エ', 'ォ', 'オ', 'カ', 'ガ', 'キ', 'ギ', 'ク',
    'グ', 'ケ', 'ゲ', 'コ', 'ゴ', 'サ', 'ザ', 'シ', 'ジ', 'ス', 'ズ', 'セ', 'ゼ', 'ソ', 'ゾ',
    'タ', 'ダ', 'チ', 'ヂ', 'ッ', 'ツ', 'ヅ', 'テ', 'デ', 'ト', 'ド', 'ナ', 'ニ', 'ヌ', 'ネ',
    'ノ', 'ハ', 'バ', 'パ', 'ヒ', 'ビ', 'ピ', 'フ', 'ブ', 'プ', 'ヘ', 'ベ', 'ペ', 'ホ', 'ボ',
    'ポ', 'マ', 'ミ', 'ム', 'メ', 'モ', 'ャ', 'ヤ', 'ュ', 'ユ', 'ョ', 'ヨ', 'ラ', 'リ', 'ル',
    'レ', 'ロ', 'ヮ', 'ワ', 'ヰ', 'ヱ', 'ヲ', 'ン', 'ヴ', 'ヵ', 'ヶ', 'ヽ', 'ヾ', 'ー', '。',
    '「', '」', '、', '・',
];

/// 英数集合の符号を`char`に変換する。
#[inline]
pub fn decode_alnum(c1: u8) -> char {
    c1 as char
}

/// 平仮名集合の符号を`char`に変換する。
///
/// 未割り当ての符号の場合は`None`を返す。
pub fn decode_hira(c1: u8) -> Option<char> {
    let c = HIRAGANA[(c1 - 0x21) as usize];
    (c != '\0').then_some(c)
}

/// 片仮名集合の符号を`char`に変換する。
pub fn decode_kata(c1: u8) -> Option<char> {
    Some(KATAKANA[(c1 - 0x21) as usize])
}

/// JIS X 0201片仮名集合の符号を`char`に変換する。
///
/// シフトJISの1バイト片仮名（0xA1～0xDF）を経由する。
pub fn decode_jis_x_kata(c1: u8) -> Option<char> {
    if !(0x21..=0x5F).contains(&c1) {
        return None;
    }
    decode_sjis(&[c1 + 0x80])
}

/// 漢字系集合（漢字およびJIS互換漢字1面）の符号を`char`に変換する。
///
/// 未割り当ての符号や`char`として表現できない符号の場合は`None`を返す。
pub fn decode_kanji(c1: u8, c2: u8) -> Option<char> {
    let (ku, ten) = (c1 - 0x20, c2 - 0x20);
    let lead = if ku <= 62 {
        0x80 + ku.div_ceil(2)
    } else {
        0xC0 + ku.div_ceil(2)
    };
    decode_sjis(&[lead, sjis_trail(ku, ten)])
}

/// JIS互換漢字2面の符号を`char`に変換する。
pub fn decode_kanji_plane2(c1: u8, c2: u8) -> Option<char> {
    let (ku, ten) = (c1 - 0x20, c2 - 0x20);
    let lead = 0xEF + ku.div_ceil(2);
    decode_sjis(&[lead, sjis_trail(ku, ten)])
}

fn sjis_trail(ku: u8, ten: u8) -> u8 {
    if ku % 2 == 1 {
        if ten <= 63 {
            0x3F + ten
        } else {
            0x40 + ten
        }
    } else {
        0x9E + ten
    }
}

fn decode_sjis(bytes: &[u8]) -> Option<char> {
    // BOM判定に0xEF始まりの符号を吸われないようBOM処理なしでデコードする
    let (decoded, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    if had_errors {
        return None;
    }

    let mut chars = decoded.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// 追加記号集合（外字）の符号に対応する文字列を返す。
///
/// `code`は1バイト目と2バイト目の符号を連結した値（例：`0x7A6B`）。
/// 未割り当ての符号の場合は`None`を返す。
pub fn gaiji(code: u16) -> Option<&'static str> {
    let (base, table): (u16, &[&str]) = match code {
        0x7521..=0x757E => (0x7521, &SYMBOLS_75),
        0x7621..=0x764B => (0x7621, &SYMBOLS_76),
        0x7A50..=0x7A74 => (0x7A50, &SYMBOLS_7A),
        0x7C21..=0x7C7B => (0x7C21, &SYMBOLS_7C),
        0x7D21..=0x7D7B => (0x7D21, &SYMBOLS_7D),
        0x7E21..=0x7E7D => (0x7E21, &SYMBOLS_7E),
        _ => return None,
    };
    Some(table[(code - base) as usize])
}

/// 放送・番組属性の記号（0x7A50～0x7A74）。
static SYMBOLS_7A: [&str; 0x25] = [
    "[HV]", "[SD]", "[Ｐ]", "[Ｗ]", "[MV]", "[手]", "[字]", "[双]", "[デ]", "[Ｓ]", "[二]",
    "[多]", "[解]", "[SS]", "[Ｂ]", "[Ｎ]", "■", "●", "[天]", "[交]", "[映]", "[無]", "[料]",
    "[年齢制限]", "[前]", "[後]", "[再]", "[新]", "[初]", "[終]", "[生]", "[販]", "[声]",
    "[吹]", "[PPV]", "（秘）", "ほか",
];

/// 単位・囲み文字等の記号（0x7C21～0x7C7B）。
static SYMBOLS_7C: [&str; 0x5B] = [
    "→", "←", "↑", "↓", "●", "○", "年", "月", "日", "円", "㎡", "㎥", "㎝", "㎠", "㎤",
    "０.", "１.", "２.", "３.", "４.", "５.", "６.", "７.", "８.", "９.", "氏", "副", "元",
    "故", "前", "[新]", "０,", "１,", "２,", "３,", "４,", "５,", "６,", "７,", "８,", "９,",
    "(社)", "(財)", "(有)", "(株)", "(代)", "(問)", "▶", "◀", "〖", "〗", "⟐", "^2", "^3",
    "(CD)", "(vn)", "(ob)", "(cb)", "(ce", "mb)", "(hp)", "(br)", "(p)", "(s)", "(ms)", "(t)",
    "(bs)", "(b)", "(tb)", "(tp)", "(ds)", "(ag)", "(eg)", "(vo)", "(fl)", "(ke", "y)", "(sa",
    "x)", "(sy", "n)", "(or", "g)", "(pe", "r)", "(R)", "(C)", "(箏)", "DJ", "[演]", "Fax",
];

/// 曜日・スポーツ・天気等の記号（0x7D21～0x7D7B）。
static SYMBOLS_7D: [&str; 0x5B] = [
    "㈪", "㈫", "㈬", "㈭", "㈮", "㈯", "㈰", "㈷", "㍾", "㍽", "㍼", "㍻", "№", "℡", "〶",
    "○", "〔本〕", "〔三〕", "〔二〕", "〔安〕", "〔点〕", "〔打〕", "〔盗〕", "〔勝〕",
    "〔敗〕", "〔Ｓ〕", "［投］", "［捕］", "［一］", "［二］", "［三］", "［遊］", "［左］",
    "［中］", "［右］", "［指］", "［走］", "［打］", "㍑", "㎏", "㎐", "ha", "㎞", "㎢", "㍱",
    "・", "・", "1/2", "0/3", "1/3", "2/3", "1/4", "3/4", "1/5", "2/5", "3/5", "4/5", "1/6",
    "5/6", "1/7", "1/8", "1/9", "1/10", "☀", "☁", "☂", "☃", "☖", "☗", "▽", "▼", "♦",
    "♥", "♣", "♠", "⌺", "⦿", "‼", "⁉", "(曇/晴)", "☔", "(雨)", "(雪)", "(大雪)", "⚡",
    "(雷雨)", "　", "・", "・", "♬", "☎",
];

/// ローマ数字・丸数字等の記号（0x7E21～0x7E7D）。
static SYMBOLS_7E: [&str; 0x5D] = [
    "Ⅰ", "Ⅱ", "Ⅲ", "Ⅳ", "Ⅴ", "Ⅵ", "Ⅶ", "Ⅷ", "Ⅸ", "Ⅹ", "Ⅺ", "Ⅻ", "⑰", "⑱", "⑲",
    "⑳", "⑴", "⑵", "⑶", "⑷", "⑸", "⑹", "⑺", "⑻", "⑼", "⑽", "⑾", "⑿", "㉑", "㉒",
    "㉓", "㉔", "(A)", "(B)", "(C)", "(D)", "(E)", "(F)", "(G)", "(H)", "(I)", "(J)", "(K)",
    "(L)", "(M)", "(N)", "(O)", "(P)", "(Q)", "(R)", "(S)", "(T)", "(U)", "(V)", "(W)", "(X)",
    "(Y)", "(Z)", "㉕", "㉖", "㉗", "㉘", "㉙", "㉚", "①", "②", "③", "④", "⑤", "⑥", "⑦",
    "⑧", "⑨", "⑩", "⑪", "⑫", "⑬", "⑭", "⑮", "⑯", "❶", "❷", "❸", "❹", "❺", "❻",
    "❼", "❽", "❾", "❿", "⓫", "⓬", "㉛",
];

/// 人名用漢字等の外字その1（0x7521～0x757E）。
static SYMBOLS_75: [&str; 0x5E] = [
    "㐂", "亭", "份", "仿", "侚", "俉", "傜", "儞", "冼", "㔟", "匇", "卡", "卬", "詹", "吉",
    "呍", "咖", "咜", "咩", "唎", "啊", "噲", "囤", "圳", "圴", "塚", "墀", "姤", "娣", "婕",
    "寬", "﨑", "㟢", "庬", "弴", "彅", "德", "怗", "恵", "愰", "昤", "曈", "曙", "曺", "曻",
    "桒", "・", "椑", "椻", "橅", "檑", "櫛", "・", "・", "・", "毱", "泠", "洮", "海", "涿",
    "淊", "淸", "渚", "潞", "濹", "灤", "・", "・", "煇", "燁", "爀", "玟", "・", "珉", "珖",
    "琛", "琡", "琢", "琦", "琪", "琬", "琹", "瑋", "㻚", "畵", "疁", "睲", "䂓", "磈", "磠",
    "祇", "禮", "・", "・",
];

/// 人名用漢字等の外字その2（0x7621～0x764B）。
static SYMBOLS_76: [&str; 0x2B] = [
    "・", "秚", "稞", "筿", "簱", "䉤", "綋", "羡", "脘", "脺", "・", "芮", "葛", "蓜", "蓬",
    "蕙", "藎", "蝕", "蟬", "蠋", "裵", "角", "諶", "跎", "辻", "迶", "郝", "鄧", "鄭", "醲",
    "鈳", "銈", "錡", "鍈", "閒", "雞", "餃", "饀", "髙", "鯖", "鷗", "麴", "麵",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_alnum() {
        assert_eq!(decode_alnum(0x21), '!');
        assert_eq!(decode_alnum(0x41), 'A');
        assert_eq!(decode_alnum(0x7E), '~');
    }

    #[test]
    fn test_decode_kana() {
        assert_eq!(decode_hira(0x22), Some('あ'));
        assert_eq!(decode_hira(0x73), Some('ん'));
        assert_eq!(decode_hira(0x74), None);
        assert_eq!(decode_hira(0x7E), Some('・'));

        assert_eq!(decode_kata(0x22), Some('ア'));
        assert_eq!(decode_kata(0x76), Some('ヶ'));
        assert_eq!(decode_kata(0x79), Some('ー'));
    }

    #[test]
    fn test_decode_jis_x_kata() {
        assert_eq!(decode_jis_x_kata(0x31), Some('ｱ'));
        assert_eq!(decode_jis_x_kata(0x5F), Some('ﾟ'));
        assert_eq!(decode_jis_x_kata(0x60), None);
    }

    #[test]
    fn test_decode_kanji() {
        // 区点1-1は全角スペース
        assert_eq!(decode_kanji(0x21, 0x21), Some('　'));
        // 亜＝区点16-1
        assert_eq!(decode_kanji(0x30, 0x21), Some('亜'));
        // 仮＝区点18-30
        assert_eq!(decode_kanji(0x32, 0x3E), Some('仮'));
        // 魔＝区点43-66
        assert_eq!(decode_kanji(0x4B, 0x62), Some('魔'));
        // 区点8-33は未割り当て
        assert_eq!(decode_kanji(0x28, 0x41), None);
    }

    #[test]
    fn test_gaiji() {
        assert_eq!(gaiji(0x7A6B), Some("[新]"));
        assert_eq!(gaiji(0x7A56), Some("[字]"));
        assert_eq!(gaiji(0x7C4D), Some("(株)"));
        assert_eq!(gaiji(0x7D2D), Some("№"));
        assert_eq!(gaiji(0x7E31), Some("⑴"));
        assert_eq!(gaiji(0x7521), Some("㐂"));
        assert_eq!(gaiji(0x764B), Some("麵"));
        assert_eq!(gaiji(0x7A22), None);
        assert_eq!(gaiji(0x7F21), None);
    }
}
