//! TSパケットからPSI/SIセクションを再構成するためのモジュール。
//!
//! [`Demuxer`]は登録されたPIDごとにバッファを持ち、
//! ユニット開始指示（PUSI）・ポインターフィールド・巡回カウンターを解釈して
//! パケットにまたがるセクションを完全な形に組み立てる。
//! 組み立てたセクションは[`Filter::on_section`]へ引き渡される。

use arrayvec::ArrayVec;
use fxhash::FxHashMap;
use thiserror::Error;

use crate::packet::Packet;
use crate::pid::Pid;
use crate::utils::BytesExt;

/// プライベートセクションの最大長。
const MAX_SECTION_LEN: usize = 4096;

/// [`Demuxer::feed`]で発生するエラー。
#[derive(Debug, Error)]
pub enum DemuxError {
    /// adaptation fieldの長さ等が異常でパケットを解釈できない。
    #[error("malformed packet")]
    MalformedPacket,
}

/// [`Demuxer`]に登録するフィルター。
pub trait Filter {
    /// PIDに紐付けてセクションの仕分け先を表すタグ。
    type Tag: Copy;

    /// [`Demuxer`]の生成時に呼ばれ、最初に監視するPIDを登録する。
    fn on_setup(&mut self, table: &mut Table<Self::Tag>);

    /// セクションが完成した際に呼ばれる。
    ///
    /// `section`にはセクション長どおりのバイト列が丸ごと入る。
    /// [`Context::table`]を通して監視するPIDを増減できる。
    fn on_section(&mut self, ctx: &mut Context<Self::Tag>, section: &[u8]);

    /// 監視中のPIDでパケットが連続していなかった（ドロップしていた）際に呼ばれる。
    fn on_discontinued(&mut self, pid: Pid) {
        let _ = pid;
    }
}

/// 監視するPIDとタグの対応表。
#[derive(Debug, Clone)]
pub struct Table<T>(FxHashMap<Pid, T>);

impl<T: Copy> Table<T> {
    fn new() -> Table<T> {
        Table(FxHashMap::default())
    }

    /// `pid`を監視対象に登録する。
    #[inline]
    pub fn set(&mut self, pid: Pid, tag: T) {
        self.0.insert(pid, tag);
    }

    /// `pid`を監視対象から外す。
    #[inline]
    pub fn unset(&mut self, pid: Pid) {
        self.0.remove(&pid);
    }

    /// `pid`が監視対象かどうかを返す。
    #[inline]
    pub fn contains(&self, pid: Pid) -> bool {
        self.0.contains_key(&pid)
    }

    /// `pid`に紐付くタグを返す。
    #[inline]
    pub fn get(&self, pid: Pid) -> Option<T> {
        self.0.get(&pid).copied()
    }
}

/// [`Filter::on_section`]に渡されるコンテキスト。
pub struct Context<'a, T> {
    pid: Pid,
    tag: T,
    table: &'a mut Table<T>,
}

impl<'a, T: Copy> Context<'a, T> {
    /// セクションが運ばれてきたPID。
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// PIDに紐付けられたタグ。
    #[inline]
    pub fn tag(&self) -> T {
        self.tag
    }

    /// 監視対象の対応表。
    #[inline]
    pub fn table(&mut self) -> &mut Table<T> {
        self.table
    }
}

/// PIDごとの組み立て中セクション。
struct SectionBuffer {
    pending: Box<ArrayVec<u8, MAX_SECTION_LEN>>,
    last_counter: u8,
    /// セクションヘッダを受信したら確定する。
    section_length: Option<usize>,
}

impl SectionBuffer {
    fn new(counter: u8) -> SectionBuffer {
        SectionBuffer {
            pending: Box::new(ArrayVec::new()),
            last_counter: counter,
            section_length: None,
        }
    }

    #[inline]
    fn next_counter(&self) -> u8 {
        (self.last_counter + 1) & 0x0F
    }

    fn push(&mut self, data: &[u8]) {
        // バッファに収まる形でdataを追記
        let len = std::cmp::min(self.pending.remaining_capacity(), data.len());
        let _result = self.pending.try_extend_from_slice(&data[..len]);
        debug_assert!(_result.is_ok());

        if self.section_length.is_none() && self.pending.len() >= 3 {
            let len = self.pending[1..=2].read_be_16() & 0b0000_1111_1111_1111;
            self.section_length = Some(3 + len as usize);
        }
    }

    /// セクション長に達していれば、セクション部分のバイト列を返す。
    fn complete(&self) -> Option<&[u8]> {
        let len = self.section_length?;
        self.pending.get(..len)
    }
}

/// TSパケットからセクションを組み立てて分離する。
pub struct Demuxer<T: Filter> {
    filter: T,
    table: Table<T::Tag>,
    buffers: FxHashMap<Pid, SectionBuffer>,
}

impl<T: Filter> Demuxer<T> {
    /// `Demuxer`を生成する。
    ///
    /// `filter`の[`on_setup`][`Filter::on_setup`]で監視するPIDが登録される。
    pub fn new(mut filter: T) -> Demuxer<T> {
        let mut table = Table::new();
        filter.on_setup(&mut table);
        Demuxer {
            filter,
            table,
            buffers: FxHashMap::default(),
        }
    }

    /// 内包するフィルターを参照で返す。
    #[inline]
    pub fn filter(&self) -> &T {
        &self.filter
    }

    /// 内包するフィルターを可変参照で返す。
    #[inline]
    pub fn filter_mut(&mut self) -> &mut T {
        &mut self.filter
    }

    /// `Demuxer`を消費して内包するフィルターを返す。
    #[inline]
    pub fn into_filter(self) -> T {
        self.filter
    }

    /// [`Packet`]を処理してセクションを分離する。
    pub fn feed(&mut self, packet: &Packet) -> Result<(), DemuxError> {
        if packet.error_indicator() {
            // ビット誤りのあるパケットは読み捨てる
            log::debug!("transport error: {:?}", packet.pid());
            return Ok(());
        }
        if !packet.is_normal() {
            return Err(DemuxError::MalformedPacket);
        }

        let pid = packet.pid();
        if !self.table.contains(pid) {
            return Ok(());
        }
        if !packet.has_payload() {
            return Ok(());
        }
        let payload = packet.payload().ok_or(DemuxError::MalformedPacket)?;
        if payload.is_empty() {
            return Ok(());
        }

        let counter = packet.continuity_counter();
        if packet.unit_start_indicator() {
            self.feed_unit_start(pid, counter, payload)
        } else {
            self.feed_continuation(pid, counter, payload);
            Ok(())
        }
    }

    /// PUSIの立ったパケットを処理する。
    ///
    /// ポインターフィールドより前は直前のセクションの残り、
    /// 後ろは新しいセクションの先頭となる。
    fn feed_unit_start(
        &mut self,
        pid: Pid,
        counter: u8,
        payload: &[u8],
    ) -> Result<(), DemuxError> {
        let pointer = payload[0] as usize;
        let rest = &payload[1..];
        if pointer > rest.len() {
            log::debug!("pointer_field exceeds payload: {:?}", pid);
            self.drop_buffer(pid);
            return Err(DemuxError::MalformedPacket);
        }
        let (prev, next) = rest.split_at(pointer);

        // 組み立て中のセクションをポインターフィールドまでのデータで完結させる
        if let Some(mut buf) = self.buffers.remove(&pid) {
            if buf.last_counter == counter {
                // 重複パケットは読み捨てる
                log::trace!("duplicate packet: {:?}", pid);
                self.buffers.insert(pid, buf);
                return Ok(());
            }

            if buf.next_counter() == counter {
                buf.push(prev);
                match buf.complete() {
                    Some(section) => self.dispatch(pid, section),
                    None => log::debug!("incomplete section at next unit start: {:?}", pid),
                }
            } else {
                log::debug!("counter is not in continuity: {:?}", pid);
                self.filter.on_discontinued(pid);
            }
        }

        if next.is_empty() || next[0] == 0xFF {
            // スタッフィングのみ
            return Ok(());
        }

        // 新しいセクションの開始
        let mut buf = SectionBuffer::new(counter);
        buf.push(next);
        match buf.complete() {
            // パケット内で完結。残りはスタッフィングとして捨てる
            Some(section) => self.dispatch(pid, section),
            None => {
                self.buffers.insert(pid, buf);
            }
        }

        Ok(())
    }

    /// PUSIの立っていないパケットを処理する。
    fn feed_continuation(&mut self, pid: Pid, counter: u8, payload: &[u8]) {
        let Some(buf) = self.buffers.get_mut(&pid) else {
            // 組み立て中のセクションがないため、次のユニット開始を待つ
            return;
        };

        if buf.last_counter == counter {
            // 重複パケットは読み捨てる
            log::trace!("duplicate packet: {:?}", pid);
            return;
        }
        if buf.next_counter() != counter {
            log::debug!("counter is not in continuity: {:?}", pid);
            self.drop_buffer(pid);
            self.filter.on_discontinued(pid);
            return;
        }

        buf.last_counter = counter;
        buf.push(payload);
        if buf.complete().is_some() {
            let buf = self.buffers.remove(&pid).unwrap();
            let section = buf.complete().unwrap();
            // セクション長を超えた残りはスタッフィングとして捨てる
            self.dispatch(pid, section);
        }
    }

    #[inline]
    fn drop_buffer(&mut self, pid: Pid) {
        self.buffers.remove(&pid);
    }

    fn dispatch(&mut self, pid: Pid, section: &[u8]) {
        let Some(tag) = self.table.get(pid) else {
            return;
        };
        let mut ctx = Context {
            pid,
            tag,
            table: &mut self.table,
        };
        self.filter.on_section(&mut ctx, section);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PID: Pid = Pid::new(0x0101);

    /// 組み立てられたセクションを集めるだけのフィルター。
    struct Collect {
        watch: Vec<Pid>,
        sections: Vec<(Pid, Vec<u8>)>,
        discontinued: Vec<Pid>,
    }

    impl Collect {
        fn new(watch: &[Pid]) -> Collect {
            Collect {
                watch: watch.to_vec(),
                sections: Vec::new(),
                discontinued: Vec::new(),
            }
        }
    }

    impl Filter for Collect {
        type Tag = ();

        fn on_setup(&mut self, table: &mut Table<()>) {
            for &pid in &self.watch {
                table.set(pid, ());
            }
        }

        fn on_section(&mut self, ctx: &mut Context<()>, section: &[u8]) {
            self.sections.push((ctx.pid(), section.to_vec()));
        }

        fn on_discontinued(&mut self, pid: Pid) {
            self.discontinued.push(pid);
        }
    }

    /// テスト用のTSパケットを生成する。ペイロードは0xFFで詰められる。
    fn packet(pid: Pid, pusi: bool, counter: u8, payload: &[u8]) -> Packet {
        assert!(payload.len() <= 184);
        let mut data = Vec::with_capacity(188);
        data.push(0x47);
        data.push(((pid.get() >> 8) as u8) | if pusi { 0x40 } else { 0x00 });
        data.push(pid.get() as u8);
        data.push(0x10 | (counter & 0x0F));
        data.extend_from_slice(payload);
        data.resize(188, 0xFF);
        Packet(data.try_into().unwrap())
    }

    /// `len`バイトのダミーセクションを生成する。
    fn section(table_id: u8, len: usize) -> Vec<u8> {
        assert!(len >= 3);
        let mut data = vec![table_id, 0xF0 | ((len - 3) >> 8) as u8, (len - 3) as u8];
        data.extend((0..len - 3).map(|i| i as u8));
        data
    }

    /// セクションをポインターフィールド付きで`k`個のパケットに分割する。
    fn packetize(pid: Pid, first_counter: u8, section: &[u8]) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut counter = first_counter;
        let mut pos = 0;
        while pos < section.len() {
            let (pusi, payload) = if pos == 0 {
                let take = section.len().min(183);
                let mut payload = vec![0x00];
                payload.extend_from_slice(&section[..take]);
                (true, payload)
            } else {
                let take = (section.len() - pos).min(184);
                (false, section[pos..pos + take].to_vec())
            };
            pos += payload.len() - usize::from(pusi);
            packets.push(packet(pid, pusi, counter, &payload));
            counter = (counter + 1) & 0x0F;
        }
        packets
    }

    fn run(demuxer: &mut Demuxer<Collect>, packets: &[Packet]) {
        for packet in packets {
            demuxer.feed(packet).unwrap();
        }
    }

    #[test]
    fn test_reassemble_split_packets() {
        // パケットにまたがる400バイトのセクション
        let section = section(0x40, 400);
        let mut demuxer = Demuxer::new(Collect::new(&[PID]));

        run(&mut demuxer, &packetize(PID, 5, &section));

        let collect = demuxer.into_filter();
        assert_eq!(collect.sections, [(PID, section)]);
        assert!(collect.discontinued.is_empty());
    }

    #[test]
    fn test_reassemble_fragmentations() {
        // 同じセクションは分割数によらず同じ形で届く
        let section = section(0x42, 180);

        // 1パケット
        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(&mut demuxer, &packetize(PID, 0, &section));
        assert_eq!(demuxer.filter().sections, [(PID, section.clone())]);

        // 2パケット（90バイトずつ）
        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section[..90]);
        run(
            &mut demuxer,
            &[
                packet(PID, true, 0, &p1),
                packet(PID, false, 1, &section[90..]),
            ],
        );
        assert_eq!(demuxer.filter().sections, [(PID, section.clone())]);

        // 3パケット（60バイトずつ）
        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section[..60]);
        run(
            &mut demuxer,
            &[
                packet(PID, true, 0, &p1),
                packet(PID, false, 1, &section[60..120]),
                packet(PID, false, 2, &section[120..]),
            ],
        );
        assert_eq!(demuxer.filter().sections, [(PID, section)]);
    }

    #[test]
    fn test_discontinuity_drops_buffer() {
        // カウンターが2→3→5と飛んだらバッファごと捨てる
        let section = section(0x40, 500);
        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section[..183]);

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(
            &mut demuxer,
            &[
                packet(PID, true, 2, &p1),
                packet(PID, false, 3, &section[183..367]),
                packet(PID, false, 5, &section[367..]),
            ],
        );

        let collect = demuxer.into_filter();
        assert!(collect.sections.is_empty());
        assert_eq!(collect.discontinued, [PID]);
    }

    #[test]
    fn test_duplicate_packet_discarded() {
        // 同一カウンターのパケットは読み捨てて続きを待つ
        let section = section(0x40, 300);
        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section[..183]);
        let p2 = &section[183..];

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(
            &mut demuxer,
            &[
                packet(PID, true, 0, &p1),
                packet(PID, false, 0, p2),
                packet(PID, false, 1, p2),
            ],
        );

        let collect = demuxer.into_filter();
        assert_eq!(collect.sections, [(PID, section)]);
        assert!(collect.discontinued.is_empty());
    }

    #[test]
    fn test_pointer_field_completes_previous() {
        // 次のユニット開始のポインターフィールドで前のセクションが完結する
        let section_a = section(0x40, 200);
        let section_b = section(0x42, 100);

        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section_a[..183]);
        // 残り17バイト＋セクションB先頭
        let mut p2 = vec![17];
        p2.extend_from_slice(&section_a[183..]);
        p2.extend_from_slice(&section_b);

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(
            &mut demuxer,
            &[packet(PID, true, 0, &p1), packet(PID, true, 1, &p2)],
        );

        let collect = demuxer.into_filter();
        assert_eq!(collect.sections, [(PID, section_a), (PID, section_b)]);
    }

    #[test]
    fn test_unanchored_payload_ignored() {
        // ユニット開始前の断片は読み捨てる
        let section = section(0x40, 300);

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(&mut demuxer, &[packet(PID, false, 7, &section[..184])]);

        let collect = demuxer.into_filter();
        assert!(collect.sections.is_empty());
        assert!(collect.discontinued.is_empty());
    }

    #[test]
    fn test_unwatched_pid_ignored() {
        let other = Pid::new(0x0202);
        let section_a = section(0x40, 300);
        let section_x = section(0x41, 300);

        let mut p1 = vec![0x00];
        p1.extend_from_slice(&section_a[..183]);
        let mut px = vec![0x00];
        px.extend_from_slice(&section_x[..183]);

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        run(
            &mut demuxer,
            &[
                packet(PID, true, 0, &p1),
                // 監視していないPIDのパケットが割り込んでも影響しない
                packet(other, true, 9, &px),
                packet(other, false, 10, &section_x[183..]),
                packet(PID, false, 1, &section_a[183..]),
            ],
        );

        let collect = demuxer.into_filter();
        assert_eq!(collect.sections, [(PID, section_a)]);
    }

    #[test]
    fn test_concatenation_equals_payloads() {
        // 欠落がなければ届いたセクションの連結は入力セクションの連結と一致する
        let sections: Vec<_> = (0u8..4).map(|i| section(0x50 + i, 350)).collect();

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        let mut counter = 0;
        for section in &sections {
            let packets = packetize(PID, counter, section);
            counter = (counter + packets.len() as u8) & 0x0F;
            run(&mut demuxer, &packets);
        }

        let collect = demuxer.into_filter();
        let delivered: Vec<u8> = collect
            .sections
            .iter()
            .flat_map(|(_, s)| s.iter().copied())
            .collect();
        assert_eq!(delivered, sections.concat());
    }

    #[test]
    fn test_malformed_packet() {
        // adaptation_field_lengthがパケットに収まらない
        let mut data = [0xFF; 188];
        data[0] = 0x47;
        data[1] = 0x01;
        data[2] = 0x01;
        data[3] = 0x30;
        data[4] = 184;
        let bad = Packet(data);

        let mut demuxer = Demuxer::new(Collect::new(&[PID]));
        assert!(matches!(
            demuxer.feed(&bad),
            Err(DemuxError::MalformedPacket)
        ));
    }
}
