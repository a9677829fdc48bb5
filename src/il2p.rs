/*! IL2P framer: sync search, RS-protected header/blocks, Hamming-protected
trailing CRC.

IL2P replaces AX.25's bit-stuffed HDLC framing with fixed-size,
Reed-Solomon-protected blocks plus a byte-oriented 24-bit sync word,
trading a little overhead for forward error correction. The header (13
bytes) and each data block are scrambled with a free-running LFSR (reset
to a fixed state at the start of every header/block, unlike the
self-synchronizing AX.25 scrambler) before transmission, so every
collected block is RS-decoded first and only then descrambled.

State machine: `SyncSearch` hunts for the 24-bit sync word (either
polarity, within a Hamming-distance tolerance) one bit at a time;
`RxHeader` collects the 15-byte RS(15,13) header block; `RxBigBlocks`/
`RxSmallBlocks` collect the payload's data blocks (payload split across
`ceil(count/239)` blocks of near-equal size, with any remainder
distributed as one extra byte each to the first few "big" blocks);
`RxTrailingCrc` collects four Hamming(7,4)-protected nibbles carrying the
16-bit CRC.
*/

use crate::descrambler::Descrambler;
use crate::packet::Packet;
use crate::reed_solomon::{Decoded, ReedSolomon};
use crate::slicer::AddressedByte;

const SYNC_WORD: u32 = 0xF15E48;
const SYNC_WORD_INVERTED: u32 = 0x57DF7F;
const NUM_BLOCK_ROOTS: usize = 16;

const HAMMING_DECODE_TABLE: [u8; 128] = [
    0x0, 0x0, 0x0, 0x3, 0x0, 0x5, 0xe, 0x7, 0x0, 0x9, 0xe, 0xb, 0xe, 0xd, 0xe, 0xe, //.
    0x0, 0x3, 0x3, 0x3, 0x4, 0xd, 0x6, 0x3, 0x8, 0xd, 0xa, 0x3, 0xd, 0xd, 0xe, 0xd, //.
    0x0, 0x5, 0x2, 0xb, 0x5, 0x5, 0x6, 0x5, 0x8, 0xb, 0xb, 0xb, 0xc, 0x5, 0xe, 0xb, //.
    0x8, 0x1, 0x6, 0x3, 0x6, 0x5, 0x6, 0x6, 0x8, 0x8, 0x8, 0xb, 0x8, 0xd, 0x6, 0xf, //.
    0x0, 0x9, 0x2, 0x7, 0x4, 0x7, 0x7, 0x7, 0x9, 0x9, 0xa, 0x9, 0xc, 0x9, 0xe, 0x7, //.
    0x4, 0x1, 0xa, 0x3, 0x4, 0x4, 0x4, 0x7, 0xa, 0x9, 0xa, 0xa, 0x4, 0xd, 0xa, 0xf, //.
    0x2, 0x1, 0x2, 0x2, 0xc, 0x5, 0x2, 0x7, 0xc, 0x9, 0x2, 0xb, 0xc, 0xc, 0xc, 0xf, //.
    0x1, 0x1, 0x2, 0x1, 0x4, 0x1, 0x6, 0xf, 0x8, 0x1, 0xa, 0xf, 0xc, 0xf, 0xf, 0xf, //.
];

const DISTANCE8: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u32).count_ones();
        i += 1;
    }
    table
};

fn hamming_decode(byte: u32) -> u32 {
    HAMMING_DECODE_TABLE[(byte & 0x7F) as usize] as u32
}

fn bit_distance_24(a: u32, b: u32) -> u32 {
    let mut d = 0;
    for shift in [0, 8, 16] {
        d += DISTANCE8[(((a >> shift) ^ (b >> shift)) & 0xFF) as usize];
    }
    d
}

const IL2P_TO_AX25_PID: [u8; 16] =
    [0, 0, 0x10, 0x01, 0x06, 0x07, 0x08, 0xC3, 0xC4, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE, 0xCF, 0xF0];

const U_CONTROL: [u8; 8] = [0x2F, 0x43, 0x0F, 0x63, 0x87, 0x03, 0xAF, 0xE3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ax25Type {
    Ui,
    S,
    U,
    I,
}

#[derive(Debug, Clone)]
struct Header {
    type_subfield: u8,
    count: usize,
    pid_subfield: usize,
    control_subfield: u32,
    dest: [u8; 7],
    source: [u8; 7],
    ax25_type: Ax25Type,
    ax25_pid_byte: u8,
    pf_bit: bool,
    c_bit: bool,
    nr: u32,
    ns: u32,
    control_opcode: u32,
}

fn unpack_header(data: &[u8]) -> Header {
    let mut count = 0usize;
    for i in 0..10 {
        if data[i + 2] & 0x80 != 0 {
            count |= 0x200 >> i;
        }
    }
    let mut pid_subfield = 0usize;
    for i in 0..4 {
        if data[i + 1] & 0x40 != 0 {
            pid_subfield |= 0x8 >> i;
        }
    }
    let mut control_subfield = 0u32;
    for i in 0..7 {
        if data[i + 5] & 0x40 != 0 {
            control_subfield |= 0x40 >> i;
        }
    }
    let mut dest = [0u8; 7];
    for i in 0..6 {
        dest[i] = (data[i] & 0x3F) + 0x20;
    }
    dest[6] = data[12] >> 4;
    let mut source = [0u8; 7];
    for i in 0..6 {
        source[i] = (data[i + 6] & 0x3F) + 0x20;
    }
    source[6] = data[12] & 0xF;

    let ax25_type = if data[0] & 0x40 != 0 {
        Ax25Type::Ui
    } else {
        match pid_subfield {
            0 => Ax25Type::S,
            1 => Ax25Type::U,
            _ => Ax25Type::I,
        }
    };
    let ax25_pid_byte = IL2P_TO_AX25_PID[pid_subfield];

    let mut pf_bit = false;
    let mut c_bit = false;
    let mut nr = 0;
    let mut ns = 0;
    let mut control_opcode = 0;
    match ax25_type {
        Ax25Type::I => {
            pf_bit = control_subfield & 0x40 != 0;
            ns = control_subfield & 0x7;
            nr = (control_subfield >> 3) & 0x7;
            c_bit = true;
        }
        Ax25Type::S => {
            nr = (control_subfield >> 3) & 0x7;
            c_bit = control_subfield & 0x4 != 0;
            control_opcode = control_subfield & 0x3;
        }
        Ax25Type::U | Ax25Type::Ui => {
            pf_bit = (control_subfield >> 6) & 0x1 != 0;
            c_bit = control_subfield & 0x4 != 0;
            control_opcode = (control_subfield >> 3) & 0x7;
        }
    }

    Header {
        type_subfield: (data[1] & 0x80) >> 7,
        count,
        pid_subfield,
        control_subfield,
        dest,
        source,
        ax25_type,
        ax25_pid_byte,
        pf_bit,
        c_bit,
        nr,
        ns,
        control_opcode,
    }
}

fn reform_control_byte(header: &Header) -> u8 {
    let mut control_byte;
    match header.ax25_type {
        Ax25Type::U | Ax25Type::Ui => {
            control_byte = U_CONTROL[header.control_opcode as usize];
            if header.pf_bit {
                control_byte |= 0x10;
            }
        }
        Ax25Type::S => {
            control_byte = 0x1;
            control_byte |= (header.control_opcode as u8) << 2;
            control_byte |= (header.nr as u8) << 5;
            if header.pf_bit {
                control_byte |= 0x10;
            }
        }
        Ax25Type::I => {
            control_byte = (header.ns as u8) << 1;
            control_byte |= (header.nr as u8) << 5;
            if header.pf_bit {
                control_byte |= 0x10;
            }
        }
    }
    control_byte
}

fn append_ax25_header(out: &mut Vec<u8>, header: &Header) {
    for i in 0..6 {
        out.push(header.dest[i] << 1);
    }
    out.push((header.dest[6] << 1) + 0x60 + if header.c_bit { 0x80 } else { 0 });
    for i in 0..6 {
        out.push(header.source[i] << 1);
    }
    out.push((header.source[6] << 1) + 0x60 + if header.c_bit { 0 } else { 0x80 } + 1);
    out.push(reform_control_byte(header));
    if header.ax25_pid_byte != 0 {
        out.push(header.ax25_pid_byte);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SyncSearch,
    RxHeader,
    RxBigBlocks,
    RxSmallBlocks,
    RxTrailingCrc,
}

/// IL2P frame decoder.
pub struct Il2pDecoder {
    state: State,
    min_distance: usize,
    disable_rs: bool,
    sync_tolerance: u32,
    emit_blank_crc_without_fec: bool,
    header_rs: ReedSolomon,
    block_rs: ReedSolomon,
    lfsr: Descrambler,
    working_word: u32,
    bit_index: u32,
    byte_index_a: usize,
    buffer: [u8; 255],
    header: Option<Header>,
    working_data: Vec<u8>,
    block_fail: bool,
    bytes_corrected: usize,
    block_index: usize,
    block_count: usize,
    block_size: usize,
    big_blocks: usize,
    stream_address: u64,
}

impl Default for Il2pDecoder {
    fn default() -> Self {
        Self::new(0, false, true, 1)
    }
}

impl Il2pDecoder {
    /// `min_distance` reserves correction headroom on every RS decode (see
    /// [`crate::reed_solomon`]); `disable_rs` skips RS correction entirely
    /// (frames still get descrambled, but an uncorrected bit error will
    /// usually fail the trailing CRC); `require_crc` controls whether a
    /// frame with no trailing CRC block (IL2P's CRC-less mode) still gets
    /// reported with a synthesized all-zero CRC; `sync_tolerance` is the
    /// maximum Hamming distance (in bits, out of 24) from the sync word
    /// still accepted as a lock.
    pub fn new(min_distance: usize, disable_rs: bool, require_crc: bool, sync_tolerance: u32) -> Self {
        Self {
            state: State::SyncSearch,
            min_distance,
            disable_rs,
            sync_tolerance,
            emit_blank_crc_without_fec: !require_crc,
            header_rs: ReedSolomon::il2p_header(),
            block_rs: ReedSolomon::il2p_block(),
            lfsr: Descrambler::il2p(),
            working_word: 0xFFFFFF,
            bit_index: 0,
            byte_index_a: 0,
            buffer: [0u8; 255],
            header: None,
            working_data: Vec::new(),
            block_fail: false,
            bytes_corrected: 0,
            block_index: 0,
            block_count: 0,
            block_size: 0,
            big_blocks: 0,
            stream_address: 0,
        }
    }

    fn reset_frame(&mut self) {
        self.state = State::SyncSearch;
        self.working_data.clear();
        self.bytes_corrected = 0;
        self.block_fail = false;
    }

    fn finish_without_crc(&mut self, out: &mut Vec<Packet>, source_chain: usize) {
        crate::crc::append(&mut self.working_data);
        let mut packet =
            Packet::from_framed(std::mem::take(&mut self.working_data), self.stream_address, source_chain);
        packet.bytes_corrected = self.bytes_corrected;
        out.push(packet);
        self.reset_frame();
    }

    fn finish_with_crc(&mut self, out: &mut Vec<Packet>, source_chain: usize) {
        let mut packet =
            Packet::from_framed(std::mem::take(&mut self.working_data), self.stream_address, source_chain);
        packet.bytes_corrected = self.bytes_corrected;
        out.push(packet);
        self.reset_frame();
    }

    fn push_bit(&mut self, bit: u32, mask: u32) {
        self.working_word = ((self.working_word << 1) & mask) | bit;
        self.bit_index += 1;
    }

    /// Decode a stream of addressed bytes, returning every complete frame
    /// found. `source_chain` tags every emitted packet's provenance.
    pub fn decode(&mut self, data: &[AddressedByte], source_chain: usize) -> Vec<Packet> {
        let mut out = Vec::new();
        for item in data {
            self.stream_address = item.stream_address;
            for shift in (0..8).rev() {
                let bit = ((item.byte >> shift) & 1) as u32;
                match self.state {
                    State::SyncSearch => {
                        self.push_bit(bit, 0xFFFFFF);
                        let forward = bit_distance_24(self.working_word, SYNC_WORD);
                        let reverse = bit_distance_24(self.working_word, SYNC_WORD_INVERTED);
                        if forward.min(reverse) <= self.sync_tolerance {
                            self.bit_index = 0;
                            self.byte_index_a = 0;
                            self.state = State::RxHeader;
                        }
                    }
                    State::RxHeader => {
                        self.push_bit(bit, 0xFF);
                        if self.bit_index == 8 {
                            self.bit_index = 0;
                            self.buffer[self.byte_index_a] = self.working_word as u8;
                            self.byte_index_a += 1;
                            if self.byte_index_a == 15 {
                                self.byte_index_a = 0;
                                self.on_header_complete(&mut out, source_chain);
                            }
                        }
                    }
                    State::RxBigBlocks | State::RxSmallBlocks => {
                        self.push_bit(bit, 0xFF);
                        if self.bit_index == 8 {
                            self.bit_index = 0;
                            self.buffer[self.byte_index_a] = self.working_word as u8;
                            self.byte_index_a += 1;
                            if self.byte_index_a == self.block_size + NUM_BLOCK_ROOTS {
                                self.on_block_complete(&mut out, source_chain);
                            }
                        }
                    }
                    State::RxTrailingCrc => {
                        self.push_bit(bit, 0xFF);
                        if self.bit_index == 8 {
                            self.bit_index = 0;
                            self.buffer[self.byte_index_a] = self.working_word as u8;
                            self.byte_index_a += 1;
                            if self.byte_index_a == 4 {
                                self.byte_index_a = 0;
                                let mut trailing_crc = 0u32;
                                for i in 0..4 {
                                    trailing_crc |= hamming_decode(self.buffer[i] as u32) << (12 - i * 4);
                                }
                                self.working_data.push((trailing_crc & 0xFF) as u8);
                                self.working_data.push((trailing_crc >> 8) as u8);
                                self.finish_with_crc(&mut out, source_chain);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn on_header_complete(&mut self, out: &mut Vec<Packet>, source_chain: usize) {
        if self.disable_rs {
            // Skip FEC entirely; trust the raw bytes.
        } else {
            match self.header_rs.decode(&mut self.buffer[..15], 15, self.min_distance) {
                Decoded::Ok(n) => self.bytes_corrected += n,
                Decoded::Fail => self.block_fail = true,
            }
        }

        self.lfsr.reset_to(0x1F0);
        let descrambled = self.lfsr.unscramble_bytes(&self.buffer[..13]);
        self.buffer[..13].copy_from_slice(&descrambled);

        let header = unpack_header(&self.buffer[..13]);

        if header.type_subfield == 1 {
            append_ax25_header(&mut self.working_data, &header);
        }
        let count = header.count;
        self.header = Some(header);

        if self.block_fail {
            self.reset_frame();
            return;
        }

        if count > 0 {
            let block_count = count.div_ceil(239);
            let mut block_size = count / block_count;
            let big_blocks = count - block_count * block_size;
            self.block_count = block_count;
            self.big_blocks = big_blocks;
            self.block_index = 0;
            self.byte_index_a = 0;
            self.bit_index = 0;
            if big_blocks > 0 {
                block_size += 1;
                self.block_size = block_size;
                self.state = State::RxBigBlocks;
            } else {
                self.block_size = block_size;
                self.state = State::RxSmallBlocks;
            }
        } else if self.emit_blank_crc_without_fec {
            self.finish_without_crc(out, source_chain);
        } else {
            self.state = State::RxTrailingCrc;
        }
    }

    fn on_block_complete(&mut self, out: &mut Vec<Packet>, source_chain: usize) {
        let collected = self.byte_index_a;
        if self.disable_rs {
            // No FEC pass.
        } else {
            match self.block_rs.decode(&mut self.buffer[..collected], collected, self.min_distance) {
                Decoded::Ok(n) => self.bytes_corrected += n,
                Decoded::Fail => self.block_fail = true,
            }
        }

        self.lfsr.reset_to(0x1F0);
        let descrambled = self.lfsr.unscramble_bytes(&self.buffer[..collected]);
        self.buffer[..collected].copy_from_slice(&descrambled);

        self.working_data.extend_from_slice(&self.buffer[..self.block_size]);
        self.block_index += 1;
        self.byte_index_a = 0;

        if self.block_fail {
            self.reset_frame();
            return;
        }

        let is_big_phase = self.state == State::RxBigBlocks;
        if is_big_phase && self.block_index == self.big_blocks {
            if self.block_count > self.block_index {
                self.block_size -= 1;
                self.state = State::RxSmallBlocks;
            } else if self.emit_blank_crc_without_fec {
                self.finish_without_crc(out, source_chain);
            } else {
                self.state = State::RxTrailingCrc;
            }
        } else if !is_big_phase && self.block_index == self.block_count {
            if self.emit_blank_crc_without_fec {
                self.finish_without_crc(out, source_chain);
            } else {
                self.state = State::RxTrailingCrc;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_distance_is_zero_for_identical_words() {
        assert_eq!(bit_distance_24(SYNC_WORD, SYNC_WORD), 0);
    }

    #[test]
    fn bit_distance_counts_single_bit_flip() {
        assert_eq!(bit_distance_24(SYNC_WORD, SYNC_WORD ^ 1), 1);
    }

    #[test]
    fn hamming_decode_recovers_clean_nibbles() {
        // 0x00 and 0x7F encode to 0x0 and 0xf respectively in this table.
        assert_eq!(hamming_decode(0x00), 0x0);
        assert_eq!(hamming_decode(0x7F), 0xf);
    }

    #[test]
    fn decoder_starts_in_sync_search_and_ignores_noise() {
        let mut decoder = Il2pDecoder::default();
        let noise: Vec<AddressedByte> =
            (0..32).map(|i| AddressedByte { byte: (i * 37) as u8, stream_address: i as u64 }).collect();
        let packets = decoder.decode(&noise, 0);
        assert!(packets.is_empty());
    }

    #[test]
    fn u_control_table_round_trips_known_opcode() {
        let header = Header {
            type_subfield: 1,
            count: 0,
            pid_subfield: 1,
            control_subfield: 0,
            dest: [0; 7],
            source: [0; 7],
            ax25_type: Ax25Type::U,
            ax25_pid_byte: 0,
            pf_bit: true,
            c_bit: false,
            nr: 0,
            ns: 0,
            control_opcode: 3,
        };
        assert_eq!(reform_control_byte(&header), U_CONTROL[3] | 0x10);
    }

    #[test]
    fn finish_reports_corrections_accumulated_during_decode() {
        let mut decoder = Il2pDecoder::default();
        decoder.working_data = vec![1, 2, 3];
        decoder.bytes_corrected = 2;
        decoder.stream_address = 99;
        let mut out = Vec::new();
        decoder.finish_without_crc(&mut out, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes_corrected, 2);
        assert_eq!(out[0].stream_address, 99);
        assert_eq!(decoder.bytes_corrected, 0, "reset_frame should clear the counter for the next frame");
    }
}
