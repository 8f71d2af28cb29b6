//! GIF-flavored LZW compressor: variable-bit-width codes, an open-addressed XOR-hashed
//! dictionary, adaptive code-size growth, a mid-stream CLEAR-code reset, and sub-block
//! packetization into the GIF 1..255-byte data-block format.
//!
//! The `hashes`/`codes` open-addressing scheme, the `char_out`/`flush_char` sub-block
//! accumulator, and the `output` bit-packer with its CLEAR-on-overflow branch follow the
//! classic Unix-`compress`-derived LZW encoder that every GIF encoder in this family
//! descends from.

use crate::buffer::ByteBuffer;

const BITS: i32 = 12;
const HASH_SIZE: usize = 5003;
const HSHIFT: i32 = 4;
const MAX_MAX_CODE: i32 = 1 << BITS;

struct LzwState {
    g_init_bits: i32,
    n_bits: i32,
    maxcode: i32,
    clear_code: i32,
    eof_code: i32,
    free_ent: i32,
    clear_flg: bool,

    hashes: Vec<i32>,
    codes: Vec<i32>,

    cur_acc: i32,
    cur_bits: i32,

    pkt: [u8; 256],
    pkt_len: usize,
}

impl LzwState {
    fn new(init_code_size: i32) -> Self {
        let g_init_bits = init_code_size + 1;
        let clear_code = 1 << init_code_size;
        Self {
            g_init_bits,
            n_bits: g_init_bits,
            maxcode: max_code(g_init_bits),
            clear_code,
            eof_code: clear_code + 1,
            free_ent: clear_code + 2,
            clear_flg: false,
            hashes: vec![-1; HASH_SIZE],
            codes: vec![0; HASH_SIZE],
            cur_acc: 0,
            cur_bits: 0,
            pkt: [0; 256],
            pkt_len: 0,
        }
    }

    fn clear_hash(&mut self) {
        self.hashes.iter_mut().for_each(|h| *h = -1);
    }

    fn clear_block(&mut self, out: &mut ByteBuffer) {
        self.clear_hash();
        self.free_ent = self.clear_code + 2;
        self.clear_flg = true;
        self.output(self.clear_code, out);
    }

    fn char_out(&mut self, c: u8, out: &mut ByteBuffer) {
        self.pkt[self.pkt_len] = c;
        self.pkt_len += 1;
        if self.pkt_len >= 254 {
            self.flush_char(out);
        }
    }

    fn flush_char(&mut self, out: &mut ByteBuffer) {
        if self.pkt_len > 0 {
            out.write_byte(self.pkt_len as u8);
            out.write_bytes(&self.pkt, 0, self.pkt_len);
            self.pkt_len = 0;
        }
    }

    fn output(&mut self, code: i32, out: &mut ByteBuffer) {
        self.cur_acc &= (1 << self.cur_bits) - 1;

        if self.cur_bits > 0 {
            self.cur_acc |= code << self.cur_bits;
        } else {
            self.cur_acc = code;
        }
        self.cur_bits += self.n_bits;

        while self.cur_bits >= 8 {
            self.char_out((self.cur_acc & 0xff) as u8, out);
            self.cur_acc >>= 8;
            self.cur_bits -= 8;
        }

        if self.free_ent > self.maxcode || self.clear_flg {
            if self.clear_flg {
                self.n_bits = self.g_init_bits;
                self.maxcode = max_code(self.n_bits);
                self.clear_flg = false;
            } else {
                self.n_bits += 1;
                self.maxcode = if self.n_bits == BITS {
                    MAX_MAX_CODE
                } else {
                    max_code(self.n_bits)
                };
            }
        }

        if code == self.eof_code {
            while self.cur_bits > 0 {
                self.char_out((self.cur_acc & 0xff) as u8, out);
                self.cur_acc >>= 8;
                self.cur_bits -= 8;
            }
            self.flush_char(out);
        }
    }
}

fn max_code(n_bits: i32) -> i32 {
    (1 << n_bits) - 1
}

/// A GIF-flavored LZW encoder for a fixed `color_depth` (bits per indexed pixel).
pub struct LzwEncoder {
    color_depth: u8,
}

impl LzwEncoder {
    pub fn new(color_depth: u8) -> Self {
        Self { color_depth }
    }

    /// Writes the full image-data section: the `init_code_size` byte, the LZW-compressed
    /// sub-blocks, and the `0x00` terminator.
    pub fn encode(&self, pixels: &[u8], out: &mut ByteBuffer) {
        let init_code_size = self.color_depth.max(2) as i32;
        out.write_byte(init_code_size as u8);

        let mut st = LzwState::new(init_code_size);
        st.output(st.clear_code, out);

        if let Some((&first, rest)) = pixels.split_first() {
            let mut ent = first as i32;

            for &byte in rest {
                let c = byte as i32;
                let fcode = (c << BITS) + ent;
                let mut i = ((c << HSHIFT) ^ ent) as usize % HASH_SIZE;

                if st.hashes[i] == fcode {
                    ent = st.codes[i];
                    continue;
                }

                if st.hashes[i] >= 0 {
                    let disp = if i == 0 { 1 } else { HASH_SIZE - i };
                    let mut found = false;
                    loop {
                        i = (i + HASH_SIZE - disp % HASH_SIZE) % HASH_SIZE;
                        if st.hashes[i] == fcode {
                            ent = st.codes[i];
                            found = true;
                            break;
                        }
                        if st.hashes[i] < 0 {
                            break;
                        }
                    }
                    if found {
                        continue;
                    }
                }

                st.output(ent, out);
                ent = c;
                if st.free_ent < MAX_MAX_CODE {
                    st.codes[i] = st.free_ent;
                    st.free_ent += 1;
                    st.hashes[i] = fcode;
                } else {
                    st.clear_block(out);
                }
            }

            st.output(ent, out);
        }

        st.output(st.eof_code, out);
        out.write_byte(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_sub_blocks(data: &[u8]) -> Vec<u8> {
        // Reference GIF sub-block unpacker + LSB-first variable-width LZW decoder, used
        // only by tests to validate round-tripping.
        let min_code_size = data[0] as i32;
        let mut body = &data[1..];
        let mut bits: Vec<u8> = Vec::new();
        loop {
            let len = body[0] as usize;
            if len == 0 {
                break;
            }
            body = &body[1..];
            let block = &body[..len];
            for &byte in block {
                for bit in 0..8 {
                    bits.push((byte >> bit) & 1);
                }
            }
            body = &body[len..];
        }

        let clear_code = 1 << min_code_size;
        let eof_code = clear_code + 1;
        let mut code_size = min_code_size + 1;
        let mut next_code = eof_code + 1;
        let mut table: Vec<Vec<u8>> = (0..clear_code).map(|i| vec![i as u8]).collect();
        table.push(vec![]); // clear
        table.push(vec![]); // eof

        let mut pos = 0usize;
        let read_code = |pos: &mut usize, size: i32| -> i32 {
            let mut v = 0i32;
            for b in 0..size {
                if *pos >= bits.len() {
                    return eof_code;
                }
                v |= (bits[*pos] as i32) << b;
                *pos += 1;
            }
            v
        };

        let mut out = Vec::new();
        let mut prev: Option<Vec<u8>> = None;

        loop {
            let code = read_code(&mut pos, code_size);
            if code == eof_code {
                break;
            }
            if code == clear_code {
                table.truncate((clear_code + 2) as usize);
                code_size = min_code_size + 1;
                next_code = eof_code + 1;
                prev = None;
                continue;
            }

            let entry = if (code as usize) < table.len() {
                table[code as usize].clone()
            } else if code as usize == table.len() {
                let mut e = prev.clone().unwrap();
                e.push(prev.as_ref().unwrap()[0]);
                e
            } else {
                panic!("bad code");
            };

            out.extend_from_slice(&entry);

            if let Some(p) = &prev {
                let mut new_entry = p.clone();
                new_entry.push(entry[0]);
                table.push(new_entry);
                next_code += 1;
                if next_code == (1 << code_size) && code_size < 12 {
                    code_size += 1;
                }
            }

            prev = Some(entry);
        }

        out
    }

    #[test]
    fn round_trips_simple_sequence() {
        // Scenario S6.
        let data = [1u8, 1, 1, 2, 1, 1, 1, 2];
        let enc = LzwEncoder::new(8);
        let mut buf = ByteBuffer::new();
        enc.encode(&data, &mut buf);

        assert_eq!(buf.view()[0], 8, "min code size byte");
        assert_eq!(*buf.view().last().unwrap(), 0, "block terminator");

        let decoded = decode_sub_blocks(buf.view());
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_uniform_data() {
        let data = vec![7u8; 1024];
        let enc = LzwEncoder::new(8);
        let mut buf = ByteBuffer::new();
        enc.encode(&data, &mut buf);
        let decoded = decode_sub_blocks(buf.view());
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_data_that_forces_a_clear() {
        // Enough distinct short cycles to exhaust the 4096-entry code table and force a
        // mid-stream CLEAR reset.
        let mut data = Vec::new();
        for i in 0..20000u32 {
            data.push((i % 200) as u8);
        }
        let enc = LzwEncoder::new(8);
        let mut buf = ByteBuffer::new();
        enc.encode(&data, &mut buf);
        let decoded = decode_sub_blocks(buf.view());
        assert_eq!(decoded, data);
    }

    #[test]
    fn sub_blocks_are_all_within_1_to_255_bytes() {
        let data = vec![3u8; 5000];
        let enc = LzwEncoder::new(8);
        let mut buf = ByteBuffer::new();
        enc.encode(&data, &mut buf);

        let mut body = &buf.view()[1..buf.len() - 1]; // strip min-code-size and terminator
        while !body.is_empty() {
            let len = body[0] as usize;
            assert!(len >= 1 && len <= 255);
            body = &body[1 + len..];
        }
    }

    #[test]
    fn empty_input_still_emits_clear_eof_and_terminator() {
        let enc = LzwEncoder::new(8);
        let mut buf = ByteBuffer::new();
        enc.encode(&[], &mut buf);
        assert_eq!(buf.view()[0], 8);
        assert_eq!(*buf.view().last().unwrap(), 0);
    }
}
