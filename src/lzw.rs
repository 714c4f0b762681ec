// lzw.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Lempel-Ziv-Welch compression for GIF
//!
//! Variable-width codes packed LSB-first, framed into sub-blocks of at
//! most 255 bytes.  The code dictionary is a fixed-capacity open-addressed
//! hash table which is cleared whenever it fills.

/// Maximum code bits allowed for GIF
const MAX_BITS: u8 = 12;

/// First code past the 12-bit range; never emitted
const MAX_MAX_CODE: u16 = 1 << MAX_BITS;

/// Hash table size (80% occupancy at 4096 codes)
const HSIZE: usize = 5003;

/// Empty hash slot sentinel
const EMPTY: i32 = -1;

/// Sub-block staging threshold
const BLOCK_SIZE: usize = 254;

/// Largest code for a given bit width
fn max_code(bits: u8) -> u16 {
    (1 << bits) - 1
}

/// LZW data compressor
///
/// Compressed output starts with the minimum code size byte, followed by
/// length-prefixed sub-blocks.  The adjacent zero-length block terminator
/// is the caller's to write.
pub struct Compressor {
    /// Minimum code size in bits
    min_code_bits: u8,
    /// Current code width in bits
    n_bits: u8,
    /// Largest code for the current width
    max_code: u16,
    /// Hash keys: `(symbol << 12) + prefix`, or `EMPTY`
    htab: Vec<i32>,
    /// Code assigned to the key in the same `htab` slot
    codetab: Vec<u16>,
    /// First unused code
    free_ent: u16,
    /// Dictionary clear pending (width resets after the clear code)
    clear_flg: bool,
    /// Bit accumulator
    cur_accum: u32,
    /// Number of bits in the accumulator
    cur_bits: u8,
    /// Sub-block staging buffer
    block: [u8; BLOCK_SIZE],
    /// Number of staged bytes
    block_len: usize,
}

impl Compressor {
    /// Create a new compressor.
    ///
    /// * `min_code_bits` Initial code width; must be 2 or more (8 for a
    ///   256-entry palette).
    pub fn new(min_code_bits: u8) -> Self {
        let min_code_bits = min_code_bits.clamp(2, MAX_BITS - 1);
        Compressor {
            min_code_bits,
            n_bits: min_code_bits + 1,
            max_code: max_code(min_code_bits + 1),
            htab: vec![EMPTY; HSIZE],
            codetab: vec![0; HSIZE],
            free_ent: 0,
            clear_flg: false,
            cur_accum: 0,
            cur_bits: 0,
            block: [0; BLOCK_SIZE],
            block_len: 0,
        }
    }

    /// Get the clear code
    fn clear_code(&self) -> u16 {
        1 << self.min_code_bits
    }

    /// Get the end-of-stream code
    fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// Compress a byte buffer, appending output to `buffer`
    pub fn compress(&mut self, pixels: &[u8], buffer: &mut Vec<u8>) {
        buffer.push(self.min_code_bits);
        self.n_bits = self.min_code_bits + 1;
        self.max_code = max_code(self.n_bits);
        self.free_ent = self.clear_code() + 2;
        self.clear_flg = false;
        self.cur_accum = 0;
        self.cur_bits = 0;
        self.block_len = 0;
        let hshift = {
            let mut shift = 0;
            let mut fcode = HSIZE;
            while fcode < 65536 {
                fcode *= 2;
                shift += 1;
            }
            8 - shift
        };
        self.clear_hash();
        self.output(self.clear_code(), buffer);
        let mut pix = pixels.iter().copied();
        if let Some(first) = pix.next() {
            let mut ent = u16::from(first);
            'pixels: for c in pix {
                let c = u16::from(c);
                let fcode = (i32::from(c) << MAX_BITS) + i32::from(ent);
                let mut i = (usize::from(c) << hshift) ^ usize::from(ent);
                if self.htab[i] == fcode {
                    ent = self.codetab[i];
                    continue;
                }
                if self.htab[i] != EMPTY {
                    // secondary hash (after G. Knott)
                    let disp = if i == 0 { 1 } else { HSIZE - i };
                    loop {
                        if i < disp {
                            i += HSIZE;
                        }
                        i -= disp;
                        if self.htab[i] == fcode {
                            ent = self.codetab[i];
                            continue 'pixels;
                        }
                        if self.htab[i] == EMPTY {
                            break;
                        }
                    }
                }
                self.output(ent, buffer);
                ent = c;
                if self.free_ent < MAX_MAX_CODE {
                    self.codetab[i] = self.free_ent;
                    self.free_ent += 1;
                    self.htab[i] = fcode;
                } else {
                    self.clear_block(buffer);
                }
            }
            self.output(ent, buffer);
        }
        self.output(self.end_code(), buffer);
        while self.cur_bits > 0 {
            self.stage(self.cur_accum as u8, buffer);
            self.cur_accum >>= 8;
            self.cur_bits = self.cur_bits.saturating_sub(8);
        }
        self.flush_block(buffer);
    }

    /// Pack one code into the accumulator, draining complete bytes
    fn output(&mut self, code: u16, buffer: &mut Vec<u8>) {
        self.cur_accum |= u32::from(code) << self.cur_bits;
        self.cur_bits += self.n_bits;
        while self.cur_bits >= 8 {
            self.stage(self.cur_accum as u8, buffer);
            self.cur_accum >>= 8;
            self.cur_bits -= 8;
        }
        if self.free_ent > self.max_code || self.clear_flg {
            if self.clear_flg {
                self.n_bits = self.min_code_bits + 1;
                self.max_code = max_code(self.n_bits);
                self.clear_flg = false;
            } else {
                self.n_bits += 1;
                self.max_code = if self.n_bits == MAX_BITS {
                    MAX_MAX_CODE
                } else {
                    max_code(self.n_bits)
                };
            }
        }
    }

    /// Clear the dictionary and emit the clear code
    fn clear_block(&mut self, buffer: &mut Vec<u8>) {
        self.clear_hash();
        self.free_ent = self.clear_code() + 2;
        self.clear_flg = true;
        self.output(self.clear_code(), buffer);
    }

    /// Reset the hash table to all-empty
    fn clear_hash(&mut self) {
        self.htab.fill(EMPTY);
    }

    /// Stage one byte, flushing a sub-block at capacity
    fn stage(&mut self, c: u8, buffer: &mut Vec<u8>) {
        self.block[self.block_len] = c;
        self.block_len += 1;
        if self.block_len >= BLOCK_SIZE {
            self.flush_block(buffer);
        }
    }

    /// Flush staged bytes as one length-prefixed sub-block
    fn flush_block(&mut self, buffer: &mut Vec<u8>) {
        if self.block_len > 0 {
            buffer.push(self.block_len as u8);
            buffer.extend_from_slice(&self.block[..self.block_len]);
            self.block_len = 0;
        }
    }
}

/// Decompress an LZW unit produced by `Compressor` (test support).
///
/// Mirrors the width growth rule: the width is promoted when the next
/// assignable code would not fit the current width.
#[cfg(test)]
pub(crate) fn decompress(data: &[u8], min_code_bits: u8) -> Vec<u8> {
    assert_eq!(data[0], min_code_bits);
    let mut bytes = Vec::new();
    let mut pos = 1;
    while pos < data.len() {
        let len = usize::from(data[pos]);
        pos += 1;
        if len == 0 {
            break;
        }
        assert!(pos + len <= data.len(), "sub-block overruns data");
        bytes.extend_from_slice(&data[pos..pos + len]);
        pos += len;
    }
    let clear = 1u16 << min_code_bits;
    let end = clear + 1;
    let reset = |dict: &mut Vec<Vec<u8>>| {
        dict.clear();
        for b in 0..clear {
            dict.push(vec![b as u8]);
        }
        dict.push(Vec::new()); // clear code
        dict.push(Vec::new()); // end code
    };
    let mut dict: Vec<Vec<u8>> = Vec::with_capacity(usize::from(MAX_MAX_CODE));
    reset(&mut dict);
    let mut width = min_code_bits + 1;
    let mut prev: Option<u16> = None;
    let mut out = Vec::new();
    let mut accum: u32 = 0;
    let mut n_bits: u8 = 0;
    let mut iter = bytes.iter();
    'codes: loop {
        while n_bits < width {
            match iter.next() {
                Some(b) => {
                    accum |= u32::from(*b) << n_bits;
                    n_bits += 8;
                }
                None => break 'codes,
            }
        }
        let code = (accum & ((1 << width) - 1)) as u16;
        accum >>= width;
        n_bits -= width;
        if code == clear {
            reset(&mut dict);
            width = min_code_bits + 1;
            prev = None;
            continue;
        }
        if code == end {
            break;
        }
        let entry = if usize::from(code) < dict.len() {
            let entry = dict[usize::from(code)].clone();
            assert!(!entry.is_empty(), "reserved code in stream");
            if let Some(p) = prev {
                let mut grown = dict[usize::from(p)].clone();
                grown.push(entry[0]);
                if dict.len() < usize::from(MAX_MAX_CODE) {
                    dict.push(grown);
                }
            }
            entry
        } else {
            // code not yet in the dictionary: must be the next assigned
            assert_eq!(usize::from(code), dict.len());
            let p = prev.expect("no prefix for deferred code");
            let mut grown = dict[usize::from(p)].clone();
            let first = grown[0];
            grown.push(first);
            if dict.len() < usize::from(MAX_MAX_CODE) {
                dict.push(grown.clone());
            }
            grown
        };
        out.extend_from_slice(&entry);
        prev = Some(code);
        if dict.len() > usize::from(max_code(width)) && width < MAX_BITS {
            width += 1;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(pixels: &[u8], min_code_bits: u8) {
        let mut buffer = Vec::new();
        Compressor::new(min_code_bits).compress(pixels, &mut buffer);
        assert_eq!(decompress(&buffer, min_code_bits), pixels);
    }

    #[test]
    fn round_trip_small() {
        round_trip(&[0, 1, 2, 1, 0, 1, 2, 1, 0], 8);
        round_trip(&[42], 8);
        round_trip(&[], 8);
    }

    #[test]
    fn round_trip_min_width() {
        let pixels: Vec<u8> = (0..2000u32).map(|i| (i % 4) as u8).collect();
        round_trip(&pixels, 2);
    }

    #[test]
    fn round_trip_uniform() {
        round_trip(&vec![5; 10_000], 8);
    }

    #[test]
    fn round_trip_noise() {
        // incompressible input grows codes to 12 bits and forces
        // dictionary clears
        let mut seed = 1u32;
        let pixels: Vec<u8> = (0..50_000)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (seed >> 16) as u8
            })
            .collect();
        round_trip(&pixels, 8);
    }

    #[test]
    fn sub_block_framing() {
        let pixels: Vec<u8> = (0..20_000u32).map(|i| (i % 7) as u8).collect();
        let mut buffer = Vec::new();
        Compressor::new(8).compress(&pixels, &mut buffer);
        assert_eq!(buffer[0], 8);
        let mut pos = 1;
        let mut blocks = 0;
        while pos < buffer.len() {
            let len = usize::from(buffer[pos]);
            assert!(len > 0 && len <= 255);
            pos += 1 + len;
            blocks += 1;
        }
        // every length byte matched its payload exactly
        assert_eq!(pos, buffer.len());
        assert!(blocks > 1);
    }

    #[test]
    fn leading_code_size_byte() {
        for bits in [2, 4, 8] {
            let mut buffer = Vec::new();
            Compressor::new(bits).compress(&[0, 0, 1], &mut buffer);
            assert_eq!(buffer[0], bits);
        }
    }
}
