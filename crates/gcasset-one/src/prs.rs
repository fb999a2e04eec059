//! PRS compression.
//!
//! PRS is a byte-oriented LZ77 variant. A stream interleaves control bytes
//! (consumed one bit at a time, least significant bit first) with data bytes:
//!
//! | Control bits | Data bytes     | Meaning                                          |
//! |--------------|----------------|--------------------------------------------------|
//! | `1`          | `b`            | literal `b`                                      |
//! | `0 0 h l`    | `o`            | copy `(h<<1 \| l) + 2` bytes from `0x100 - o` back |
//! | `0 1`        | `lo hi`        | `w = hi<<8 \| lo`; `w == 0` ends the stream       |
//! |              |                | copy `(w & 7) + 2` bytes from `0x2000 - (w >> 3)` back |
//! | `0 1`        | `lo hi n`      | as above with `w & 7 == 0`: copy `n + 1` bytes    |
//!
//! A new control byte is read whenever the previous one runs out of bits, so
//! control bytes sit in the stream exactly where the decoder first needs them.
//!
//! The encoder here is a greedy matcher. Its output decodes with any PRS
//! decoder but is not byte-identical to the compressor the games shipped with.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;

use crate::compression::Compressor;
use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

const SHORT_MAX_DISTANCE: usize = 0x100;
const SHORT_MIN_LENGTH: usize = 2;
const SHORT_MAX_LENGTH: usize = 5;
// 0x2000 is encodable but collides with the end marker in the extended form.
const LONG_MAX_DISTANCE: usize = 0x1FFF;
const LONG_MIN_LENGTH: usize = 3;
const LONG_COMPACT_MAX_LENGTH: usize = 9;
const MAX_LENGTH: usize = 0x100;
const MAX_CANDIDATES: usize = 128;

/// The PRS codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prs;

impl Compressor for Prs {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(compress(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decompress(data)
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    control: u8,
    bits_left: u8,
}

impl<'a> BitReader<'a> {
    fn byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.position).ok_or_else(|| {
            Error::Decompression(format!("stream truncated at offset {:#x}", self.position))
        })?;
        self.position += 1;
        Ok(byte)
    }

    fn bit(&mut self) -> Result<bool> {
        if self.bits_left == 0 {
            self.control = self.byte()?;
            self.bits_left = 8;
        }
        let bit = self.control & 1 != 0;
        self.control >>= 1;
        self.bits_left -= 1;
        Ok(bit)
    }
}

/// Decompress a complete PRS stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BitReader {
        data,
        position: 0,
        control: 0,
        bits_left: 0,
    };
    let mut out = Vec::with_capacity(data.len() * 2);

    loop {
        if reader.bit()? {
            out.push(reader.byte()?);
            continue;
        }

        let (distance, length) = if reader.bit()? {
            let lo = usize::from(reader.byte()?);
            let hi = usize::from(reader.byte()?);
            let word = lo | (hi << 8);
            if word == 0 {
                break;
            }
            let distance = 0x2000 - (word >> 3);
            let length = match word & 7 {
                0 => usize::from(reader.byte()?) + 1,
                n => n + 2,
            };
            (distance, length)
        } else {
            let high = usize::from(reader.bit()?);
            let low = usize::from(reader.bit()?);
            let length = ((high << 1) | low) + 2;
            let distance = SHORT_MAX_DISTANCE - usize::from(reader.byte()?);
            (distance, length)
        };

        if distance > out.len() {
            return Err(Error::Decompression(format!(
                "copy reaches {} bytes back with only {} decoded (input offset {:#x})",
                distance,
                out.len(),
                reader.position
            )));
        }

        let start = out.len() - distance;
        for i in 0..length {
            let byte = out[start + i];
            out.push(byte);
        }
    }

    Ok(out)
}

struct BitWriter {
    out: Vec<u8>,
    control_at: usize,
    control: u8,
    bits_used: u8,
}

impl BitWriter {
    fn new(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            control_at: 0,
            control: 0,
            bits_used: 8,
        }
    }

    fn bit(&mut self, bit: bool) {
        if self.bits_used == 8 {
            self.flush_control();
            self.control_at = self.out.len();
            self.out.push(0);
            self.control = 0;
            self.bits_used = 0;
        }
        self.control |= u8::from(bit) << self.bits_used;
        self.bits_used += 1;
    }

    fn byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    fn flush_control(&mut self) {
        if let Some(slot) = self.out.get_mut(self.control_at) {
            *slot = self.control;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        // End marker: long copy with a zero word.
        self.bit(false);
        self.bit(true);
        self.byte(0);
        self.byte(0);
        self.flush_control();
        self.out
    }
}

/// Find the longest earlier match for `data[pos..]`.
fn longest_match(
    data: &[u8],
    pos: usize,
    chains: &FxHashMap<[u8; 3], Vec<usize>>,
) -> Option<(usize, usize)> {
    let key: [u8; 3] = data.get(pos..pos + 3)?.try_into().ok()?;
    let candidates = chains.get(&key)?;
    let limit = (data.len() - pos).min(MAX_LENGTH);

    let mut best: Option<(usize, usize)> = None;
    for &candidate in candidates.iter().rev().take(MAX_CANDIDATES) {
        let distance = pos - candidate;
        if distance > LONG_MAX_DISTANCE {
            break;
        }
        let length = (0..limit)
            .take_while(|&k| data[candidate + k] == data[pos + k])
            .count();
        if best.map_or(true, |(_, l)| length > l) {
            best = Some((distance, length));
            if length == limit {
                break;
            }
        }
    }

    best.filter(|&(_, length)| length >= LONG_MIN_LENGTH)
}

fn emit_copy(writer: &mut BitWriter, distance: usize, length: usize) {
    if distance <= SHORT_MAX_DISTANCE && (SHORT_MIN_LENGTH..=SHORT_MAX_LENGTH).contains(&length) {
        let size = length - 2;
        writer.bit(false);
        writer.bit(false);
        writer.bit(size & 2 != 0);
        writer.bit(size & 1 != 0);
        writer.byte((SHORT_MAX_DISTANCE - distance) as u8);
        return;
    }

    let field = (0x2000 - distance) << 3;
    writer.bit(false);
    writer.bit(true);
    if length <= LONG_COMPACT_MAX_LENGTH {
        let word = field | (length - 2);
        writer.byte(word as u8);
        writer.byte((word >> 8) as u8);
    } else {
        writer.byte(field as u8);
        writer.byte((field >> 8) as u8);
        writer.byte((length - 1) as u8);
    }
}

/// Compress `data` into a PRS stream.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new(data.len() / 2 + 16);
    let mut chains: FxHashMap<[u8; 3], Vec<usize>> = FxHashMap::default();

    let insert = |chains: &mut FxHashMap<[u8; 3], Vec<usize>>, at: usize| {
        if let Some(key) = data.get(at..at + 3) {
            let key: [u8; 3] = [key[0], key[1], key[2]];
            chains.entry(key).or_default().push(at);
        }
    };

    let mut pos = 0;
    while pos < data.len() {
        match longest_match(data, pos, &chains) {
            Some((distance, length)) => {
                emit_copy(&mut writer, distance, length);
                for at in pos..pos + length {
                    insert(&mut chains, at);
                }
                pos += length;
            }
            None => {
                writer.bit(true);
                writer.byte(data[pos]);
                insert(&mut chains, pos);
                pos += 1;
            }
        }
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_decode_hand_built_stream() {
        // literal 'a', short copy (length 4, distance 1), end marker.
        // Control bits LSB first: 1, 0 0 1 0, 0 1 -> 0b0100_1001
        let stream = [0x49, b'a', 0xFF, 0x00, 0x00];
        assert_eq!(decompress(&stream).unwrap(), b"aaaaa");
    }

    #[test]
    fn test_empty_input() {
        let compressed = compress(&[]);
        assert_eq!(compressed, vec![0b10, 0, 0]);
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_repetitive() {
        let data: Vec<u8> = b"ABCDABCDABCDEFGHEFGH".iter().cycle().take(5000).copied().collect();
        let compressed = compress(&data);
        assert!(compressed.len() < data.len() / 4);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_round_trip_run_uses_overlapping_copies() {
        let data = vec![0x5A; 1000];
        let compressed = compress(&data);
        assert!(compressed.len() < 32);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_round_trip_noise_and_long_distances() {
        let noise = pseudo_random(0x3000, 7);
        let mut data = noise.clone();
        data.extend_from_slice(&noise[..0x800]);
        assert_eq!(decompress(&compress(&data)).unwrap(), data);
    }

    #[test]
    fn test_all_copy_forms_round_trip() {
        // short (len 2..5), long compact (len 3..9), long extended (len 10..256)
        let mut data = pseudo_random(0x400, 3);
        let base = data.clone();
        data.extend_from_slice(&base[0x3F0..0x3F4]);
        data.extend_from_slice(&base[0x10..0x18]);
        data.extend_from_slice(&base[0x20..0x120]);
        assert_eq!(decompress(&compress(&data)).unwrap(), data);
    }

    #[test]
    fn test_truncated_stream_fails() {
        let compressed = compress(b"hello hello hello");
        let result = decompress(&compressed[..compressed.len() - 1]);
        assert!(matches!(result, Err(Error::Decompression(_))));
    }

    #[test]
    fn test_copy_before_start_fails() {
        // Short copy as the very first command: nothing to copy from yet.
        let stream = [0b0000_0000, 0xFF];
        assert!(matches!(decompress(&stream), Err(Error::Decompression(_))));
    }
}
