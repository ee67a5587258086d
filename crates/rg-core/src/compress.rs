//! `put_bits`: the compressed-or-uncompressed bitmap emitter consumed by
//! an external command-list writer.

use crate::config::EngineLimits;
use crate::error::{RasterError, RasterResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCode {
    None,
    Constant,
    RunLength,
    Group4Facsimile,
}

#[derive(Debug, Clone)]
pub struct CompressedBitmap {
    pub code: CompressionCode,
    pub data: Vec<u8>,
}

/// Emits `pixel_data` (a tightly packed `height` x `raster`-byte bitmap)
/// under whichever of {none, constant, run-length, group-4-facsimile}
/// produces the smallest output, per `limits.compressed_bitmap_limit_bytes`.
pub fn put_bits(
    pixel_data: &[u8],
    height: usize,
    raster: usize,
    limits: &EngineLimits,
) -> RasterResult<CompressedBitmap> {
    let expected_len = raster * height;
    if pixel_data.len() < expected_len {
        return Err(RasterError::Range(format!(
            "put_bits: pixel_data too short for {height} rows x {raster} bytes"
        )));
    }
    let rows = &pixel_data[..expected_len];

    let mut candidates = vec![CompressedBitmap {
        code: CompressionCode::None,
        data: rows.to_vec(),
    }];

    if let Some(constant) = try_constant(rows) {
        candidates.push(constant);
    }
    candidates.push(CompressedBitmap {
        code: CompressionCode::RunLength,
        data: run_length_encode(rows),
    });
    if raster * 8 >= 1 {
        candidates.push(CompressedBitmap {
            code: CompressionCode::Group4Facsimile,
            data: group4_encode_rows(rows, raster),
        });
    }

    let best = candidates
        .into_iter()
        .min_by_key(|c| c.data.len())
        .expect("at least the None candidate is always present");

    if best.data.len() > limits.compressed_bitmap_limit_bytes {
        return Err(RasterError::Limit(format!(
            "put_bits: best encoding {} bytes exceeds cap {}",
            best.data.len(),
            limits.compressed_bitmap_limit_bytes
        )));
    }
    Ok(best)
}

fn try_constant(rows: &[u8]) -> Option<CompressedBitmap> {
    let first = *rows.first()?;
    if rows.iter().all(|&b| b == first) {
        Some(CompressedBitmap {
            code: CompressionCode::Constant,
            data: vec![first],
        })
    } else {
        None
    }
}

/// A PackBits-style byte-oriented run-length scheme: a signed length byte
/// `n` followed by either `n+1` literal bytes (n in 0..=127) or one byte
/// repeated `257-n` times (n in 129..=255). 128 is unused (no-op).
fn run_length_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let run_len = run_length_at(data, i);
        if run_len >= 2 {
            let n = (257 - run_len.min(128)) as u8;
            out.push(n);
            out.push(data[i]);
            i += run_len.min(128);
        } else {
            let start = i;
            let mut len = 1;
            while i + len < data.len() && len < 128 && run_length_at(data, i + len) < 2 {
                len += 1;
            }
            out.push((len - 1) as u8);
            out.extend_from_slice(&data[start..start + len]);
            i += len;
        }
    }
    out
}

fn run_length_at(data: &[u8], start: usize) -> usize {
    let b = data[start];
    let mut n = 1;
    while start + n < data.len() && data[start + n] == b {
        n += 1;
    }
    n
}

pub fn run_length_decode(encoded: &[u8], expected_len: usize) -> RasterResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0;
    while i < encoded.len() {
        let n = encoded[i] as i8;
        i += 1;
        if n >= 0 {
            let count = n as usize + 1;
            out.extend_from_slice(&encoded[i..i + count]);
            i += count;
        } else {
            let count = 257 - (n as i16 + 256) as usize;
            let byte = encoded[i];
            i += 1;
            out.extend(std::iter::repeat(byte).take(count));
        }
    }
    Ok(out)
}

/// A 1-bit-only modified-READ-style row encoder, scoped to round-tripping
/// monobit tiles (not a general CCITT Group 4 implementation). Each row is
/// encoded as a sequence of changing-element run lengths starting from an
/// implicit white (0) reference, varint-coded.
fn group4_encode_rows(rows: &[u8], raster: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows.chunks(raster) {
        let runs = changing_element_runs(row, raster * 8);
        out.push(runs.len() as u8);
        for run in runs {
            encode_varint(run as u32, &mut out);
        }
    }
    out
}

fn changing_element_runs(row: &[u8], width_bits: usize) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0u8;
    let mut run_len = 0usize;
    for x in 0..width_bits {
        let byte = row[x / 8];
        let bit = (byte >> (7 - x % 8)) & 1;
        if bit == current {
            run_len += 1;
        } else {
            runs.push(run_len);
            current = bit;
            run_len = 1;
        }
    }
    runs.push(run_len);
    runs
}

fn encode_varint(mut v: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn decode_varint(data: &[u8], pos: &mut usize) -> u32 {
    let mut v = 0u32;
    let mut shift = 0;
    loop {
        let byte = data[*pos];
        *pos += 1;
        v |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    v
}

pub fn group4_decode_rows(encoded: &[u8], raster: usize, height: usize) -> RasterResult<Vec<u8>> {
    let width_bits = raster * 8;
    let mut out = vec![0u8; raster * height];
    let mut pos = 0;
    for row_index in 0..height {
        let run_count = encoded
            .get(pos)
            .copied()
            .ok_or_else(|| RasterError::Range("group4_decode_rows: truncated stream".into()))?
            as usize;
        pos += 1;
        let row = &mut out[row_index * raster..(row_index + 1) * raster];
        let mut x = 0usize;
        let mut color = 0u8;
        for _ in 0..run_count {
            let run = decode_varint(encoded, &mut pos) as usize;
            if color == 1 {
                for bit_x in x..(x + run).min(width_bits) {
                    row[bit_x / 8] |= 0x80 >> (bit_x % 8);
                }
            }
            x += run;
            color ^= 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rectangle_picks_constant_code() {
        let limits = EngineLimits::default();
        let data = vec![0x42u8; 64];
        let result = put_bits(&data, 8, 8, &limits).unwrap();
        assert_eq!(result.code, CompressionCode::Constant);
        assert_eq!(result.data, vec![0x42]);
    }

    #[test]
    fn run_length_round_trips() {
        let data = vec![1, 1, 1, 1, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3];
        let encoded = run_length_encode(&data);
        let decoded = run_length_decode(&encoded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn group4_round_trips_a_monobit_row() {
        let raster = 2;
        let row = [0b1111_0000u8, 0b0000_0000];
        let encoded = group4_encode_rows(&row, raster);
        let decoded = group4_decode_rows(&encoded, raster, 1).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn oversized_output_is_limit_error() {
        let limits = EngineLimits {
            compressed_bitmap_limit_bytes: 4,
            ..EngineLimits::default()
        };
        let data = vec![0xAAu8; 64];
        assert!(put_bits(&data, 8, 8, &limits).is_err());
    }
}
