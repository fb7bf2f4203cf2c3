use rayon::prelude::*;

use super::error::Z85Error;

/// The Z85 alphabet (ZeroMQ RFC 32/Z85). A character's index is its digit value.
pub const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// Lowest byte in the alphabet. Reverse lookups are offset by it.
const REV_SHIFT: u8 = b'!';

/// One slot per byte from `'!'` through `'}'`, the highest alphabet byte.
const REV_LEN: usize = (b'}' - REV_SHIFT) as usize + 1;

const fn build_decode_table() -> [Option<u8>; REV_LEN] {
    let mut table = [None; REV_LEN];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[(ALPHABET[i] - REV_SHIFT) as usize] = Some(i as u8);
        i += 1;
    }
    table
}

const DECODE_TABLE: [Option<u8>; REV_LEN] = build_decode_table();

/// Place values of the five digits in a block, most significant first.
const POW85: [u32; 5] = [85 * 85 * 85 * 85, 85 * 85 * 85, 85 * 85, 85, 1];

/// Inputs at least this large are split across the rayon pool.
/// Below it the thread pool wake-up costs more than the work itself.
pub const PARALLEL_THRESHOLD: usize = 1024 * 1024;

/// Raw bytes per parallel task. Block-aligned so every task sees whole groups.
const PAR_RAW_CHUNK: usize = 64 * 1024;

/// Encoded bytes per parallel task, the image of `PAR_RAW_CHUNK`.
const PAR_TEXT_CHUNK: usize = PAR_RAW_CHUNK / 4 * 5;

/// Digit value of an encoded byte, or `None` if it is not in the alphabet.
#[inline]
pub fn digit_value(b: u8) -> Option<u8> {
    let idx = b.checked_sub(REV_SHIFT)? as usize;
    DECODE_TABLE.get(idx).copied().flatten()
}

#[inline]
pub fn is_z85_char(b: u8) -> bool {
    digit_value(b).is_some()
}

/// Number of characters produced by encoding `n` bytes.
/// A tail of `r` bytes contributes `r + 1` characters.
#[inline]
pub fn encoded_len(n: usize) -> usize {
    n / 4 * 5 + if n % 4 != 0 { n % 4 + 1 } else { 0 }
}

/// Number of bytes produced by decoding `n` characters.
/// A tail of `r` characters yields `r - 1` bytes.
pub fn decoded_len(n: usize) -> Result<usize, Z85Error> {
    if n % 5 == 1 {
        return Err(Z85Error::InvalidLength { len: n });
    }
    Ok(n / 5 * 4 + (n % 5).saturating_sub(1))
}

#[inline]
fn lookup(b: u8, position: usize) -> Result<u8, Z85Error> {
    digit_value(b).ok_or(Z85Error::InvalidCharacter { byte: b, position })
}

// ======================== Encode ========================

/// Encode one 4-byte group into 5 characters.
/// The first byte is the most significant byte of the group's value.
#[inline]
fn encode_block(chunk: &[u8], out: &mut [u8]) {
    let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    for (c, &place) in out.iter_mut().zip(POW85.iter()) {
        *c = ALPHABET[(value / place % 85) as usize];
    }
}

/// Encode a 1-3 byte tail into `tail.len() + 1` characters.
///
/// Only the bytes present contribute to the value (first byte most
/// significant), and its digits are emitted least significant first.
fn encode_tail(tail: &[u8], out: &mut [u8]) {
    debug_assert!((1..4).contains(&tail.len()));
    debug_assert_eq!(out.len(), tail.len() + 1);
    let value = tail.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    for (c, &place) in out.iter_mut().zip(POW85.iter().rev()) {
        *c = ALPHABET[(value / place % 85) as usize];
    }
}

/// Encode whole groups. `data.len()` must be a multiple of 4.
fn encode_blocks(data: &[u8], out: &mut [u8]) {
    for (chunk, dst) in data.chunks_exact(4).zip(out.chunks_exact_mut(5)) {
        encode_block(chunk, dst);
    }
}

/// Encode `data` into the front of `out`, returning the number of bytes written.
///
/// # Panics
///
/// Panics if `out` is shorter than `encoded_len(data.len())`.
pub fn encode_into(data: &[u8], out: &mut [u8]) -> usize {
    let len = encoded_len(data.len());
    let out = &mut out[..len];

    let full = data.len() - data.len() % 4;
    let (body, tail) = data.split_at(full);
    let (out_body, out_tail) = out.split_at_mut(full / 4 * 5);

    if body.len() >= PARALLEL_THRESHOLD {
        body.par_chunks(PAR_RAW_CHUNK)
            .zip(out_body.par_chunks_mut(PAR_TEXT_CHUNK))
            .for_each(|(src, dst)| encode_blocks(src, dst));
    } else {
        encode_blocks(body, out_body);
    }

    if !tail.is_empty() {
        encode_tail(tail, out_tail);
    }
    len
}

/// Encode to ASCII bytes. Empty input gives an empty vector.
pub fn encode_to_vec(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; encoded_len(data.len())];
    encode_into(data, &mut out);
    out
}

/// Encode `data` as a Z85 string.
/// Returns `Z85Error::EmptyInput` for a zero-length buffer.
pub fn encode(data: &[u8]) -> Result<String, Z85Error> {
    if data.is_empty() {
        return Err(Z85Error::EmptyInput);
    }
    let bytes = encode_to_vec(data);
    // SAFETY: every byte was taken from ALPHABET, which is ASCII
    Ok(unsafe { String::from_utf8_unchecked(bytes) })
}

// ======================== Decode ========================

/// Decode one 5-character group starting at input offset `position`.
#[inline]
fn decode_block(chunk: &[u8], position: usize, out: &mut [u8]) -> Result<(), Z85Error> {
    let mut value = 0u64;
    for (i, (&b, &place)) in chunk.iter().zip(POW85.iter()).enumerate() {
        value += u64::from(lookup(b, position + i)?) * u64::from(place);
    }
    let value = u32::try_from(value).map_err(|_| Z85Error::Overflow { position })?;
    out.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Decode a 2-4 character tail into `chunk.len() - 1` bytes.
/// The first character is the least significant digit.
fn decode_tail(chunk: &[u8], position: usize, out: &mut [u8]) -> Result<(), Z85Error> {
    debug_assert!((2..5).contains(&chunk.len()));
    let n = chunk.len() - 1;
    debug_assert_eq!(out.len(), n);

    // At most 84 * (85^3 + 85^2 + 85 + 1), well inside u32.
    let mut value = 0u32;
    for (i, (&b, &place)) in chunk.iter().zip(POW85.iter().rev()).enumerate() {
        value += u32::from(lookup(b, position + i)?) * place;
    }
    if value >> (8 * n) != 0 {
        return Err(Z85Error::Overflow { position });
    }

    for (j, b) in out.iter_mut().enumerate() {
        *b = (value >> (8 * (n - 1 - j))) as u8;
    }
    Ok(())
}

/// Decode whole groups. `position` is the input offset of `data[0]`.
fn decode_blocks(data: &[u8], position: usize, out: &mut [u8]) -> Result<(), Z85Error> {
    for (i, (chunk, dst)) in data.chunks_exact(5).zip(out.chunks_exact_mut(4)).enumerate() {
        decode_block(chunk, position + i * 5, dst)?;
    }
    Ok(())
}

/// Decode Z85 bytes. Empty input gives an empty vector.
///
/// On failure the error describes the lowest offset at fault, whether the
/// input took the parallel path or not.
pub fn decode_to_vec(data: &[u8]) -> Result<Vec<u8>, Z85Error> {
    let mut out = vec![0u8; decoded_len(data.len())?];

    let full = data.len() - data.len() % 5;
    let (body, tail) = data.split_at(full);
    let (out_body, out_tail) = out.split_at_mut(full / 5 * 4);

    if body.len() >= PARALLEL_THRESHOLD {
        let failed = body
            .par_chunks(PAR_TEXT_CHUNK)
            .zip(out_body.par_chunks_mut(PAR_RAW_CHUNK))
            .enumerate()
            .map(|(i, (src, dst))| decode_blocks(src, i * PAR_TEXT_CHUNK, dst))
            .find_first(|r| r.is_err());
        if let Some(Err(e)) = failed {
            return Err(e);
        }
    } else {
        decode_blocks(body, 0, out_body)?;
    }

    if !tail.is_empty() {
        decode_tail(tail, full, out_tail)?;
    }
    Ok(out)
}

/// Decode Z85 bytes.
/// Returns `Z85Error::EmptyInput` for a zero-length buffer.
pub fn decode_bytes(data: &[u8]) -> Result<Vec<u8>, Z85Error> {
    if data.is_empty() {
        return Err(Z85Error::EmptyInput);
    }
    decode_to_vec(data)
}

/// Decode a Z85 string.
pub fn decode(text: &str) -> Result<Vec<u8>, Z85Error> {
    decode_bytes(text.as_bytes())
}
