use std::io::{self, BufWriter, Read, Write};

use crate::common::io::read_full;

use super::core::{decode_to_vec, encode_into, encoded_len, is_z85_char};

/// Streaming encode chunk: 4MB. A multiple of 4, so only the final chunk
/// of a stream can carry a padding tail.
const STREAM_ENCODE_CHUNK: usize = 4 * 1024 * 1024;

/// Encodes chunk after chunk into reusable buffers, carrying the output
/// column across chunks so line wrapping is seamless.
struct LineEncoder {
    wrap_col: usize,
    col: usize,
    encode_buf: Vec<u8>,
    wrap_buf: Vec<u8>,
}

impl LineEncoder {
    fn new(wrap_col: usize, max_chunk: usize) -> Self {
        let enc_max = encoded_len(max_chunk);
        // Wrapped output: content plus at most one newline per line, plus a spare.
        let wrap_max = if wrap_col == 0 {
            0
        } else {
            enc_max + enc_max / wrap_col + 2
        };
        LineEncoder {
            wrap_col,
            col: 0,
            encode_buf: vec![0u8; enc_max],
            wrap_buf: vec![0u8; wrap_max],
        }
    }

    fn write_chunk(&mut self, chunk: &[u8], out: &mut impl Write) -> io::Result<()> {
        let n = encode_into(chunk, &mut self.encode_buf);
        if self.wrap_col == 0 {
            return out.write_all(&self.encode_buf[..n]);
        }
        let wp = wrap_lines(
            &self.encode_buf[..n],
            self.wrap_col,
            &mut self.col,
            &mut self.wrap_buf,
        );
        out.write_all(&self.wrap_buf[..wp])
    }

    /// Terminate a partial last line.
    fn finish(&self, out: &mut impl Write) -> io::Result<()> {
        if self.col > 0 {
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Encode data and write to output, wrapping lines at `wrap_col`
/// characters (0 disables wrapping). Empty input writes nothing.
pub fn encode_to_writer(data: &[u8], wrap_col: usize, out: &mut impl Write) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let mut enc = LineEncoder::new(wrap_col, data.len().min(STREAM_ENCODE_CHUNK));
    for chunk in data.chunks(STREAM_ENCODE_CHUNK) {
        enc.write_chunk(chunk, out)?;
    }
    enc.finish(out)
}

/// Copy encoded text into `wrap_buf`, ending a line whenever `col`
/// reaches `wrap_col`. `col` carries over between chunks.
/// Returns the number of bytes placed in `wrap_buf`.
#[inline]
fn wrap_lines(text: &[u8], wrap_col: usize, col: &mut usize, wrap_buf: &mut [u8]) -> usize {
    let mut wp = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(wrap_col - *col));
        wrap_buf[wp..wp + line.len()].copy_from_slice(line);
        wp += line.len();
        *col += line.len();
        if *col == wrap_col {
            wrap_buf[wp] = b'\n';
            wp += 1;
            *col = 0;
        }
        rest = tail;
    }
    wp
}

/// Stream-encode from a reader to a writer. Used for stdin processing.
pub fn encode_stream(
    reader: &mut impl Read,
    wrap_col: usize,
    writer: &mut impl Write,
) -> io::Result<()> {
    let mut buf = vec![0u8; STREAM_ENCODE_CHUNK];
    let mut out = BufWriter::with_capacity(2 * 1024 * 1024, writer);
    let mut enc = LineEncoder::new(wrap_col, STREAM_ENCODE_CHUNK);

    loop {
        let n = read_full(reader, &mut buf)?;
        if n == 0 {
            break;
        }
        enc.write_chunk(&buf[..n], &mut out)?;
        if n < buf.len() {
            break;
        }
    }

    enc.finish(&mut out)?;
    out.flush()
}

/// Decode Z85 data and write to output.
/// When `ignore_garbage` is true, strip every byte outside the alphabet.
/// When false, only strip whitespace.
pub fn decode_to_writer(
    data: &[u8],
    ignore_garbage: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    if ignore_garbage {
        let cleaned = strip_non_z85(data);
        return decode_filtered(out, &cleaned, data, is_z85_char);
    }

    decode_stripping_whitespace(data, out)
}

/// Strip whitespace from the whole input in one pass, then decode once.
fn decode_stripping_whitespace(data: &[u8], out: &mut impl Write) -> io::Result<()> {
    if memchr::memchr(b'\n', data).is_none() && !data.iter().any(|&b| is_whitespace(b)) {
        return decode_filtered(out, data, data, |_| true);
    }

    // Newlines are the common case: copy the runs between them with memchr.
    let mut clean = Vec::with_capacity(data.len());
    let mut last = 0;
    for pos in memchr::memchr_iter(b'\n', data) {
        if pos > last {
            clean.extend_from_slice(&data[last..pos]);
        }
        last = pos + 1;
    }
    if last < data.len() {
        clean.extend_from_slice(&data[last..]);
    }

    if clean.iter().any(|&b| is_whitespace(b)) {
        clean.retain(|&b| !is_whitespace(b));
    }

    decode_filtered(out, &clean, data, |b| !is_whitespace(b))
}

/// Decode `cleaned`, the bytes of `raw` for which `kept` holds.
/// Error offsets are reported against `raw`. Empty data writes nothing.
fn decode_filtered(
    out: &mut impl Write,
    cleaned: &[u8],
    raw: &[u8],
    kept: fn(u8) -> bool,
) -> io::Result<()> {
    if cleaned.is_empty() {
        return Ok(());
    }
    let decoded = decode_to_vec(cleaned)
        .map_err(|e| e.map_position(|p| raw_offset(raw, kept, p)))?;
    out.write_all(&decoded)
}

/// Offset in `raw` of the `nth` byte that survived filtering.
fn raw_offset(raw: &[u8], kept: fn(u8) -> bool, nth: usize) -> usize {
    raw.iter()
        .enumerate()
        .filter(|&(_, &b)| kept(b))
        .nth(nth)
        .map_or(raw.len(), |(i, _)| i)
}

/// Strip non-alphabet bytes (for -i / --ignore-garbage).
fn strip_non_z85(data: &[u8]) -> Vec<u8> {
    data.iter().copied().filter(|&b| is_z85_char(b)).collect()
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Stream-decode from a reader to a writer. Used for stdin processing.
/// Decoding needs the whole input to place the padding tail, so it is
/// read fully first.
pub fn decode_stream(
    reader: &mut impl Read,
    ignore_garbage: bool,
    writer: &mut impl Write,
) -> io::Result<()> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut out = BufWriter::with_capacity(2 * 1024 * 1024, writer);
    decode_to_writer(&data, ignore_garbage, &mut out)?;
    out.flush()
}
