use std::io::{BufRead, Write};

use crate::KaldiError;

const BINARY_MARKER: [u8; 2] = [0, b'B'];
/// Kaldi prefixes every binary integer with its byte width.
const INT32_SIZE: u8 = 4;

/// Writes `key -> vector` entries to a Kaldi archive.
///
/// Each entry is written as:
///
/// ```text
/// key ' ' '\0' 'B' "FV " [0x04] [i32 dim] [dim x f32]
/// ```
///
/// All multi-byte values are little-endian.
pub struct ArkWriter<W: Write> {
    w: W,
    pos: u64,
}

impl<W: Write> ArkWriter<W> {
    pub fn new(w: W) -> Self {
        Self { w, pos: 0 }
    }

    /// Appends one entry. Returns the byte offset of its value (just after
    /// `key `), as referenced from `.scp` files.
    pub fn write_vector(&mut self, key: &str, vector: &[f32]) -> Result<u64, KaldiError> {
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(KaldiError::InvalidKey(key.to_string()));
        }
        let dim = i32::try_from(vector.len())
            .map_err(|_| KaldiError::Malformed(format!("vector too long: {}", vector.len())))?;

        self.w.write_all(key.as_bytes())?;
        self.w.write_all(b" ")?;
        let offset = self.pos + key.len() as u64 + 1;

        self.w.write_all(&BINARY_MARKER)?;
        self.w.write_all(b"FV ")?;
        self.w.write_all(&[INT32_SIZE])?;
        self.w.write_all(&dim.to_le_bytes())?;
        for &v in vector {
            self.w.write_all(&v.to_le_bytes())?;
        }

        self.pos = offset + 2 + 3 + 1 + 4 + 4 * vector.len() as u64;
        Ok(offset)
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn flush(&mut self) -> Result<(), KaldiError> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Streams `(key, vector)` entries from a Kaldi archive.
pub struct ArkReader<R: BufRead> {
    r: R,
}

impl<R: BufRead> ArkReader<R> {
    pub fn new(r: R) -> Self {
        Self { r }
    }

    fn read_key(&mut self) -> Result<Option<String>, KaldiError> {
        skip_whitespace(&mut self.r)?;
        let mut key = Vec::new();
        self.r.read_until(b' ', &mut key)?;
        if key.is_empty() {
            return Ok(None);
        }
        if key.pop() != Some(b' ') {
            return Err(KaldiError::Malformed(format!(
                "truncated key {:?}",
                String::from_utf8_lossy(&key)
            )));
        }
        String::from_utf8(key)
            .map(Some)
            .map_err(|e| KaldiError::Malformed(format!("key is not utf-8: {e}")))
    }
}

impl<R: BufRead> Iterator for ArkReader<R> {
    type Item = Result<(String, Vec<f32>), KaldiError>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.read_key() {
            Ok(Some(k)) => k,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        Some(read_object(&mut self.r).map(|v| (key, v)))
    }
}

/// Reads one vector object positioned just after `key `.
///
/// Accepts binary `FV`/`DV` vectors, binary `FM`/`DM` matrices with a
/// single row, and text vectors `[ v1 v2 ... ]`.
pub fn read_object<R: BufRead + ?Sized>(r: &mut R) -> Result<Vec<f32>, KaldiError> {
    let first = {
        let buf = r.fill_buf()?;
        match buf.first() {
            Some(&b) => b,
            None => return Err(KaldiError::Malformed("missing value".into())),
        }
    };
    if first != BINARY_MARKER[0] {
        return read_text_vector(r);
    }

    let mut marker = [0u8; 2];
    r.read_exact(&mut marker)?;
    if marker != BINARY_MARKER {
        return Err(KaldiError::Malformed(format!("bad binary marker {marker:?}")));
    }

    let token = read_token(r)?;
    match token.as_str() {
        "FV" => {
            let dim = read_dim(r)?;
            read_f32s(r, dim)
        }
        "DV" => {
            let dim = read_dim(r)?;
            read_f64s(r, dim)
        }
        "FM" | "DM" => {
            let rows = read_dim(r)?;
            let cols = read_dim(r)?;
            if rows != 1 {
                return Err(KaldiError::UnsupportedObject(format!("{token} with {rows} rows")));
            }
            if token == "FM" {
                read_f32s(r, cols)
            } else {
                read_f64s(r, cols)
            }
        }
        other => Err(KaldiError::UnsupportedObject(other.to_string())),
    }
}

fn read_token<R: BufRead + ?Sized>(r: &mut R) -> Result<String, KaldiError> {
    let mut token = Vec::new();
    r.read_until(b' ', &mut token)?;
    if token.pop() != Some(b' ') {
        return Err(KaldiError::Malformed("truncated object token".into()));
    }
    Ok(String::from_utf8_lossy(&token).into_owned())
}

fn read_dim<R: BufRead + ?Sized>(r: &mut R) -> Result<usize, KaldiError> {
    let mut size = [0u8; 1];
    r.read_exact(&mut size)?;
    if size[0] != INT32_SIZE {
        return Err(KaldiError::Malformed(format!("unexpected int size {}", size[0])));
    }
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    let v = i32::from_le_bytes(buf);
    usize::try_from(v).map_err(|_| KaldiError::Malformed(format!("negative dimension {v}")))
}

fn read_f32s<R: BufRead + ?Sized>(r: &mut R, n: usize) -> Result<Vec<f32>, KaldiError> {
    let mut buf = vec![0u8; n * 4];
    r.read_exact(&mut buf)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_f64s<R: BufRead + ?Sized>(r: &mut R, n: usize) -> Result<Vec<f32>, KaldiError> {
    let mut buf = vec![0u8; n * 8];
    r.read_exact(&mut buf)?;
    Ok(buf
        .chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b) as f32
        })
        .collect())
}

fn read_text_vector<R: BufRead + ?Sized>(r: &mut R) -> Result<Vec<f32>, KaldiError> {
    let mut text = Vec::new();
    r.read_until(b']', &mut text)?;
    if text.last() != Some(&b']') {
        return Err(KaldiError::Malformed("unterminated text vector".into()));
    }
    let text = String::from_utf8_lossy(&text);
    let body = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| KaldiError::Malformed(format!("bad text vector {text:?}")))?;
    body.split_whitespace()
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| KaldiError::Malformed(format!("bad number {t:?}")))
        })
        .collect()
}

fn skip_whitespace<R: BufRead + ?Sized>(r: &mut R) -> Result<(), KaldiError> {
    loop {
        let (skip, done) = {
            let buf = r.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            (skip, skip < buf.len())
        };
        r.consume(skip);
        if done {
            return Ok(());
        }
    }
}
