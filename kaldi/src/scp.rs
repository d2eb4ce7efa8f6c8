use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::KaldiError;
use crate::ark::{ArkReader, ArkWriter, read_object};

/// One line of a `.scp` script: `key path[:offset]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpEntry {
    pub key: String,
    pub path: PathBuf,
    /// Byte offset of the value inside the archive. `None` reads the first
    /// object of the file.
    pub offset: Option<u64>,
}

/// Parses a script line. Blank lines yield `None`.
pub fn parse_scp_line(line: &str, line_no: usize) -> Result<Option<ScpEntry>, KaldiError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let malformed = || KaldiError::MalformedScript {
        line: line_no,
        text: line.to_string(),
    };
    let (key, rest) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
    let rxfilename = rest.trim();
    if rxfilename.is_empty() {
        return Err(malformed());
    }

    let (path, offset) = match rxfilename.rsplit_once(':') {
        Some((path, off)) if !path.is_empty() => match off.parse::<u64>() {
            Ok(off) => (path, Some(off)),
            Err(_) => (rxfilename, None),
        },
        _ => (rxfilename, None),
    };

    Ok(Some(ScpEntry {
        key: key.to_string(),
        path: PathBuf::from(path),
        offset,
    }))
}

/// Reads every entry of a `.scp` file.
pub fn read_scp(path: impl AsRef<Path>) -> Result<Vec<ScpEntry>, KaldiError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        if let Some(entry) = parse_scp_line(&line?, i + 1)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Resolves every entry of a `.scp` file to its vector.
///
/// Each referenced archive is opened once. Entries keep script order.
pub fn load_scp(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<f32>)>, KaldiError> {
    let entries = read_scp(path.as_ref())?;
    let mut archives: HashMap<PathBuf, BufReader<File>> = HashMap::new();
    let mut out = Vec::with_capacity(entries.len());

    for entry in entries {
        let reader = match archives.entry(entry.path.clone()) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => v.insert(BufReader::new(File::open(&entry.path)?)),
        };
        let vector = match entry.offset {
            Some(off) => {
                reader.seek(SeekFrom::Start(off))?;
                read_object(reader)?
            }
            None => {
                reader.seek(SeekFrom::Start(0))?;
                match ArkReader::new(&mut *reader).next() {
                    Some(r) => r?.1,
                    None => {
                        return Err(KaldiError::Malformed(format!(
                            "{} is empty",
                            entry.path.display()
                        )));
                    }
                }
            }
        };
        out.push((entry.key, vector));
    }

    debug!(path = %path.as_ref().display(), count = out.len(), "loaded script");
    Ok(out)
}

/// Writes `dir/name.ark` and `dir/name.scp` for the given entries.
///
/// Returns the `(ark, scp)` paths.
pub fn write_ark_scp<'a, I>(
    dir: &Path,
    name: &str,
    entries: I,
) -> Result<(PathBuf, PathBuf), KaldiError>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let ark_path = dir.join(format!("{name}.ark"));
    let scp_path = dir.join(format!("{name}.scp"));

    let mut ark = ArkWriter::new(BufWriter::new(File::create(&ark_path)?));
    let mut scp = BufWriter::new(File::create(&scp_path)?);

    let mut count = 0usize;
    for (key, vector) in entries {
        let offset = ark.write_vector(key, vector)?;
        writeln!(scp, "{key} {}:{offset}", ark_path.display())?;
        count += 1;
    }
    ark.flush()?;
    scp.flush()?;

    debug!(ark = %ark_path.display(), count, "wrote archive");
    Ok((ark_path, scp_path))
}
