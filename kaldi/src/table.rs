use std::fs;
use std::io::Write;
use std::path::Path;

use crate::KaldiError;

/// Parses whitespace-separated `key value...` lines. Blank lines are skipped;
/// a key alone yields an empty value list.
pub fn parse_table(text: &str) -> Vec<(String, Vec<String>)> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let key = fields.next()?;
            Some((key.to_string(), fields.map(str::to_string).collect()))
        })
        .collect()
}

/// Reads a table file such as `spk2gender` or `spk2utt`.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<String>)>, KaldiError> {
    let text = fs::read_to_string(path)?;
    Ok(parse_table(&text))
}

/// Writes newline-terminated lines.
pub fn write_lines<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> Result<(), KaldiError> {
    let mut f = fs::File::create(path)?;
    for line in lines {
        f.write_all(line.as_ref().as_bytes())?;
        f.write_all(b"\n")?;
    }
    f.flush()?;
    Ok(())
}
