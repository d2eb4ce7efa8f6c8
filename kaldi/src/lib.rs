//! Kaldi-style embedding containers and text tables.
//!
//! - [`ArkWriter`] / [`ArkReader`]: `.ark` archives of `key -> vector`.
//! - [`read_scp`] / [`load_scp`]: `.scp` scripts of `key path:offset`.
//! - [`read_table`] / [`write_lines`]: whitespace tables such as
//!   `spk2gender` and `spk2utt`.
//!
//! Vectors are written as binary single-precision (`FV`). Reading also
//! accepts double-precision vectors, single-row matrices and text entries.

mod ark;
mod error;
mod scp;
mod table;

pub use ark::{ArkReader, ArkWriter, read_object};
pub use error::KaldiError;
pub use scp::{ScpEntry, load_scp, parse_scp_line, read_scp, write_ark_scp};
pub use table::{parse_table, read_table, write_lines};
