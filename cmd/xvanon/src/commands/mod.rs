//! CLI commands module.

mod generate;
mod inspect;
mod spk2gender;
mod train;
mod util;

pub use generate::GenCommand;
pub use inspect::InspectCommand;
pub use spk2gender::Spk2genderCommand;
pub use train::TrainCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
