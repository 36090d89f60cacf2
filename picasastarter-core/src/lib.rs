pub mod backup;
pub mod buttons;
pub mod command;
pub mod drive;
pub mod errors;
pub mod launcher;
pub mod models;
pub mod prompt;
pub mod resolve;
pub mod startup;
pub mod store;
pub mod workflow;

pub use backup::{BackupOutcome, BackupReport};
pub use command::{parse_directives, Command, Invocation, Target};
pub use drive::*;
pub use errors::*;
pub use launcher::{LaunchRequest, PicasaRunner, ProcessProbe};
pub use models::*;
pub use prompt::*;
pub use store::memory::MemoryStore;
pub use store::SettingsStore;
