mod command;
mod record;

pub use command::InsertCommand;
pub use record::{RecordLevel, SyntheticRecord, TextShape};
