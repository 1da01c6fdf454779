pub mod data_name;
pub mod log_entry;

pub use data_name::NameEntry;
pub use log_entry::{LabeledLogEntry, LogEntry, NewLogEntry};
