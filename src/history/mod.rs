pub mod storage;
pub mod types;

pub use storage::{get_history_path, HistoryLog};
pub use types::HistoryRow;
