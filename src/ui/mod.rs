pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, pending_name, record_line, section, status, success, timing, warn};
pub use progress::{IngestProgress, Spinner};
pub use progress_message::{ProgressMessage, ProgressPhase};
pub use table::{pending_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
