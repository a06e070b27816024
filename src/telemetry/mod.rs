mod encoder;
mod report_log;
mod types;

pub use encoder::Encoder;
pub use report_log::{render_table, DisplayRow, ReportLog, DEFAULT_CAPACITY};
pub use types::{Fix, LocationReport, OperatorId};

pub const MPS_TO_KMH: f64 = 3.6;
