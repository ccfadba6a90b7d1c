pub mod cost_record;
pub mod report;

pub use cost_record::{CostRecord, NormalizedRow};
pub use report::{FailedInsert, ImportReport, RejectedRow};
