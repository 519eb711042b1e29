//! Data types flowing through the pipeline:
//! batch payload → `VisitRecord` → classification / summary → `BatchOutcome`.

pub mod record;
pub mod classification;
pub mod summary;
pub mod report;

pub use record::VisitRecord;
pub use classification::{Classification, ClassificationRecord, RiskLabel};
pub use summary::ClientSummary;
pub use report::{BatchOutcome, BatchStatus, FailureKind, UnitFailure};
