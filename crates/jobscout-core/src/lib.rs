pub mod acquire;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod progress;
pub mod record;
pub mod risk;
pub mod schema;
pub mod throttle;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use acquire::AcquisitionService;
pub use classifier::{BlockSignal, BlockType, Remediation, ResponseClassifier};
pub use config::{EngineConfig, RotationStrategy};
pub use error::{AcquisitionError, AppError};
pub use fetch::{FetchMode, FetchRequest, FetchResult, RawResponse, StrategyKind};
pub use merge::{MergedRecord, merge_records};
pub use models::{
    EmploymentType, Field, FieldSource, JobLocation, JobPosting, MethodKind, NewPosting,
    SalaryPeriod, SalaryRange, compute_hash,
};
pub use normalize::Normalizer;
pub use orchestrator::Orchestrator;
pub use progress::{AcquireEvent, NullReporter, ProgressReporter, TracingReporter};
pub use record::{ExtractionRecord, FieldValue};
pub use traits::{FetchExecutor, NullStore, PostingStore, RecordExtractor};
