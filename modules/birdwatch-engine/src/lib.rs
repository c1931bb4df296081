pub mod assembler;
pub mod cancel;
pub mod filter;
pub mod monitor;
pub mod paginator;
pub mod replies;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use assembler::{AssemblerConfig, AssemblyOutcome, CheckpointPolicy, ConversationAssembler};
pub use cancel::CancelToken;
pub use filter::{apply_filters, FilterOptions};
pub use monitor::{Monitor, MonitorConfig, MonitorReport};
pub use paginator::{PaginationOutcome, SearchPaginator, StopReason};
pub use replies::collect_replies;
pub use traits::{CheckpointSink, SearchApi};
