pub mod runner;
pub mod shutdown;
pub mod tenant;

pub use runner::IndexingRunner;
pub use shutdown::{ShutdownHandle, ShutdownSignal};
pub use tenant::{ScanOutcome, ScanResult, ScanState, TenantScanner};
