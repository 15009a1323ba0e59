pub mod audit_log;
pub mod checkpoint;

pub use audit_log::{AuditLogRead, AuditLogStore};
pub use checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, DEFAULT_CHECKPOINT_LOCATION,
};
