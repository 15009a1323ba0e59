#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod index;
pub mod scan;
pub mod stats;
pub mod storage;
pub mod tenant;

#[cfg(test)]
pub(crate) mod testutil;
