pub mod action;
pub mod collapse;
pub mod entry;

pub use action::*;
pub use collapse::collapse;
pub use entry::*;
