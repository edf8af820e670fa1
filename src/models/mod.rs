// Re-export all model types from submodules
mod appointment;
mod common;
mod dashboard;
mod envelope;
mod lead;
mod property;
mod user;

pub use appointment::*;
pub use common::{deserialize_some, MonthRange, UnknownVariant};
pub use dashboard::*;
pub use envelope::*;
pub use lead::*;
pub use property::*;
pub use user::*;
