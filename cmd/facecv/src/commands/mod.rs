//! CLI commands module.

mod enroll;
mod info;
mod query;
mod run;
mod util;

pub use enroll::EnrollCommand;
pub use info::{InspectCommand, ListCommand};
pub use query::QueryCommand;
pub use run::RunCommand;
