pub mod assistant;
pub mod context;
pub mod error;
pub mod io;
pub mod materialize;
pub mod navigation;
pub mod prompt;
pub mod settings;
pub mod types;
pub mod wizard;

pub use error::{AssistError, LaunchError, Result};
