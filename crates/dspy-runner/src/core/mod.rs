mod errors;
pub mod lm;
pub mod settings;

pub use errors::{ConfigError, ErrorClass, LmError, ToolSchemaError};
pub use lm::*;
pub use settings::*;
