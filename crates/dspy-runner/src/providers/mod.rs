pub mod dummy;
pub mod openai;

pub use dummy::*;
pub use openai::*;
