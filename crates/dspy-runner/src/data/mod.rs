pub mod api_bank;
pub mod conversation;
pub mod dataloader;

pub use api_bank::*;
pub use conversation::*;
pub use dataloader::*;
