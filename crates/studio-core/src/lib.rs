pub mod config;
pub mod id;
pub mod model;
pub mod snap;

pub use config::EditorConfig;
pub use id::RecordId;
pub use model::*;
pub use snap::GridSnapper;
