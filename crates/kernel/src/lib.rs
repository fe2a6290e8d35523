pub mod module;
pub mod registry;
pub mod settings;
pub mod shared;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
pub use settings::Settings;
pub use shared::SharedSettings;
