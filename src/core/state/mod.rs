pub mod app_state;
pub mod settings;

pub use app_state::InstallerContext;
pub use settings::{InstallerSettings, Mode};
