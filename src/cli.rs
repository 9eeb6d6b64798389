pub mod context;
pub mod install;
pub mod services;
pub mod sync;

pub use context::AppContext;
pub use install::{InstallArgs, InstallByNameArgs, InstallFolderArgs, UninstallArgs};
pub use services::ServicesCommand;
pub use sync::SyncCommand;
