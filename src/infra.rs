pub mod compose_store;
pub mod config;
pub mod docker_compose;
pub mod fs_ops;
pub mod git_fetcher;
pub mod prompt;

pub use compose_store::ComposeStore;
pub use docker_compose::DockerComposeManager;
pub use git_fetcher::GitFetcher;
pub use prompt::TerminalPrompt;
