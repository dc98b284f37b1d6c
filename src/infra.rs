pub mod ansible;
pub mod command;
pub mod config;
pub mod docker_adapter;

pub use command::SystemCommandRunner;
pub use config::Settings;
pub use docker_adapter::DockerAdapter;
