//! Client side of wxmcp.
//!
//! The client:
//! - Starts the weather service as a subprocess (or an embedded task)
//! - Talks JSON-RPC to it over the service's stdin/stdout
//! - Presents a shell, either as a TUI or reading commands from a pipe
//! - Stops the service on request or on exit

pub mod command;
pub mod connection;
pub mod error;
pub mod process;
pub mod script;
pub mod shell;
pub mod tui;

pub use command::ShellCommand;
pub use connection::Lookup;
pub use script::run_script;
pub use shell::Shell;
pub use tui::run_tui;
