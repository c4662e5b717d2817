pub mod commands;
pub mod status_view;
pub mod terminal;

pub use terminal::TerminalUI;
