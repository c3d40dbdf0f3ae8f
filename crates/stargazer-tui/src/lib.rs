// Terminal UI implementation using ratatui
// The trending list, favorites and a detail pane

pub mod app;
pub mod runner;
pub mod ui;

pub use app::{App, InputMode, StatusMessage};
pub use runner::run_tui;
