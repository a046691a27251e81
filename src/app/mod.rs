// Console front-end: turns typed lines into session commands and renders state.

pub mod commands;
pub mod console;
pub mod scoreboard;
