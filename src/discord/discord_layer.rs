// Discord layer - commands and the serenity room gateway.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "combines/rooms.rs"]
pub mod rooms;

// Re-export the shared state type for the composition root
pub use commands::Data;
