// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "combines/mod.rs"]
pub mod combines;

#[path = "league/mod.rs"]
pub mod league;

#[path = "settings/settings_service.rs"]
pub mod settings;
