// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "combines/http_api.rs"]
pub mod combines;

#[path = "league/league_client.rs"]
pub mod league;

#[path = "settings/mod.rs"]
pub mod settings;
