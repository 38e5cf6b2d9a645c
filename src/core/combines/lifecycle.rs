// Lobby room lifecycle: webhook-driven creation of the home/away voice pair,
// the announcement, and the delayed teardown.
//
// NO Discord types here. All channel work goes through the RoomGateway port
// so the precondition and idempotency rules stay testable with a fake guild.

use super::models::{room_names, parse_room_name, CombineEvent, CombinesLobby, EventKind};
use crate::core::settings::{SettingsError, SettingsStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A Discord category tops out at 50 channels; combines stops filling one
/// past this count and spills into an overflow category.
pub const MAX_CATEGORY_CHANNELS: usize = 48;

/// Overflow categories run `{name}-2` through `{name}-4`.
pub const MAX_OVERFLOW_SUFFIX: u32 = 4;

/// Seconds between a Finished event and room deletion, so players are not
/// kicked mid-conversation.
pub const TEARDOWN_GRACE_SECS: i64 = 30;

/// Voice rooms hold a three-player side plus casters.
pub const ROOM_USER_LIMIT: u32 = 5;

/// The announcement text channel the lifecycle requires to already exist.
pub const ANNOUNCEMENTS_CHANNEL: &str = "combines-announcements";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CombinesError {
    #[error("The bot is not a member of guild {0}")]
    NotInGuild(u64),

    #[error("Combines are not active for guild {0}")]
    NotActive(u64),

    #[error("No `{ANNOUNCEMENTS_CHANNEL}` channel exists in guild {0}")]
    MissingAnnouncementChannel(u64),

    #[error("Every combines category in guild {0} is at capacity")]
    CategoriesFull(u64),

    #[error("Event kind `{0}` is not handled")]
    UnhandledEvent(&'static str),

    #[error("Finished event carries no match id")]
    MissingMatchId,

    #[error("Settings store error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Discord error: {0}")]
    Gateway(String),
}

// ============================================================================
// GATEWAY TRAIT (PORT)
// ============================================================================

/// A category as the gateway sees it.
#[derive(Debug, Clone)]
pub struct CategoryInfo {
    pub id: u64,
    pub name: String,
    pub channel_count: usize,
}

/// A channel that lives under a category.
#[derive(Debug, Clone)]
pub struct Room {
    pub channel_id: u64,
    pub name: String,
    pub category_name: String,
}

/// Everything the lifecycle needs from the chat platform, in primitive
/// types. Implemented over serenity in the discord layer.
#[async_trait]
pub trait RoomGateway: Send + Sync {
    async fn is_guild_member(&self, guild_id: u64) -> bool;

    async fn categories(&self, guild_id: u64) -> Result<Vec<CategoryInfo>, CombinesError>;

    async fn create_category(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<CategoryInfo, CombinesError>;

    async fn room_exists(&self, guild_id: u64, name: &str) -> Result<bool, CombinesError>;

    /// Create one voice room under the category, with the user limit and the
    /// league/muted role overwrites applied.
    async fn create_room(
        &self,
        guild_id: u64,
        category_id: u64,
        name: &str,
    ) -> Result<Room, CombinesError>;

    /// Every channel in the guild that lives under a category, with the
    /// category name attached.
    async fn categorized_channels(&self, guild_id: u64) -> Result<Vec<Room>, CombinesError>;

    async fn delete_room(&self, guild_id: u64, channel_id: u64) -> Result<(), CombinesError>;

    /// Post the lobby announcement (credentials, channel mentions, rosters)
    /// in the announcements channel. Errors with
    /// [`CombinesError::MissingAnnouncementChannel`] if that channel does
    /// not exist.
    async fn announce_lobby(
        &self,
        lobby: &CombinesLobby,
        home: &Room,
        away: &Room,
    ) -> Result<(), CombinesError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Orchestrates lobby room creation, announcement, and teardown.
pub struct CombinesService<G: RoomGateway, S: SettingsStore> {
    gateway: G,
    settings: S,
}

impl<G: RoomGateway, S: SettingsStore> CombinesService<G, S> {
    pub fn new(gateway: G, settings: S) -> Self {
        Self { gateway, settings }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Process one webhook batch of lobbies, fail-fast.
    ///
    /// A guild-not-found or combines-inactive failure recurs for every item
    /// in the batch, so the first one short-circuits the rest. Returns how
    /// many lobbies got rooms created.
    pub async fn process_batch(
        &self,
        lobbies: Vec<CombinesLobby>,
    ) -> Result<usize, CombinesError> {
        let mut created = 0;
        for lobby in &lobbies {
            if !lobby.is_active() {
                debug!(lobby_id = lobby.id, "Skipping completed/cancelled lobby");
                continue;
            }
            if !self.create_lobby_rooms(lobby).await?.is_empty() {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Create the home/away voice pair for one lobby and announce it.
    ///
    /// Preconditions are checked in order: the bot must sit in the guild and
    /// combines must be active (hard failures); an unset category, already
    /// existing rooms, or an empty roster end the operation quietly with an
    /// empty result. The soft cases cover at-least-once webhook delivery.
    pub async fn create_lobby_rooms(
        &self,
        lobby: &CombinesLobby,
    ) -> Result<Vec<Room>, CombinesError> {
        let guild_id = lobby.guild_id;

        if !self.gateway.is_guild_member(guild_id).await {
            return Err(CombinesError::NotInGuild(guild_id));
        }

        let settings = self.settings.combines_settings(guild_id).await?;
        if !settings.active {
            return Err(CombinesError::NotActive(guild_id));
        }

        let Some(category_id) = settings.category_id else {
            warn!(guild_id, "No combines category configured, skipping lobby");
            return Ok(Vec::new());
        };

        let (home_name, away_name) = room_names(&lobby.tier, lobby.id);
        if self.gateway.room_exists(guild_id, &home_name).await? {
            debug!(
                guild_id,
                lobby_id = lobby.id,
                "Rooms already exist, skipping duplicate delivery"
            );
            return Ok(Vec::new());
        }

        if lobby.player_count() == 0 {
            warn!(guild_id, lobby_id = lobby.id, "Lobby has no players, skipping");
            return Ok(Vec::new());
        }

        let categories = self.gateway.categories(guild_id).await?;
        let Some(primary) = categories.iter().find(|c| c.id == category_id) else {
            warn!(
                guild_id,
                category_id, "Configured combines category no longer exists, skipping lobby"
            );
            return Ok(Vec::new());
        };

        let target = self.pick_category(guild_id, primary, &categories).await?;

        let home = self.gateway.create_room(guild_id, target, &home_name).await?;
        let away = self.gateway.create_room(guild_id, target, &away_name).await?;

        self.gateway.announce_lobby(lobby, &home, &away).await?;

        info!(
            guild_id,
            lobby_id = lobby.id,
            tier = %lobby.tier,
            "Created combine lobby rooms"
        );

        Ok(vec![home, away])
    }

    /// Pick the category the new pair goes into. The primary is used until
    /// it holds more than [`MAX_CATEGORY_CHANNELS`] channels, then overflow
    /// categories `{name}-2`..`-4` are searched or created.
    async fn pick_category(
        &self,
        guild_id: u64,
        primary: &CategoryInfo,
        categories: &[CategoryInfo],
    ) -> Result<u64, CombinesError> {
        if primary.channel_count <= MAX_CATEGORY_CHANNELS {
            return Ok(primary.id);
        }

        for suffix in 2..=MAX_OVERFLOW_SUFFIX {
            let name = format!("{}-{}", primary.name, suffix);
            match categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&name))
            {
                Some(existing) if existing.channel_count <= MAX_CATEGORY_CHANNELS => {
                    return Ok(existing.id);
                }
                Some(_) => continue,
                None => {
                    info!(guild_id, name = %name, "Creating overflow combines category");
                    let created = self.gateway.create_category(guild_id, &name).await?;
                    return Ok(created.id);
                }
            }
        }

        Err(CombinesError::CategoriesFull(guild_id))
    }

    /// Handle a lifecycle event from the combines service.
    ///
    /// Only `Finished` is acted on: its rooms are queued for teardown after
    /// the grace period. Everything else is deferred to human moderators.
    pub async fn handle_event(&self, event: &CombineEvent) -> Result<(), CombinesError> {
        if event.message_type != EventKind::Finished {
            return Err(CombinesError::UnhandledEvent(event.message_type.as_str()));
        }

        let Some(match_id) = event.match_id else {
            return Err(CombinesError::MissingMatchId);
        };

        if !self.gateway.is_guild_member(event.guild_id).await {
            return Err(CombinesError::NotInGuild(event.guild_id));
        }

        let due = Utc::now() + Duration::seconds(TEARDOWN_GRACE_SECS);
        self.settings
            .schedule_teardown(event.guild_id, match_id, due)
            .await?;

        info!(
            guild_id = event.guild_id,
            lobby_id = match_id,
            "Scheduled lobby room teardown"
        );

        Ok(())
    }

    /// Drain the teardown queue. Called periodically by the background
    /// worker; rows left by a previous process run are picked up here too.
    pub async fn run_due_teardowns(&self, now: DateTime<Utc>) -> Result<usize, CombinesError> {
        let due = self.settings.due_teardowns(now).await?;

        let mut deleted = 0;
        for teardown in due {
            match self.teardown_lobby(teardown.guild_id, teardown.lobby_id).await {
                Ok(count) => deleted += count,
                Err(CombinesError::NotInGuild(guild_id)) => {
                    warn!(guild_id, "Dropping teardown for a guild the bot left");
                }
                Err(e) => return Err(e),
            }
            self.settings.complete_teardown(teardown.id).await?;
        }

        Ok(deleted)
    }

    /// Delete every room that belongs to the lobby, across all combines
    /// categories. Idempotent: a second run finds nothing and deletes
    /// nothing.
    pub async fn teardown_lobby(
        &self,
        guild_id: u64,
        lobby_id: i64,
    ) -> Result<usize, CombinesError> {
        if !self.gateway.is_guild_member(guild_id).await {
            return Err(CombinesError::NotInGuild(guild_id));
        }

        let channels = self.gateway.categorized_channels(guild_id).await?;

        let mut deleted = 0;
        for channel in channels {
            if !channel
                .category_name
                .to_ascii_lowercase()
                .starts_with("combines")
            {
                continue;
            }
            let Some((_, id, _)) = parse_room_name(&channel.name) else {
                continue;
            };
            if id != lobby_id {
                continue;
            }

            self.gateway.delete_room(guild_id, channel.channel_id).await?;
            deleted += 1;
        }

        info!(guild_id, lobby_id, deleted, "Tore down combine lobby rooms");

        Ok(deleted)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combines::test_support::sample_lobby;
    use crate::core::settings::GuildCombinesSettings;
    use crate::infra::settings::InMemorySettingsStore;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const GUILD: u64 = 1234;

    /// An in-memory guild: categories, channels, and an announcement
    /// counter.
    #[derive(Default)]
    struct FakeGuild {
        member: bool,
        categories: Mutex<Vec<CategoryInfo>>,
        channels: Mutex<Vec<Room>>,
        announcements: AtomicUsize,
        next_id: AtomicU64,
    }

    impl FakeGuild {
        fn new() -> Self {
            Self {
                member: true,
                next_id: AtomicU64::new(100),
                ..Default::default()
            }
        }

        fn with_category(self, id: u64, name: &str) -> Self {
            self.categories.lock().unwrap().push(CategoryInfo {
                id,
                name: name.to_string(),
                channel_count: 0,
            });
            self
        }

        fn fill_category(&self, id: u64, count: usize) {
            let mut categories = self.categories.lock().unwrap();
            let category = categories.iter_mut().find(|c| c.id == id).unwrap();
            category.channel_count = count;
        }

        fn channel_names(&self) -> Vec<String> {
            self.channels
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.name.clone())
                .collect()
        }

        fn alloc_id(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RoomGateway for FakeGuild {
        async fn is_guild_member(&self, _guild_id: u64) -> bool {
            self.member
        }

        async fn categories(&self, _guild_id: u64) -> Result<Vec<CategoryInfo>, CombinesError> {
            Ok(self.categories.lock().unwrap().clone())
        }

        async fn create_category(
            &self,
            _guild_id: u64,
            name: &str,
        ) -> Result<CategoryInfo, CombinesError> {
            let category = CategoryInfo {
                id: self.alloc_id(),
                name: name.to_string(),
                channel_count: 0,
            };
            self.categories.lock().unwrap().push(category.clone());
            Ok(category)
        }

        async fn room_exists(&self, _guild_id: u64, name: &str) -> Result<bool, CombinesError> {
            Ok(self
                .channels
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.name == name))
        }

        async fn create_room(
            &self,
            _guild_id: u64,
            category_id: u64,
            name: &str,
        ) -> Result<Room, CombinesError> {
            let category_name = {
                let categories = self.categories.lock().unwrap();
                categories
                    .iter()
                    .find(|c| c.id == category_id)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| CombinesError::Gateway("unknown category".into()))?
            };
            let room = Room {
                channel_id: self.alloc_id(),
                name: name.to_string(),
                category_name,
            };
            self.channels.lock().unwrap().push(room.clone());
            let mut categories = self.categories.lock().unwrap();
            if let Some(c) = categories.iter_mut().find(|c| c.id == category_id) {
                c.channel_count += 1;
            }
            Ok(room)
        }

        async fn categorized_channels(
            &self,
            _guild_id: u64,
        ) -> Result<Vec<Room>, CombinesError> {
            Ok(self.channels.lock().unwrap().clone())
        }

        async fn delete_room(
            &self,
            _guild_id: u64,
            channel_id: u64,
        ) -> Result<(), CombinesError> {
            self.channels
                .lock()
                .unwrap()
                .retain(|c| c.channel_id != channel_id);
            Ok(())
        }

        async fn announce_lobby(
            &self,
            _lobby: &CombinesLobby,
            _home: &Room,
            _away: &Room,
        ) -> Result<(), CombinesError> {
            self.announcements.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn configured_service(
        gateway: FakeGuild,
    ) -> CombinesService<FakeGuild, InMemorySettingsStore> {
        let settings = InMemorySettingsStore::new();
        settings
            .save_combines_settings(
                GUILD,
                &GuildCombinesSettings {
                    active: true,
                    api_url: Some("http://combines.local".into()),
                    category_id: Some(10),
                },
            )
            .await
            .unwrap();
        CombinesService::new(gateway, settings)
    }

    #[tokio::test]
    async fn creates_room_pair_and_announces_once() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;
        let lobby = sample_lobby(42, GUILD, "Diamond");

        let rooms = service.create_lobby_rooms(&lobby).await.unwrap();

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].name, "Diamond-42-home");
        assert_eq!(rooms[1].name, "Diamond-42-away");
        assert_eq!(service.gateway.announcements.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_delivery_is_a_no_op() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;
        let lobby = sample_lobby(42, GUILD, "Diamond");

        service.create_lobby_rooms(&lobby).await.unwrap();
        let second = service.create_lobby_rooms(&lobby).await.unwrap();

        assert!(second.is_empty());
        assert_eq!(service.gateway.channel_names().len(), 2);
        assert_eq!(service.gateway.announcements.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inactive_guild_is_a_hard_failure() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let settings = InMemorySettingsStore::new();
        settings
            .save_combines_settings(
                GUILD,
                &GuildCombinesSettings {
                    active: false,
                    api_url: None,
                    category_id: Some(10),
                },
            )
            .await
            .unwrap();
        let service = CombinesService::new(gateway, settings);

        let err = service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap_err();
        assert!(matches!(err, CombinesError::NotActive(g) if g == GUILD));
        assert!(service.gateway.channel_names().is_empty());
    }

    #[tokio::test]
    async fn missing_guild_is_a_hard_failure() {
        let mut gateway = FakeGuild::new();
        gateway.member = false;
        let service = configured_service(gateway).await;

        let err = service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap_err();
        assert!(matches!(err, CombinesError::NotInGuild(g) if g == GUILD));
    }

    #[tokio::test]
    async fn unset_category_skips_quietly() {
        let gateway = FakeGuild::new();
        let settings = InMemorySettingsStore::new();
        settings
            .save_combines_settings(
                GUILD,
                &GuildCombinesSettings {
                    active: true,
                    api_url: None,
                    category_id: None,
                },
            )
            .await
            .unwrap();
        let service = CombinesService::new(gateway, settings);

        let rooms = service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap();
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn empty_roster_skips_quietly() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;
        let mut lobby = sample_lobby(42, GUILD, "Diamond");
        lobby.home.clear();
        lobby.away.clear();

        let rooms = service.create_lobby_rooms(&lobby).await.unwrap();
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn overflow_category_is_used_when_primary_is_full() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        gateway.fill_category(10, 49);
        let service = configured_service(gateway).await;

        let rooms = service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap();

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].category_name, "combines-2");
        assert_eq!(rooms[1].category_name, "combines-2");
    }

    #[tokio::test]
    async fn existing_overflow_with_room_is_reused() {
        let gateway = FakeGuild::new()
            .with_category(10, "combines")
            .with_category(11, "combines-2");
        gateway.fill_category(10, 49);
        let service = configured_service(gateway).await;

        let rooms = service
            .create_lobby_rooms(&sample_lobby(7, GUILD, "Premier"))
            .await
            .unwrap();

        assert_eq!(rooms[0].category_name, "combines-2");
        // No extra overflow category got created.
        assert_eq!(service.gateway.categories.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn completed_lobbies_are_skipped_in_batches() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;

        let mut done = sample_lobby(1, GUILD, "Diamond");
        done.completed = true;
        let live = sample_lobby(2, GUILD, "Diamond");

        let created = service.process_batch(vec![done, live]).await.unwrap();
        assert_eq!(created, 1);
        assert_eq!(
            service.gateway.channel_names(),
            vec!["Diamond-2-home", "Diamond-2-away"]
        );
    }

    #[tokio::test]
    async fn finished_event_schedules_teardown_with_grace() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;

        let event = CombineEvent {
            nickname: "nick".into(),
            discord_id: 5,
            status: "done".into(),
            message_type: EventKind::Finished,
            message: String::new(),
            match_id: Some(42),
            guild_id: GUILD,
        };
        service.handle_event(&event).await.unwrap();

        // Not due yet: nothing happens inside the grace window.
        let ran = service.run_due_teardowns(Utc::now()).await.unwrap();
        assert_eq!(ran, 0);

        let later = Utc::now() + Duration::seconds(TEARDOWN_GRACE_SECS + 1);
        let due = service.settings.due_teardowns(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lobby_id, 42);
    }

    #[tokio::test]
    async fn unhandled_event_kinds_are_rejected() {
        let gateway = FakeGuild::new();
        let service = configured_service(gateway).await;

        let event = CombineEvent {
            nickname: String::new(),
            discord_id: 5,
            status: String::new(),
            message_type: EventKind::ScoreMismatch,
            message: String::new(),
            match_id: Some(42),
            guild_id: GUILD,
        };
        assert!(matches!(
            service.handle_event(&event).await,
            Err(CombinesError::UnhandledEvent("ScoreMismatch"))
        ));

        let missing_id = CombineEvent {
            message_type: EventKind::Finished,
            match_id: None,
            ..event
        };
        assert!(matches!(
            service.handle_event(&missing_id).await,
            Err(CombinesError::MissingMatchId)
        ));
    }

    #[tokio::test]
    async fn teardown_deletes_rooms_across_tiers_and_is_idempotent() {
        let gateway = FakeGuild::new()
            .with_category(10, "combines")
            .with_category(11, "Combines-2");
        let service = configured_service(gateway).await;

        service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap();
        // A different lobby whose rooms must survive.
        service
            .create_lobby_rooms(&sample_lobby(142, GUILD, "Premier"))
            .await
            .unwrap();

        let deleted = service.teardown_lobby(GUILD, 42).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            service.gateway.channel_names(),
            vec!["Premier-142-home", "Premier-142-away"]
        );

        // Second run finds no matching rooms and must not error.
        let again = service.teardown_lobby(GUILD, 42).await.unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn due_teardowns_run_and_complete() {
        let gateway = FakeGuild::new().with_category(10, "combines");
        let service = configured_service(gateway).await;
        service
            .create_lobby_rooms(&sample_lobby(42, GUILD, "Diamond"))
            .await
            .unwrap();

        service
            .settings
            .schedule_teardown(GUILD, 42, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        let deleted = service.run_due_teardowns(Utc::now()).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(service.gateway.channel_names().is_empty());

        // The row is gone; a second pass does nothing.
        let again = service.run_due_teardowns(Utc::now()).await.unwrap();
        assert_eq!(again, 0);
    }
}
