pub mod cache;
pub mod commands;
pub mod config;
pub mod console;
mod error;
pub mod helpers;
pub mod validation;

pub use error::AppError;
pub use lastseen_db::{DataStorage, LastSeenStatus, player_key};

use cache::PlayerDirectory;
use config::Config;
use helpers::now_millis;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Background write started by [`LastSeen::record_presence`].
pub type PresenceTask = JoinHandle<lastseen_db::Result<()>>;

/// Translates player names into last-seen store keys.
#[derive(Clone)]
pub struct LastSeen {
    storage: DataStorage,
}

impl LastSeen {
    pub fn new(storage: DataStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &DataStorage {
        &self.storage
    }

    /// Store `now` as the player's last-seen time and wait for it to persist.
    pub async fn record_presence_at(&self, player: &str, now: i64) -> lastseen_db::Result<()> {
        self.storage.set(&player_key(player), now).await
    }

    /// Fire-and-forget presence update stamped with the current time.
    /// Failures are logged; the handle can still be awaited for the result.
    pub fn record_presence(&self, player: &str) -> PresenceTask {
        let this = self.clone();
        let player = player.to_string();
        let now = now_millis();

        tokio::spawn(async move {
            let result = this.record_presence_at(&player, now).await;
            if let Err(e) = &result {
                warn!(%player, error = %e, "failed to record presence");
            }
            result
        })
    }

    /// Last-seen time of a player, with zero and absent both reported as never.
    pub async fn query_last_seen(&self, player: &str, debug: bool) -> LastSeenStatus {
        LastSeenStatus::from_stored(self.storage.get(&player_key(player), debug).await)
    }
}

/// Host-side glue: player events, the player directory and command state.
pub struct Host {
    pub last_seen: LastSeen,
    pub directory: PlayerDirectory,
    pub debug: bool,
}

impl Host {
    pub fn new(storage: DataStorage, debug: bool) -> Self {
        Self {
            last_seen: LastSeen::new(storage),
            directory: PlayerDirectory::new(),
            debug,
        }
    }

    /// Open the configured store (creating it if needed) and build the host.
    pub fn from_config(config: &Config) -> Self {
        let storage = DataStorage::open(&config.store_id, &config.data_dir);
        Self::new(storage, config.debug)
    }

    /// A player connected.
    pub async fn on_join(&self, player: &str) -> Result<PresenceTask, AppError> {
        validation::validate_player_name(player)?;

        if let Err(e) = self.directory.player_join(player, now_millis()).await {
            warn!(%player, error = %e, "could not add player to directory");
        }
        debug!(%player, "player joined");
        Ok(self.last_seen.record_presence(player))
    }

    /// A player disconnected.
    pub async fn on_quit(&self, player: &str) -> Result<PresenceTask, AppError> {
        validation::validate_player_name(player)?;

        if let Err(e) = self.directory.player_quit(player).await {
            debug!(%player, error = %e, "quit for player not in directory");
        }
        debug!(%player, "player left");
        Ok(self.last_seen.record_presence(player))
    }
}
