use lastseen_db::PlayerName;
use scc::HashMap;

/// What the host knows about a player, independent of the last-seen store.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerEntry {
    /// Name as the player last used it (original case).
    pub name: PlayerName,
    /// Epoch milliseconds of the very first join.
    pub first_played: i64,
    pub online: bool,
}

/// In-memory registry of known players, keyed by lower-cased name.
pub struct PlayerDirectory {
    players: HashMap<PlayerName, PlayerEntry>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Record a player joining. The first join fixes `first_played`.
    pub async fn player_join(&self, player: &str, now: i64) -> Result<(), CacheError> {
        let name = PlayerName::try_from(player).map_err(|_| CacheError::PlayerNameTooLong)?;
        let key = lookup_key(player)?;

        let mark_online = |_: &PlayerName, entry: &mut PlayerEntry| {
            entry.name = name;
            entry.online = true;
        };

        if self.players.update_async(&key, mark_online).await.is_some() {
            return Ok(());
        }

        let entry = PlayerEntry {
            name,
            first_played: now,
            online: true,
        };
        if let Err((key, _)) = self.players.insert_async(key, entry).await {
            // Lost a race with a concurrent join for the same player.
            self.players.update_async(&key, mark_online).await;
        }
        Ok(())
    }

    /// Record a player leaving.
    pub async fn player_quit(&self, player: &str) -> Result<(), CacheError> {
        let key = lookup_key(player)?;
        self.players
            .update_async(&key, |_, entry| entry.online = false)
            .await
            .ok_or(CacheError::PlayerNotFound)
    }

    /// Case-insensitive lookup.
    pub async fn find(&self, player: &str) -> Option<PlayerEntry> {
        let key = lookup_key(player).ok()?;
        self.players.read_async(&key, |_, entry| entry.clone()).await
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_key(player: &str) -> Result<PlayerName, CacheError> {
    PlayerName::try_from(player.to_lowercase().as_str()).map_err(|_| CacheError::PlayerNameTooLong)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CacheError {
    #[error("player not found in directory")]
    PlayerNotFound,
    #[error("player name exceeds 16 characters")]
    PlayerNameTooLong,
}
