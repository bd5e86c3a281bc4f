use arrayvec::ArrayString;

/// Minecraft player name - max 16 characters, stored inline (no heap allocation).
pub type PlayerName = ArrayString<16>;

/// Name of the store holding last-seen timestamps.
pub const LAST_SEEN_STORE: &str = "last-seen";

/// Returns the dotted key under which a player's last-seen timestamp lives.
///
/// No case folding happens here; the store lower-cases keys itself.
pub fn player_key(player_name: &str) -> String {
  format!("players.{player_name}.last-seen")
}

/// Outcome of a last-seen lookup once "absent" and "zero" are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSeenStatus {
  /// No timestamp was ever recorded (or the stored value is zero).
  Never,
  /// Epoch milliseconds of the most recent join or quit.
  Seen(i64),
}

impl LastSeenStatus {
  /// Collapse a raw store value. `None` and `Some(0)` both mean "never".
  pub fn from_stored(value: Option<i64>) -> Self {
    match value {
      None | Some(0) => Self::Never,
      Some(ts) => Self::Seen(ts),
    }
  }

  pub fn timestamp(&self) -> Option<i64> {
    match self {
      Self::Never => None,
      Self::Seen(ts) => Some(*ts),
    }
  }
}
