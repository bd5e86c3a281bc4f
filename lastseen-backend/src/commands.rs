use crate::error::AppError;
use crate::helpers::{format_date, format_relative, now_millis};
use crate::validation;
use crate::{Host, LastSeenStatus};

/// Commands understood by [`dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Seen,
    FirstSeen,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "seen" => Some(Self::Seen),
            "firstseen" => Some(Self::FirstSeen),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Seen => "seen",
            Self::FirstSeen => "firstseen",
        }
    }
}

/// Run one command line such as `seen Steve`. Returns `None` for anything
/// that is not a known command.
pub async fn dispatch(host: &Host, line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    let command = Command::parse(parts.next()?.trim_start_matches('/'))?;
    let args: Vec<&str> = parts.collect();

    tracing::info!("Executing command '{}'", command.name());
    Some(run(host, command, &args).await)
}

/// Reply for `command` with the given arguments. Never surfaces raw errors.
pub async fn run(host: &Host, command: Command, args: &[&str]) -> String {
    let [player_name] = args else {
        return format!("Usage: /{} <player-name>", command.name());
    };

    if let Err(e) = validation::validate_player_name(player_name) {
        return AppError::from(e).user_message();
    }

    // The directory only knows players seen since this process started;
    // anyone else may still have a persisted last-seen record.
    let player = host.directory.find(player_name).await;

    match (command, player) {
        (Command::Seen, Some(player)) if player.online => {
            format!("{} is online now!", player.name)
        }
        (Command::Seen, player) => last_seen(host, player_name, player.is_some()).await,
        (Command::FirstSeen, Some(player)) => format!(
            "{} first played on {}",
            player.name,
            format_date(player.first_played)
        ),
        (Command::FirstSeen, None) => never_seen(player_name),
    }
}

fn never_seen(player_name: &str) -> String {
    format!("{player_name} has never been seen before.")
}

/// Show when a player was last seen
async fn last_seen(host: &Host, player_name: &str, known: bool) -> String {
    match host.last_seen.query_last_seen(player_name, host.debug).await {
        LastSeenStatus::Never if !known => never_seen(player_name),
        LastSeenStatus::Never => {
            "Either that player doesn't exist or they haven't been online in a while.".to_string()
        }
        LastSeenStatus::Seen(timestamp) => format!(
            "{} was last seen on {} ({})",
            player_name,
            format_date(timestamp),
            format_relative(timestamp, now_millis())
        ),
    }
}
