//! Interactive input parsing.

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text is sent as a chat message
    Chat(String),
    Start,
    Pause,
    /// Reset to a full focus session
    Reset,
    /// Reset to a short break
    Break,
    /// Call every participant (connect all)
    Connect,
    Users,
    Timer,
    Leave,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse an input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Some(name) = trimmed.strip_prefix('/') else {
            return Some(Command::Chat(line.to_string()));
        };
        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "reset" => Command::Reset,
            "break" => Command::Break,
            "connect" => Command::Connect,
            "users" => Command::Users,
            "timer" => Command::Timer,
            "leave" | "quit" | "exit" => Command::Leave,
            "help" | "?" => Command::Help,
            _ => Command::Unknown(trimmed.to_string()),
        };
        Some(command)
    }

    /// Whether only the room owner may run this command
    pub fn is_owner_only(&self) -> bool {
        matches!(
            self,
            Command::Start | Command::Pause | Command::Reset | Command::Break | Command::Connect
        )
    }
}
