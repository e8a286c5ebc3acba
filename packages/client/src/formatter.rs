//! Message formatting utilities for client display.

use studyroom_shared::time::timestamp_to_clock_time;

use crate::domain::{chat::ChatEntry, timer::TimerState};

const RULE: &str = "============================================================";

/// Format seconds as `mm:ss`
pub fn format_mm_ss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Whether a countdown tick is worth printing (whole minutes and the last seconds)
pub fn is_notable_tick(time_left: u32) -> bool {
    time_left % 60 == 0 || time_left <= 5
}

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the welcome banner shown once after connecting
    pub fn format_welcome(room_id: &str, username: &str, session_id: &str) -> String {
        format!(
            "\n{}\nRoom '{}' as '{}' (session {})\nType a message and press Enter. /help lists commands.\n{}\n",
            RULE, room_id, username, session_id, RULE
        )
    }

    /// Format the roster.
    ///
    /// # Arguments
    ///
    /// * `users` - Other participants
    /// * `owner` - Owner username (may be empty)
    /// * `local` - The local username, listed first and marked "(me)"
    pub fn format_roster(users: &[String], owner: &str, local: &str) -> String {
        let mark = |name: &str| if name == owner { " [owner]" } else { "" };
        let mut output = format!("\n{}\nParticipants ({}):\n", RULE, users.len() + 1);
        output.push_str(&format!("{} (me){}\n", local, mark(local)));
        for user in users {
            output.push_str(&format!("{}{}\n", user, mark(user)));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format arrivals and departures of one roster snapshot
    pub fn format_roster_change(arrived: &[String], departed: &[String]) -> String {
        let mut output = String::from("\n");
        for user in arrived {
            output.push_str(&format!("+ {} joined\n", user));
        }
        for user in departed {
            output.push_str(&format!("- {} left\n", user));
        }
        output
    }

    pub fn format_owner_change(owner: &str, is_me: bool) -> String {
        if is_me {
            "\n* You are now the room owner\n".to_string()
        } else {
            format!("\n* {} is now the room owner\n", owner)
        }
    }

    pub fn format_timer(state: &TimerState, time_left: u32) -> String {
        let status = match (state.running, time_left) {
            (true, _) => "running",
            (false, 0) => "finished",
            (false, _) => "paused",
        };
        format!("\n[timer] {} ({})\n", format_mm_ss(time_left), status)
    }

    pub fn format_tick(time_left: u32) -> String {
        format!("\n[timer] {}\n", format_mm_ss(time_left))
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `entry` - The chat line as received from the server
    pub fn format_chat_message(entry: &ChatEntry) -> String {
        format!(
            "\n[{}] @{}: {}\n",
            timestamp_to_clock_time(entry.timestamp),
            entry.username,
            entry.message
        )
    }

    /// Format the history replayed after joining
    pub fn format_chat_history(entries: &[ChatEntry]) -> String {
        if entries.is_empty() {
            return String::new();
        }
        let mut output = format!("\n--- {} earlier message(s) ---", entries.len());
        for entry in entries {
            output.push_str(Self::format_chat_message(entry).trim_end_matches('\n'));
        }
        output.push_str("\n---\n");
        output
    }

    /// Format a newly bound remote track (the participant's video tile)
    pub fn format_remote_stream(peer: &str, kind: &str) -> String {
        format!("\n[tile:{}] receiving {}\n", peer, kind)
    }

    pub fn format_peer_state(peer: &str, state: &str) -> String {
        format!("\n[tile:{}] {}\n", peer, state)
    }

    pub fn format_server_error(code: &str, message: &str) -> String {
        format!("\n! {} ({})\n", message, code)
    }

    pub fn format_notice(message: &str) -> String {
        format!("\n{}\n", message)
    }

    pub fn format_tiles(tiles: &[(String, Vec<String>)]) -> String {
        if tiles.is_empty() {
            return "(no video tiles)\n".to_string();
        }
        let mut output = String::new();
        for (peer, kinds) in tiles {
            output.push_str(&format!("[tile:{}] {}\n", peer, kinds.join(", ")));
        }
        output
    }

    pub fn format_help() -> String {
        "\nCommands:\n  \
         <text>     send a chat message\n  \
         /start     start the timer (owner)\n  \
         /pause     pause the timer (owner)\n  \
         /reset     reset to 25:00 (owner)\n  \
         /break     reset to a 05:00 break (owner)\n  \
         /connect   start video with everyone (owner)\n  \
         /users     show participants and video tiles\n  \
         /timer     show the timer\n  \
         /leave     leave the room\n"
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mm_ss() {
        // テスト項目: 秒数が mm:ss 形式に整形される
        // given (前提条件):
        let values = [1500, 300, 61, 0];

        // when (操作):
        let formatted: Vec<String> = values.iter().map(|v| format_mm_ss(*v)).collect();

        // then (期待する結果):
        assert_eq!(formatted, vec!["25:00", "05:00", "01:01", "00:00"]);
    }

    #[test]
    fn test_notable_ticks() {
        // テスト項目: 1 分ごとと残り 5 秒以下のときだけ表示対象になる
        // given (前提条件):
        let values = [1440, 1439, 5, 0];

        // when (操作):
        let notable: Vec<bool> = values.iter().map(|v| is_notable_tick(*v)).collect();

        // then (期待する結果):
        assert_eq!(notable, vec![true, false, true, true]);
    }

    #[test]
    fn test_format_roster_marks_me_and_owner() {
        // テスト項目: ロスター表示で自分とオーナーに印が付く
        // given (前提条件):
        let users = vec!["alice".to_string(), "carol".to_string()];

        // when (操作):
        let output = MessageFormatter::format_roster(&users, "alice", "bob");

        // then (期待する結果):
        assert!(output.contains("Participants (3):"));
        assert!(output.contains("bob (me)\n"));
        assert!(output.contains("alice [owner]\n"));
        assert!(output.contains("carol\n"));
    }

    #[test]
    fn test_format_timer_status() {
        // テスト項目: タイマーの状態に応じて running / paused / finished が表示される
        // given (前提条件):
        let running = TimerState {
            running: true,
            remaining: 1500,
            start_time: Some(0),
        };
        let stopped = TimerState::default();

        // when (操作):
        let outputs = [
            MessageFormatter::format_timer(&running, 1499),
            MessageFormatter::format_timer(&stopped, 1500),
            MessageFormatter::format_timer(&stopped, 0),
        ];

        // then (期待する結果):
        assert_eq!(outputs[0], "\n[timer] 24:59 (running)\n");
        assert_eq!(outputs[1], "\n[timer] 25:00 (paused)\n");
        assert_eq!(outputs[2], "\n[timer] 00:00 (finished)\n");
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットは時刻・送信者・本文の順に整形される
        // given (前提条件):
        let entry = ChatEntry {
            username: "alice".to_string(),
            message: "hello".to_string(),
            timestamp: 0,
        };

        // when (操作):
        let output = MessageFormatter::format_chat_message(&entry);

        // then (期待する結果):
        assert_eq!(output, "\n[00:00:00] @alice: hello\n");
    }
}
