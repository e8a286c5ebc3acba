//! Value objects
//!
//! 生の文字列をそのまま扱わず、検証済みの値として保持します。

use serde::Serialize;

use super::error::ValueObjectError;

/// Maximum length of a room id (in characters)
pub const MAX_ROOM_ID_LENGTH: usize = 64;
/// Maximum length of a username (in characters)
pub const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum length of a session id (in characters)
pub const MAX_SESSION_ID_LENGTH: usize = 128;
/// Maximum length of a chat message (in characters)
pub const MAX_MESSAGE_LENGTH: usize = 2000;

fn validate(
    value: &str,
    field: &'static str,
    max: usize,
    allow_slash: bool,
) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    let length = value.chars().count();
    if length > max {
        return Err(ValueObjectError::TooLong { field, max, length });
    }
    if !allow_slash && value.contains('/') {
        return Err(ValueObjectError::InvalidCharacter(field, '/'));
    }
    Ok(())
}

macro_rules! string_value_object {
    ($(#[$meta:meta])* $name:ident, $field:literal, $max:expr, $allow_slash:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                validate(&value, $field, $max, $allow_slash)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_value_object!(
    /// Room identifier chosen by the joining user (free-form path segment)
    RoomId,
    "room_id",
    MAX_ROOM_ID_LENGTH,
    false
);

string_value_object!(
    /// Display name of a participant
    Username,
    "username",
    MAX_USERNAME_LENGTH,
    false
);

string_value_object!(
    /// Per-tab session identifier; one live connection per session
    SessionId,
    "session_id",
    MAX_SESSION_ID_LENGTH,
    false
);

string_value_object!(
    /// Chat message body
    MessageContent,
    "message",
    MAX_MESSAGE_LENGTH,
    true
);

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_accepts_regular_name() {
        // テスト項目: 通常のユーザー名が受け入れられる
        // given (前提条件):
        let value = "alice".to_string();

        // when (操作):
        let result = Username::new(value);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "alice");
    }

    #[test]
    fn test_username_rejects_blank() {
        // テスト項目: 空白のみのユーザー名は拒否される
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = Username::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::Empty("username")));
    }

    #[test]
    fn test_room_id_rejects_slash() {
        // テスト項目: パス区切り文字を含むルーム ID は拒否される
        // given (前提条件):
        let value = "math/1".to_string();

        // when (操作):
        let result = RoomId::try_from(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::InvalidCharacter("room_id", '/'))
        );
    }

    #[test]
    fn test_message_content_rejects_too_long() {
        // テスト項目: 上限を超えるメッセージは拒否される
        // given (前提条件):
        let value = "a".repeat(MAX_MESSAGE_LENGTH + 1);

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::TooLong {
                field: "message",
                max: MAX_MESSAGE_LENGTH,
                length: MAX_MESSAGE_LENGTH + 1,
            })
        );
    }

    #[test]
    fn test_message_content_allows_slash() {
        // テスト項目: メッセージ本文にはスラッシュを含められる
        // given (前提条件):
        let value = "see chapter 3/4".to_string();

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_session_id_length_counts_characters() {
        // テスト項目: 長さの判定はバイト数ではなく文字数で行われる
        // given (前提条件):
        let value = "あ".repeat(MAX_SESSION_ID_LENGTH);

        // when (操作):
        let result = SessionId::new(value);

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
