//! Presence & ownership tracker.

/// Local view of who else is in the room and who owns it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    /// Other participants (never contains the local username)
    pub users: Vec<String>,
    /// Owner username, empty when unknown
    pub owner: String,
}

/// Roster difference between two consecutive snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChange {
    pub arrived: Vec<String>,
    pub departed: Vec<String>,
}

impl Presence {
    /// Reduce a `user_list` snapshot into the next presence state.
    ///
    /// The snapshot replaces the roster. The local identity is filtered out, and
    /// a missing or empty `owner` falls back to the first entry of the server list.
    ///
    /// # Arguments
    ///
    /// * `local` - The local username
    /// * `server_users` - The roster as sent by the server
    /// * `owner` - The explicit owner field, if any
    ///
    /// # Returns
    ///
    /// The new state and its difference from `self`
    pub fn reduce(
        &self,
        local: &str,
        server_users: &[String],
        owner: Option<&str>,
    ) -> (Presence, PresenceChange) {
        let users: Vec<String> = server_users
            .iter()
            .filter(|u| u.as_str() != local)
            .cloned()
            .collect();
        let owner = owner
            .filter(|o| !o.is_empty())
            .or_else(|| server_users.first().map(String::as_str))
            .unwrap_or_default()
            .to_string();

        let change = PresenceChange {
            arrived: users
                .iter()
                .filter(|u| !self.users.contains(u))
                .cloned()
                .collect(),
            departed: self
                .users
                .iter()
                .filter(|u| !users.contains(u))
                .cloned()
                .collect(),
        };

        (Presence { users, owner }, change)
    }

    pub fn is_owner(&self, local: &str) -> bool {
        !self.owner.is_empty() && self.owner == local
    }

    /// Number of people in the room including the local participant
    pub fn headcount(&self) -> usize {
        self.users.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_local_user_is_filtered_out() {
        // テスト項目: 自分自身は名簿から除外される
        // given (前提条件):
        let presence = Presence::default();

        // when (操作):
        let (next, _) = presence.reduce("alice", &names(&["alice", "bob"]), Some("alice"));

        // then (期待する結果):
        assert_eq!(next.users, names(&["bob"]));
        assert!(next.is_owner("alice"));
        assert_eq!(next.headcount(), 2);
    }

    #[test]
    fn test_owner_falls_back_to_first_server_entry() {
        // テスト項目: owner が省略された場合はサーバー名簿の先頭がオーナーになる
        // given (前提条件):
        let presence = Presence::default();

        // when (操作):
        let (missing, _) = presence.reduce("bob", &names(&["alice", "bob"]), None);
        let (blank, _) = presence.reduce("bob", &names(&["alice", "bob"]), Some(""));

        // then (期待する結果):
        assert_eq!(missing.owner, "alice");
        assert_eq!(blank.owner, "alice");
        assert!(!missing.is_owner("bob"));
    }

    #[test]
    fn test_empty_snapshot_clears_owner() {
        // テスト項目: 空の名簿ではオーナーが空になり、誰もオーナーではない
        // given (前提条件):
        let (presence, _) = Presence::default().reduce("alice", &names(&["alice"]), None);

        // when (操作):
        let (next, _) = presence.reduce("alice", &[], None);

        // then (期待する結果):
        assert_eq!(next.owner, "");
        assert!(!next.is_owner("alice"));
        assert!(next.users.is_empty());
    }

    #[test]
    fn test_roster_invariants_hold_for_any_sequence() {
        // テスト項目: どのようなスナップショット列でも、名簿に自分は含まれず isOwner は owner との一致と等しい
        // given (前提条件):
        let snapshots: Vec<(Vec<String>, Option<&str>)> = vec![
            (names(&["alice"]), Some("alice")),
            (names(&["alice", "bob", "alice"]), Some("alice")),
            (names(&["bob", "alice"]), Some("bob")),
            (names(&["bob"]), None),
            (names(&[]), None),
            (names(&["carol", "alice"]), None),
        ];
        let mut presence = Presence::default();

        for (users, owner) in snapshots {
            // when (操作):
            let (next, _) = presence.reduce("alice", &users, owner);

            // then (期待する結果):
            assert!(!next.users.iter().any(|u| u == "alice"));
            assert_eq!(next.is_owner("alice"), next.owner == "alice");
            presence = next;
        }
    }

    #[test]
    fn test_change_reports_arrivals_and_departures() {
        // テスト項目: 前回のスナップショットとの差分が計算される
        // given (前提条件):
        let (presence, _) =
            Presence::default().reduce("alice", &names(&["alice", "bob", "carol"]), None);

        // when (操作):
        let (_, change) = presence.reduce("alice", &names(&["alice", "carol", "dave"]), None);

        // then (期待する結果):
        assert_eq!(change.departed, names(&["bob"]));
        assert_eq!(change.arrived, names(&["dave"]));
    }
}
