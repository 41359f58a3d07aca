//! Ordered leaderboard with per-turn "already guessed" markers.

use std::collections::HashSet;

use crate::protocol::{ConnectionId, LeaderboardEntry, PlayerInfo};

/// One displayed leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub sid: ConnectionId,
    pub username: String,
    pub score: u32,
    pub has_guessed: bool,
    pub is_drawer: bool,
}

/// Leaderboard view, re-sorted on every update.
#[derive(Debug, Clone, Default)]
pub struct ScoreboardSync {
    rows: Vec<ScoreRow>,
    guessed: HashSet<ConnectionId>,
    drawer: Option<ConnectionId>,
}

impl ScoreboardSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every row from a membership list.
    ///
    /// Rows are sorted by score, highest first. The sort is stable, so
    /// players with equal scores keep the order they arrived in.
    pub fn update(&mut self, players: &[PlayerInfo]) {
        self.rows = players
            .iter()
            .map(|p| ScoreRow {
                sid: p.sid.clone(),
                username: p.username.clone(),
                score: p.score,
                has_guessed: p.has_guessed || self.guessed.contains(&p.sid),
                is_drawer: self.drawer.as_deref() == Some(p.sid.as_str()),
            })
            .collect();
        self.sort();
    }

    /// Replace every row from a relay leaderboard.
    pub fn update_from_leaderboard(&mut self, entries: &[LeaderboardEntry]) {
        self.rows = entries
            .iter()
            .map(|e| ScoreRow {
                sid: e.sid.clone(),
                username: e.username.clone(),
                score: e.score,
                has_guessed: self.guessed.contains(&e.sid),
                is_drawer: self.drawer.as_deref() == Some(e.sid.as_str()),
            })
            .collect();
        self.sort();
    }

    /// Mark `sid` as having guessed this turn.
    pub fn mark_guessed(&mut self, sid: &str) {
        self.guessed.insert(sid.to_string());
        for row in self.rows.iter_mut().filter(|r| r.sid == sid) {
            row.has_guessed = true;
        }
    }

    /// Mark the first row named `username`. Returns its id if found.
    ///
    /// `correct_guess` frames name the guesser but may omit the id.
    pub fn mark_guessed_by_name(&mut self, username: &str) -> Option<ConnectionId> {
        let sid = self
            .rows
            .iter()
            .find(|r| r.username == username)
            .map(|r| r.sid.clone())?;
        self.mark_guessed(&sid);
        Some(sid)
    }

    pub fn has_guessed(&self, sid: &str) -> bool {
        self.guessed.contains(sid)
    }

    /// Clear every marker. Only a new turn does this.
    pub fn clear_guessed(&mut self) {
        self.guessed.clear();
        for row in &mut self.rows {
            row.has_guessed = false;
        }
    }

    pub fn set_drawer(&mut self, sid: Option<ConnectionId>) {
        for row in &mut self.rows {
            row.is_drawer = sid.as_deref() == Some(row.sid.as_str());
        }
        self.drawer = sid;
    }

    pub fn drawer(&self) -> Option<&str> {
        self.drawer.as_deref()
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    /// Rows as wire-shaped entries, in display order.
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.rows
            .iter()
            .map(|r| LeaderboardEntry {
                sid: r.sid.clone(),
                username: r.username.clone(),
                score: r.score,
            })
            .collect()
    }

    fn sort(&mut self) {
        self.rows.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

/// Every entry sharing the top score, in input order.
///
/// ```
/// use scribble_client::protocol::LeaderboardEntry;
/// use scribble_client::scoreboard::compute_winners;
///
/// let entry = |name: &str, score| LeaderboardEntry {
///     sid: String::new(),
///     username: name.into(),
///     score,
/// };
/// let winners = compute_winners(&[entry("A", 50), entry("B", 50), entry("C", 30)]);
/// assert_eq!(winners.len(), 2);
/// ```
pub fn compute_winners(leaderboard: &[LeaderboardEntry]) -> Vec<LeaderboardEntry> {
    let Some(top) = leaderboard.iter().map(|e| e.score).max() else {
        return Vec::new();
    };
    leaderboard
        .iter()
        .filter(|e| e.score == top)
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn player(sid: &str, score: u32) -> PlayerInfo {
        PlayerInfo {
            sid: sid.into(),
            username: sid.to_uppercase(),
            score,
            has_guessed: false,
        }
    }

    fn entry(name: &str, score: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            sid: name.to_lowercase(),
            username: name.into(),
            score,
        }
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut board = ScoreboardSync::new();
        board.update(&[
            player("p1", 10),
            player("p2", 30),
            player("p3", 30),
            player("p4", 5),
        ]);
        let order: Vec<_> = board.rows().iter().map(|r| r.sid.as_str()).collect();
        assert_eq!(order, ["p2", "p3", "p1", "p4"]);
    }

    #[test]
    fn guessed_markers_survive_updates_until_cleared() {
        let mut board = ScoreboardSync::new();
        board.update(&[player("a", 0), player("b", 0)]);
        board.mark_guessed("b");

        board.update(&[player("a", 0), player("b", 100)]);
        assert!(board.rows()[0].has_guessed);
        assert_eq!(board.rows()[0].sid, "b");

        assert_eq!(board.mark_guessed_by_name("A"), Some("a".to_string()));
        assert!(board.has_guessed("a"));
        assert_eq!(board.mark_guessed_by_name("nobody"), None);

        board.clear_guessed();
        assert!(board.rows().iter().all(|r| !r.has_guessed));
        assert!(!board.has_guessed("b"));
    }

    #[test]
    fn drawer_marker_follows_rows() {
        let mut board = ScoreboardSync::new();
        board.set_drawer(Some("b".into()));
        board.update(&[player("a", 0), player("b", 0)]);
        assert_eq!(board.rows().iter().filter(|r| r.is_drawer).count(), 1);

        board.set_drawer(Some("a".into()));
        let drawers: Vec<_> = board
            .rows()
            .iter()
            .filter(|r| r.is_drawer)
            .map(|r| r.sid.as_str())
            .collect();
        assert_eq!(drawers, ["a"]);
    }

    #[test]
    fn every_update_supersedes_scores() {
        let mut board = ScoreboardSync::new();
        board.update_from_leaderboard(&[entry("A", 10)]);
        board.update_from_leaderboard(&[entry("A", 20)]);
        board.update_from_leaderboard(&[entry("A", 35)]);
        assert_eq!(board.entries(), vec![entry("A", 35)]);
    }

    #[test]
    fn winners_include_every_tied_leader() {
        let winners = compute_winners(&[entry("A", 50), entry("B", 50), entry("C", 30)]);
        let names: Vec<_> = winners.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["A", "B"]);

        let winners = compute_winners(&[entry("A", 50), entry("B", 30)]);
        assert_eq!(winners, vec![entry("A", 50)]);

        assert!(compute_winners(&[]).is_empty());
    }
}
