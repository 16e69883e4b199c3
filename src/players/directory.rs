// The authoritative in-memory player collection: lookups, search, and the
// score simulator's single mutation entry point.

use std::collections::HashSet;
use std::sync::RwLock;

use super::record::{Player, PlayerId, Position};

/// The new point values after a score delta was applied to one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreChange {
    pub season_points: f64,
    pub week_points: f64,
}

/// Owns the player records for a session. The collection itself is static
/// after construction; the only mutation is the simulator adjusting the two
/// `points` fields through [`PlayerDirectory::apply_score_delta`]. Records
/// live behind an `RwLock` so the simulator's timer tasks and readers on
/// other tasks stay serialized; read operations return snapshots that
/// reflect all mutations applied so far.
pub struct PlayerDirectory {
    players: RwLock<Vec<Player>>,
}

impl PlayerDirectory {
    pub fn new(players: Vec<Player>) -> Self {
        PlayerDirectory {
            players: RwLock::new(players),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Player>> {
        self.players.read().expect("player directory lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Player>> {
        self.players
            .write()
            .expect("player directory lock poisoned")
    }

    /// Every player, in directory order.
    pub fn all(&self) -> Vec<Player> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All player ids in directory order. The simulator snapshots this at
    /// start time.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.read().iter().map(|p| p.id).collect()
    }

    /// Look up a single player by id.
    pub fn get(&self, id: PlayerId) -> Option<Player> {
        self.read().iter().find(|p| p.id == id).cloned()
    }

    /// Players whose id is in `ids`, in directory order (not input order).
    pub fn get_by_ids(&self, ids: &[PlayerId]) -> Vec<Player> {
        let wanted: HashSet<PlayerId> = ids.iter().copied().collect();
        self.read()
            .iter()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search against first name, last name, or
    /// the "first last" concatenation. An empty or whitespace-only query
    /// returns no players (not all of them).
    pub fn search(&self, query: &str) -> Vec<Player> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        self.read()
            .iter()
            .filter(|p| {
                let first = p.firstname.to_lowercase();
                let last = p.surname.to_lowercase();
                let full = format!("{first} {last}");
                first.contains(&term) || last.contains(&term) || full.contains(&term)
            })
            .cloned()
            .collect()
    }

    /// All players at the given position, directory order.
    pub fn by_position(&self, position: Position) -> Vec<Player> {
        self.read()
            .iter()
            .filter(|p| p.position == position)
            .cloned()
            .collect()
    }

    /// All players on the given team (case-insensitive short code).
    pub fn by_team(&self, team: &str) -> Vec<Player> {
        self.read()
            .iter()
            .filter(|p| p.team.eq_ignore_ascii_case(team))
            .cloned()
            .collect()
    }

    /// The top `limit` players by season fantasy points, descending.
    pub fn top_by_points(&self, limit: usize) -> Vec<Player> {
        let mut players = self.all();
        players.sort_by(|a, b| {
            b.season_stats
                .points
                .partial_cmp(&a.season_stats.points)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        players.truncate(limit);
        players
    }

    /// Apply a score delta to both the season and week points of the player
    /// with `id`, independently: `new = max(0, old + delta)` rounded to 2
    /// decimal places. Returns the new values, or `None` when the id is
    /// unknown (the caller treats that as a silent skip).
    pub fn apply_score_delta(&self, id: PlayerId, delta: f64) -> Option<ScoreChange> {
        let mut players = self.write();
        let player = players.iter_mut().find(|p| p.id == id)?;

        player.season_stats.points = round2((player.season_stats.points + delta).max(0.0));
        player.week_stats.points = round2((player.week_stats.points + delta).max(0.0));

        Some(ScoreChange {
            season_points: player.season_stats.points,
            week_points: player.week_stats.points,
        })
    }

    /// Remove a player record. The directory is static during normal
    /// operation; this exists so tests can exercise the simulator's
    /// absent-at-fire-time skip path.
    pub(crate) fn remove(&self, id: PlayerId) -> Option<Player> {
        let mut players = self.write();
        let idx = players.iter().position(|p| p.id == id)?;
        Some(players.remove(idx))
    }
}

/// Round to 2 decimal places (half away from zero, deterministic for a fixed
/// input).
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
