// Dashboard state and orchestration logic.
//
// The consumer side of the score simulator: maintains the two parallel views
// of the tracker page (search results and the watchlist), maps score events
// onto whichever view currently shows the player, and drives watchlist
// persistence with optimistic updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::players::{Player, PlayerDirectory, PlayerId};
use crate::watchlist::WatchlistStore;

/// One score update fanned out by the simulator callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEvent {
    pub player_id: PlayerId,
    /// New season points (the simulator reports the season value only).
    pub season_points: f64,
}

/// The complete dashboard state.
pub struct DashboardState {
    directory: Arc<PlayerDirectory>,
    store: Arc<dyn WatchlistStore>,
    /// Signed-in user, if any. Without an email the watchlist cannot be
    /// persisted and add/remove are refused, matching the signed-out page.
    email: Option<String>,
    /// Results of the most recent search.
    pub search_results: Vec<Player>,
    /// The user's watched players, in directory order after a load.
    pub watched: Vec<Player>,
    /// When the last score event was applied.
    pub last_update: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(
        directory: Arc<PlayerDirectory>,
        store: Arc<dyn WatchlistStore>,
        email: Option<String>,
    ) -> Self {
        DashboardState {
            directory,
            store,
            email,
            search_results: Vec::new(),
            watched: Vec::new(),
            last_update: None,
        }
    }

    /// Fetch the persisted watchlist and resolve it through the directory
    /// (directory order). A store failure is logged and leaves the current
    /// view untouched.
    pub async fn load_watchlist(&mut self) {
        let Some(email) = self.email.clone() else {
            return;
        };
        match self.store.get(&email).await {
            Ok(ids) => {
                self.watched = self.directory.get_by_ids(&ids);
                info!("Loaded {} watched players for {email}", self.watched.len());
            }
            Err(e) => {
                warn!("failed to load watchlist for {email}: {e}");
            }
        }
    }

    /// Run a name search against the directory. A blank query clears the
    /// results instead of listing everyone.
    pub fn run_search(&mut self, query: &str) {
        self.search_results = self.directory.search(query);
    }

    /// Add a player to the watchlist. The local view is updated first and
    /// the save happens after; a persistence failure is logged but the
    /// optimistic update is not rolled back.
    pub async fn add_to_watchlist(&mut self, player: Player) {
        if self.email.is_none() {
            warn!("not signed in; cannot save players to the watchlist");
            return;
        }
        if self.watched.iter().any(|p| p.id == player.id) {
            return;
        }

        self.watched.push(player);
        self.search_results.clear();
        self.persist().await;
    }

    /// Remove a player from the watchlist, optimistically.
    pub async fn remove_from_watchlist(&mut self, id: PlayerId) {
        if self.email.is_none() {
            return;
        }
        self.watched.retain(|p| p.id != id);
        self.persist().await;
    }

    /// Save the current watched id set. Failure is a logged warning; the
    /// in-memory view stays as-is.
    async fn persist(&self) {
        let Some(email) = &self.email else {
            return;
        };
        let ids: Vec<PlayerId> = self.watched.iter().map(|p| p.id).collect();
        if let Err(e) = self.store.save(email, &ids).await {
            warn!("failed to save watchlist for {email}: {e}; keeping local view");
        }
    }

    /// Map a score update onto every view that currently shows the player.
    /// Only the season points of the view copies change; the directory
    /// record was already mutated by the simulator.
    pub fn apply_score_update(&mut self, id: PlayerId, new_season_points: f64) {
        for player in self
            .watched
            .iter_mut()
            .chain(self.search_results.iter_mut())
        {
            if player.id == id {
                player.season_stats.points = new_season_points;
            }
        }
        self.last_update = Some(Utc::now());
    }

    pub fn watched_ids(&self) -> Vec<PlayerId> {
        self.watched.iter().map(|p| p.id).collect()
    }
}

/// Drain score events from the simulator until the channel closes (the
/// simulator was stopped and its callback dropped).
pub async fn run(
    mut rx: mpsc::UnboundedReceiver<ScoreEvent>,
    mut state: DashboardState,
) -> anyhow::Result<DashboardState> {
    while let Some(event) = rx.recv().await {
        state.apply_score_update(event.player_id, event.season_points);
        if let Some(player) = state.directory.get(event.player_id) {
            debug!(
                "{}: {:.2} season points",
                player.full_name(),
                event.season_points
            );
        }
    }
    info!("Score event channel closed; dashboard loop exiting");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::record::{Position, StatBlock};
    use crate::watchlist::{SqliteWatchlistStore, WatchlistError};
    use async_trait::async_trait;

    fn player(id: PlayerId, first: &str, last: &str) -> Player {
        Player {
            id,
            firstname: first.to_string(),
            surname: last.to_string(),
            team: "KC".to_string(),
            position: Position::WR,
            team_color: "#E31837".to_string(),
            photo_url: None,
            season_stats: StatBlock {
                points: 100.0,
                projection: 110.0,
                ..StatBlock::default()
            },
            week_stats: StatBlock {
                points: 10.0,
                projection: 12.0,
                ..StatBlock::default()
            },
            is_projected_to_score: true,
            injury_status: None,
        }
    }

    fn directory() -> Arc<PlayerDirectory> {
        Arc::new(PlayerDirectory::new(vec![
            player(1, "Patrick", "Mahomes"),
            player(2, "Travis", "Kelce"),
            player(3, "Rashee", "Rice"),
        ]))
    }

    fn sqlite_store() -> Arc<SqliteWatchlistStore> {
        Arc::new(SqliteWatchlistStore::open(":memory:").unwrap())
    }

    /// A store whose operations always fail, for the no-rollback policy
    /// tests.
    struct FailingStore;

    #[async_trait]
    impl WatchlistStore for FailingStore {
        async fn get(&self, _email: &str) -> Result<Vec<PlayerId>, WatchlistError> {
            Err(WatchlistError::Db(rusqlite::Error::InvalidQuery))
        }

        async fn save(&self, _email: &str, _ids: &[PlayerId]) -> Result<(), WatchlistError> {
            Err(WatchlistError::Db(rusqlite::Error::InvalidQuery))
        }

        async fn clear(&self, _email: &str) -> Result<(), WatchlistError> {
            Err(WatchlistError::Db(rusqlite::Error::InvalidQuery))
        }
    }

    fn signed_in(store: Arc<dyn WatchlistStore>) -> DashboardState {
        DashboardState::new(directory(), store, Some("a@example.com".to_string()))
    }

    #[tokio::test]
    async fn add_persists_and_clears_search_results() {
        let store = sqlite_store();
        let mut state = signed_in(store.clone());
        state.run_search("kelce");
        assert_eq!(state.search_results.len(), 1);

        let kelce = state.search_results[0].clone();
        state.add_to_watchlist(kelce).await;

        assert_eq!(state.watched_ids(), vec![2]);
        assert!(state.search_results.is_empty());
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn add_is_deduplicated_by_id() {
        let mut state = signed_in(sqlite_store());
        state.add_to_watchlist(player(2, "Travis", "Kelce")).await;
        state.add_to_watchlist(player(2, "Travis", "Kelce")).await;
        assert_eq!(state.watched.len(), 1);
    }

    #[tokio::test]
    async fn add_without_email_is_refused() {
        let mut state = DashboardState::new(directory(), sqlite_store(), None);
        state.add_to_watchlist(player(1, "Patrick", "Mahomes")).await;
        assert!(state.watched.is_empty());
    }

    #[tokio::test]
    async fn failed_save_does_not_roll_back_optimistic_add() {
        let mut state = signed_in(Arc::new(FailingStore));
        state.add_to_watchlist(player(1, "Patrick", "Mahomes")).await;
        // The view keeps the player even though persistence failed.
        assert_eq!(state.watched_ids(), vec![1]);
    }

    #[tokio::test]
    async fn remove_is_optimistic_too() {
        let mut state = signed_in(sqlite_store());
        state.add_to_watchlist(player(1, "Patrick", "Mahomes")).await;
        state.add_to_watchlist(player(3, "Rashee", "Rice")).await;

        state.remove_from_watchlist(1).await;
        assert_eq!(state.watched_ids(), vec![3]);
    }

    #[tokio::test]
    async fn load_watchlist_resolves_in_directory_order() {
        let store = sqlite_store();
        store.save("a@example.com", &[3, 1]).await.unwrap();

        let mut state = signed_in(store);
        state.load_watchlist().await;
        assert_eq!(state.watched_ids(), vec![1, 3]);
    }

    #[tokio::test]
    async fn load_watchlist_failure_keeps_current_view() {
        let mut state = signed_in(Arc::new(FailingStore));
        state.watched.push(player(2, "Travis", "Kelce"));
        state.load_watchlist().await;
        assert_eq!(state.watched_ids(), vec![2]);
    }

    #[tokio::test]
    async fn score_update_lands_on_both_views() {
        let mut state = signed_in(sqlite_store());
        state.add_to_watchlist(player(1, "Patrick", "Mahomes")).await;
        state.run_search("mahomes");

        state.apply_score_update(1, 123.45);

        assert_eq!(state.watched[0].season_stats.points, 123.45);
        assert_eq!(state.search_results[0].season_stats.points, 123.45);
        assert!(state.last_update.is_some());
    }

    #[tokio::test]
    async fn score_update_for_unwatched_player_only_stamps_time() {
        let mut state = signed_in(sqlite_store());
        state.apply_score_update(99, 50.0);
        assert!(state.watched.is_empty());
        assert!(state.last_update.is_some());
    }

    #[tokio::test]
    async fn blank_search_clears_results() {
        let mut state = signed_in(sqlite_store());
        state.run_search("mahomes");
        assert_eq!(state.search_results.len(), 1);
        state.run_search("   ");
        assert!(state.search_results.is_empty());
    }

    #[tokio::test]
    async fn run_drains_events_until_channel_closes() {
        let mut state = signed_in(sqlite_store());
        state.add_to_watchlist(player(2, "Travis", "Kelce")).await;

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ScoreEvent {
            player_id: 2,
            season_points: 111.0,
        })
        .unwrap();
        drop(tx);

        let state = run(rx, state).await.unwrap();
        assert_eq!(state.watched[0].season_stats.points, 111.0);
    }
}
