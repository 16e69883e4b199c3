// Player dataset loading and validation.
//
// Reads the `players.json` file produced by the data-fetch tooling: a single
// top-level object with a `players` array. The directory is static for a
// session, so this runs once at startup.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use super::record::Player;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read player data {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse player data {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level shape of the dataset file.
#[derive(Debug, Deserialize)]
struct PlayerFile {
    players: Vec<Player>,
}

/// Load and validate the player dataset from `path`.
pub fn load_players(path: &Path) -> Result<Vec<Player>, DataError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| DataError::Io {
        path: label.clone(),
        source: e,
    })?;
    load_players_from_reader(file, &label)
}

/// Reader-based loader (private) so tests can feed inline JSON without
/// touching the filesystem.
fn load_players_from_reader(reader: impl Read, label: &str) -> Result<Vec<Player>, DataError> {
    let file: PlayerFile = serde_json::from_reader(reader).map_err(|e| DataError::Parse {
        path: label.to_string(),
        source: e,
    })?;

    validate(&file.players)?;

    if file.players.is_empty() {
        warn!("player dataset {label} is empty; nothing to simulate");
    }

    Ok(file.players)
}

fn validate(players: &[Player]) -> Result<(), DataError> {
    let mut seen = HashSet::with_capacity(players.len());
    for player in players {
        if player.id == 0 {
            return Err(DataError::Validation(format!(
                "player '{}' has id 0; ids must be positive",
                player.full_name()
            )));
        }
        if !seen.insert(player.id) {
            return Err(DataError::Validation(format!(
                "duplicate player id {} ('{}')",
                player.id,
                player.full_name()
            )));
        }
        for (window, stats) in [("season", &player.season_stats), ("week", &player.week_stats)] {
            if !stats.points.is_finite() || !stats.projection.is_finite() {
                return Err(DataError::Validation(format!(
                    "player {} has non-finite {window} points/projection",
                    player.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(players_json: &str) -> String {
        format!(r##"{{ "players": [{players_json}] }}"##)
    }

    fn minimal_player(id: u32, first: &str, last: &str) -> String {
        format!(
            r##"{{
                "id": {id},
                "firstname": "{first}",
                "surname": "{last}",
                "team": "KC",
                "position": "WR",
                "teamColor": "#E31837",
                "seasonStats": {{ "points": 100.0, "projection": 110.0 }},
                "weekStats": {{ "points": 10.0, "projection": 12.0 }}
            }}"##
        )
    }

    #[test]
    fn loads_valid_dataset() {
        let json = dataset(&format!(
            "{},{}",
            minimal_player(1, "Travis", "Kelce"),
            minimal_player(2, "Rashee", "Rice")
        ));
        let players = load_players_from_reader(json.as_bytes(), "inline").unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].id, 1);
        assert_eq!(players[1].full_name(), "Rashee Rice");
    }

    #[test]
    fn empty_dataset_is_ok() {
        let players = load_players_from_reader(dataset("").as_bytes(), "inline").unwrap();
        assert!(players.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = dataset(&format!(
            "{},{}",
            minimal_player(3, "A", "B"),
            minimal_player(3, "C", "D")
        ));
        let err = load_players_from_reader(json.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        assert!(err.to_string().contains("duplicate player id 3"));
    }

    #[test]
    fn rejects_zero_id() {
        let json = dataset(&minimal_player(0, "Zero", "Id"));
        let err = load_players_from_reader(json.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = load_players_from_reader("not json".as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }
}
