// Player records and stat blocks (the static dataset schema).

use serde::{Deserialize, Serialize};

/// Unique player identifier. Positive, assigned once at data-load time.
pub type PlayerId = u32;

/// Fantasy-relevant roster position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

/// A stat category shown on a player card. Which categories apply depends
/// on the player's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    PassingYards,
    PassingTouchdowns,
    Interceptions,
    RushingYards,
    RushingTouchdowns,
    Receptions,
    ReceivingYards,
    ReceivingTouchdowns,
    Targets,
}

impl Position {
    /// The stat categories displayed for this position. Kickers and defenses
    /// show points only.
    pub fn stat_categories(&self) -> &'static [StatCategory] {
        use StatCategory::*;
        match self {
            Position::QB => &[PassingYards, PassingTouchdowns, Interceptions, RushingYards],
            Position::RB => &[RushingYards, RushingTouchdowns, Receptions, ReceivingYards],
            Position::WR | Position::TE => {
                &[Receptions, ReceivingYards, ReceivingTouchdowns, Targets]
            }
            Position::K | Position::DEF => &[],
        }
    }
}

/// Player availability status for the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InjuryStatus {
    Healthy,
    Questionable,
    Doubtful,
    Out,
}

/// The points/projection/counters bundle for one time window (season or week).
///
/// `points` is the only field the score simulator mutates; it is kept rounded
/// to 2 decimal places and clamped at 0. `projection` is set at load time and
/// never touched thereafter. The counter fields are position-dependent: only
/// the ones named by [`Position::stat_categories`] are meaningful for a given
/// player, the rest are absent in the dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBlock {
    pub points: f64,
    pub projection: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_yards: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touchdowns: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interceptions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rushing_yards: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_yards: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receptions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<f64>,
}

/// One athlete's identity and stat data. Created once at data-load time;
/// only the two `points` fields change during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub firstname: String,
    pub surname: String,
    /// NFL team short code (e.g. "KC", or "FA" for free agents).
    pub team: String,
    pub position: Position,
    /// Team display color (hex string). Irrelevant to core logic.
    pub team_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub season_stats: StatBlock,
    pub week_stats: StatBlock,
    #[serde(default)]
    pub is_projected_to_score: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_status: Option<InjuryStatus>,
}

impl Player {
    /// "First Last" display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.surname)
    }
}
