pub mod directory;
pub mod load;
pub mod record;

pub use directory::{PlayerDirectory, ScoreChange};
pub use load::{load_players, DataError};
pub use record::{InjuryStatus, Player, PlayerId, Position, StatBlock, StatCategory};
