mod difficulty;
mod discipline;
mod ids;

pub use difficulty::AreaDifficulty;
pub use discipline::{CombatClass, Discipline, Role};
pub use ids::{action_id, event_type_id};
