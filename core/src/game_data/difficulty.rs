//! Instance difficulty as reported by AreaEntered events.

use serde::{Deserialize, Serialize};

/// Difficulty mode of an operation or flashpoint area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AreaDifficulty {
    #[default]
    Unknown,
    Solo,
    Story4,
    Veteran4,
    Master4,
    Story8,
    Veteran8,
    Master8,
    Story16,
    Veteran16,
    Master16,
}

impl AreaDifficulty {
    /// Look up the difficulty from the id carried in the log.
    pub fn from_id(id: u64) -> Self {
        use AreaDifficulty::*;
        match id {
            1 => Solo,
            836045448953656 => Story4,
            836045448953657 => Veteran4,
            836045448953659 => Master4,
            836045448953651 => Story8,
            836045448953652 => Veteran8,
            836045448953655 => Master8,
            836045448953653 => Story16,
            836045448953654 => Veteran16,
            836045448953658 => Master16,
            _ => Unknown,
        }
    }

    /// Group size the mode is tuned for (0 when unknown).
    pub const fn player_count(&self) -> u32 {
        use AreaDifficulty::*;
        match self {
            Solo => 1,
            Story4 | Veteran4 | Master4 => 4,
            Story8 | Veteran8 | Master8 => 8,
            Story16 | Veteran16 | Master16 => 16,
            Unknown => 0,
        }
    }

    pub const fn label(&self) -> &'static str {
        use AreaDifficulty::*;
        match self {
            Unknown => "Unknown",
            Solo => "Solo",
            Story4 => "4 Player Story",
            Veteran4 => "4 Player Veteran",
            Master4 => "4 Player Master",
            Story8 => "8 Player Story",
            Veteran8 => "8 Player Veteran",
            Master8 => "8 Player Master",
            Story16 => "16 Player Story",
            Veteran16 => "16 Player Veteran",
            Master16 => "16 Player Master",
        }
    }
}
