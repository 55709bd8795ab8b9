//! Who is who: players, their pets and mercenaries, and creature names seen in
//! fights.

mod registry;

pub use registry::{PlayerRegistry, is_possible_player_name};

/// Owner recorded for pets whose owner is not known yet.
pub const UNASSIGNED: &str = "Unassigned";

/// Attacker name used when a spell-sourced hit has no identifiable caster.
pub const UNKNOWN: &str = "Unknown";
