use dashmap::{DashMap, DashSet};

use super::UNASSIGNED;
use crate::context::{IStr, intern, resolve};

/// Second and third person names that always refer to a player.
const PLAYER_PRONOUNS: [&str; 6] = ["you", "your", "yourself", "himself", "herself", "itself"];

/// Shared lookup of player-side names.
///
/// Writers (the fight processor, CLI commands) and readers (classifier, stats
/// engine) touch it concurrently, so every table is a `DashMap`.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    /// Player name → latest time the player was seen
    verified_players: DashMap<IStr, f64>,
    verified_pets: DashSet<IStr>,
    game_generated_pets: DashSet<IStr>,
    pet_to_player: DashMap<IStr, IStr>,
    /// Upper-cased mercenary names
    mercs: DashSet<String>,
    known_npcs: DashSet<IStr>,
    player_classes: DashMap<IStr, IStr>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Players
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_verified_player(&self, name: IStr, time: f64) {
        if resolve(name).is_empty() {
            return;
        }

        self.verified_players
            .entry(name)
            .and_modify(|last| {
                if time > *last {
                    *last = time;
                }
            })
            .or_insert(time);

        if self.verified_pets.remove(&name).is_some() {
            self.pet_to_player.remove(&name);
        }
    }

    pub fn remove_verified_player(&self, name: IStr) {
        if self.verified_players.remove(&name).is_some() {
            self.pet_to_player.retain(|_, owner| *owner != name);
        }
    }

    pub fn is_verified_player(&self, name: IStr) -> bool {
        let s = resolve(name);
        if s.is_empty() {
            return false;
        }
        s == UNASSIGNED
            || PLAYER_PRONOUNS.iter().any(|p| p.eq_ignore_ascii_case(s))
            || self.verified_players.contains_key(&name)
    }

    pub fn verified_players(&self) -> Vec<IStr> {
        let mut names: Vec<IStr> = self.verified_players.iter().map(|e| *e.key()).collect();
        names.sort_by(|a, b| resolve(*a).cmp(resolve(*b)));
        names
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pets
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_verified_pet(&self, name: IStr) {
        if resolve(name).is_empty() || self.verified_pets.contains(&name) {
            return;
        }

        self.verified_players.remove(&name);
        if is_possible_player_name(resolve(name)) && !self.pet_to_player.contains_key(&name) {
            self.add_pet_to_player(name, intern(UNASSIGNED));
        }
        self.verified_pets.insert(name);
    }

    pub fn remove_verified_pet(&self, name: IStr) {
        if self.verified_pets.remove(&name).is_some() {
            self.pet_to_player.remove(&name);
        }
    }

    /// Pet names the game hands out; recognised as pets on sight.
    pub fn add_game_generated_pet(&self, name: IStr) {
        self.game_generated_pets.insert(name);
    }

    pub fn is_verified_pet(&self, name: IStr) -> bool {
        if self.verified_pets.contains(&name) {
            return true;
        }
        if self.game_generated_pets.contains(&name) {
            self.pet_to_player
                .entry(name)
                .or_insert_with(|| intern(UNASSIGNED));
            return true;
        }
        false
    }

    /// Map a pet to its owner. Ignored when the pet name is itself a player.
    pub fn add_pet_to_player(&self, pet: IStr, player: IStr) {
        if resolve(pet).is_empty() || resolve(player).is_empty() || self.is_verified_player(pet) {
            return;
        }
        let changed = self.pet_to_player.insert(pet, player) != Some(player);
        if changed {
            tracing::debug!(pet = resolve(pet), owner = resolve(player), "Pet mapping updated");
        }
    }

    pub fn owner_of(&self, pet: IStr) -> Option<IStr> {
        self.pet_to_player.get(&pet).map(|owner| *owner)
    }

    pub fn pet_mappings(&self) -> Vec<(IStr, IStr)> {
        let mut pairs: Vec<(IStr, IStr)> = self
            .pet_to_player
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        pairs.sort_by(|a, b| resolve(a.0).cmp(resolve(b.0)));
        pairs
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mercenaries, creatures, classes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_merc(&self, name: &str) {
        if !name.is_empty() {
            self.mercs.insert(name.to_uppercase());
        }
    }

    pub fn is_merc(&self, name: IStr) -> bool {
        self.mercs.contains(&resolve(name).to_uppercase())
    }

    pub fn is_pet_or_player_or_merc(&self, name: IStr) -> bool {
        !resolve(name).is_empty()
            && (self.is_verified_player(name) || self.is_verified_pet(name) || self.is_merc(name))
    }

    pub fn add_known_npc(&self, name: IStr) {
        if !resolve(name).is_empty() {
            self.known_npcs.insert(name);
        }
    }

    pub fn is_known_npc(&self, name: IStr) -> bool {
        self.known_npcs.contains(&name)
    }

    pub fn set_player_class(&self, player: IStr, class_name: IStr) {
        self.player_classes.insert(player, class_name);
    }

    pub fn player_class(&self, player: IStr) -> Option<IStr> {
        self.player_classes.get(&player).map(|c| *c)
    }

    pub fn clear(&self) {
        self.verified_players.clear();
        self.verified_pets.clear();
        self.pet_to_player.clear();
        self.mercs.clear();
        self.known_npcs.clear();
        self.player_classes.clear();
    }
}

/// Letters only and at least three of them. One `.` is allowed after the third
/// character for cross-server names ("Alice.Tunare").
pub fn is_possible_player_name(name: &str) -> bool {
    let mut chars = 0usize;
    let mut dots = 0;
    for (i, c) in name.chars().enumerate() {
        chars += 1;
        if i > 2 && c == '.' {
            dots += 1;
            if dots > 1 {
                return false;
            }
        } else if !c.is_alphabetic() {
            return false;
        }
    }
    chars >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn possible_player_names() {
        assert!(is_possible_player_name("Alice"));
        assert!(is_possible_player_name("Zoë"));
        assert!(is_possible_player_name("Alice.Tunare"));
        assert!(!is_possible_player_name("Al"));
        assert!(!is_possible_player_name("a gnoll"));
        assert!(!is_possible_player_name("Alice.Tu.nare"));
        assert!(!is_possible_player_name(".Alice"));
        assert!(!is_possible_player_name(""));
    }

    #[test]
    fn verified_player_and_pronouns() {
        let registry = PlayerRegistry::new();
        let alice = intern("Alice");
        assert!(!registry.is_verified_player(alice));

        registry.add_verified_player(alice, 10.0);
        assert!(registry.is_verified_player(alice));
        assert!(registry.is_verified_player(intern("You")));
        assert!(registry.is_verified_player(intern(UNASSIGNED)));
        assert!(!registry.is_verified_player(intern("")));
    }

    #[test]
    fn pet_becomes_player_drops_mapping() {
        let registry = PlayerRegistry::new();
        let pet = intern("Gober");
        let owner = intern("Bob");

        registry.add_verified_pet(pet);
        assert_eq!(registry.owner_of(pet), Some(intern(UNASSIGNED)));

        registry.add_pet_to_player(pet, owner);
        assert_eq!(registry.owner_of(pet), Some(owner));
        assert!(registry.is_pet_or_player_or_merc(pet));

        registry.add_verified_player(pet, 1.0);
        assert!(!registry.is_verified_pet(pet));
        assert_eq!(registry.owner_of(pet), None);
    }

    #[test]
    fn player_names_cannot_be_pets_of_others() {
        let registry = PlayerRegistry::new();
        let alice = intern("Alice");
        registry.add_verified_player(alice, 1.0);
        registry.add_pet_to_player(alice, intern("Bob"));
        assert_eq!(registry.owner_of(alice), None);
    }

    #[test]
    fn game_generated_pets_map_to_unassigned() {
        let registry = PlayerRegistry::new();
        let pet = intern("Kabann");
        registry.add_game_generated_pet(pet);

        assert!(registry.is_verified_pet(pet));
        assert_eq!(registry.owner_of(pet), Some(intern(UNASSIGNED)));
    }

    #[test]
    fn mercs_match_case_insensitively() {
        let registry = PlayerRegistry::new();
        registry.add_merc("Tsaph Katta");
        assert!(registry.is_merc(intern("tsaph katta")));
        assert!(registry.is_pet_or_player_or_merc(intern("TSAPH KATTA")));
    }

    #[test]
    fn removing_player_removes_their_pets() {
        let registry = PlayerRegistry::new();
        let bob = intern("Bob");
        registry.add_verified_player(bob, 1.0);
        registry.add_pet_to_player(intern("Xabann"), bob);

        registry.remove_verified_player(bob);
        assert_eq!(registry.owner_of(intern("Xabann")), None);
    }
}
