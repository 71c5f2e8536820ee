//! Compiled-in catalogs for the player-state document vocabulary.
//!
//! All runtime behavior that depends on game data (material names, inert
//! node ids, stage paths) is driven by these tables so the rest of the crate
//! stays free of string literals tied to one game build.

/// `id` of the array element that holds every editable player-state node.
pub const PLAYER_STATE_ID: &str = "PLAYER_STATE";

/// `id` of the quantity-keyed material container node.
pub const MATERIAL_STORAGE_ID: &str = "material_storage";

/// Node id prefix for equipment/hotbar slot entries.
pub const SLOT_ID_PREFIX: &str = "slot_";

/// Node ids whose attributes are boolean-coded regardless of attribute name.
pub const ALWAYS_BOOLEAN_IDS: [&str; 1] = ["discovered_tower_areas"];

/// Closed identifier set for material attributes. The empty string is a
/// member: slot nodes use it for "no material".
pub const MATERIALS: [&str; 60] = [
    "",
    "PLANTS",
    "SCRAP_FABRIC",
    "SCRAP_WOOD",
    "SCRAP_METAL",
    "PLASTICS",
    "STONE",
    "WOOD",
    "IRON",
    "SCRAP_ELECTRONICS",
    "CERAMICS",
    "FABRIC",
    "HIDE",
    "BRICKS",
    "RUBBER",
    "STEEL",
    "LUMBER",
    "ELECTRONICS",
    "MANA_BEAD",
    "TITANIUM",
    "MANA_CHUNK",
    "MANA_SHARD",
    "TOMB_ORB",
    "NIGHT_MANA",
    "CPU",
    "FUEL_CELL",
    "MUSHROOM_BROWN",
    "MUSHROOM_RED",
    "MUSHROOM_WHITE",
    "RICE",
    "BERRIES",
    "EGG",
    "CACTUS",
    "SPICES",
    "FISH_A",
    "FISH_B",
    "FISH_C",
    "FISH_E",
    "FISH_D",
    "MEAT",
    "BONE",
    "TOMATO",
    "CARROT",
    "CORN",
    "LETTUCE",
    "ONION",
    "POTATO",
    "WHEAT",
    "LOBSTER",
    "OCTOPUS",
    "BANANA",
    "TRUFFLE",
    "CLOUDBERRY",
    "TIGER_LILY",
    "AMBER_LILY",
    "FROST_LILY",
    "CHITIN",
    "GOLD_ORE",
    "GOLD_BAR",
    "BEAM_GUN_BATTERY",
];

/// Player-state nodes that are enumerated but never editable. These hold
/// engine bookkeeping (death positions, discovery records, travel state)
/// whose bytes must round-trip untouched.
pub const INERT_NODE_IDS: [&str; 14] = [
    "active_stage",
    "last_death_position",
    "last_death_position_in_open_world",
    "last_death_time_in_seconds_since_day1",
    "last_death_materials",
    "last_death_stage_id",
    "last_location",
    "materials",
    "current_tower_area_id",
    "material_storage_alltime",
    "tracked_recipes",
    "fast_travel",
    "states",
    "travel",
];

/// Known stage index paths, offered to hosts as suggestions for the respawn
/// node's free-text `stage` attribute.
pub const STAGE_INDEX_PATHS: [&str; 4] = [
    "stages/dlc1/index.xml",
    "stages/dlc2/index.xml",
    "stages/dlc3/index.xml",
    "stages/island/index.xml",
];

pub fn is_material(name: &str) -> bool {
    MATERIALS.contains(&name)
}

pub fn is_inert_id(id: &str) -> bool {
    INERT_NODE_IDS.contains(&id)
}

pub fn is_always_boolean_id(id: &str) -> bool {
    ALWAYS_BOOLEAN_IDS.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_a_material() {
        assert!(is_material(""));
    }

    #[test]
    fn materials_are_unique() {
        for (i, a) in MATERIALS.iter().enumerate() {
            for b in MATERIALS.iter().skip(i + 1) {
                assert_ne!(a, b, "duplicate material entry {a}");
            }
        }
    }

    #[test]
    fn inert_ids_cover_engine_bookkeeping() {
        assert!(is_inert_id("last_death_position"));
        assert!(is_inert_id("travel"));
        assert!(!is_inert_id("respawn"));
        assert!(!is_inert_id(MATERIAL_STORAGE_ID));
    }
}
