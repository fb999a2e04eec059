//! Static catalog of known object kinds.
//!
//! Maps an object's `(object_type, object_list)` pair to a display label and
//! the prefab name a conversion targets. Conversion code looks entries up
//! here; adding a kind only means adding a row.

/// A known object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKind {
    pub object_type: u8,
    pub object_list: u8,
    /// Human-readable name.
    pub label: &'static str,
    /// Target prefab type.
    pub prefab: &'static str,
    /// Prefab variant (model name) for prefabs shared by several kinds.
    pub variant: Option<&'static str>,
}

const fn kind(
    object_type: u8,
    object_list: u8,
    label: &'static str,
    prefab: &'static str,
    variant: Option<&'static str>,
) -> ObjectKind {
    ObjectKind {
        object_type,
        object_list,
        label,
        prefab,
        variant,
    }
}

static CATALOG: &[ObjectKind] = &[
    kind(0x01, 0x00, "Spring", "spring", None),
    kind(0x02, 0x00, "Wide Spring", "widespring", None),
    kind(0x04, 0x00, "Dash Ramp", "jumppanel", None),
    kind(0x05, 0x00, "Checkpoint", "savepoint", None),
    kind(0x06, 0x00, "Dash Ring", "common_dashring", None),
    kind(0x07, 0x00, "Locked Case", "common_cage", None),
    kind(0x08, 0x00, "Pulley", "updownreel", None),
    kind(0x09, 0x00, "Wood Box", "objectphysics", Some("WoodBox")),
    kind(0x0A, 0x00, "Metal Box", "objectphysics", Some("IronBox")),
    kind(0x0C, 0x00, "Weapon Box", "objectphysics", Some("FlashBox")),
    kind(0x0D, 0x00, "GUN Bomb", "objectphysics", Some("BombBox")),
    kind(0x10, 0x00, "Rings", "ring", None),
    kind(0x12, 0x00, "Item Capsule", "itemboxa", None),
    kind(0x1B, 0x00, "Roadblock", "objectphysics", Some("twn_barricade")),
    kind(0x1D, 0x00, "Secret Key", "medal_of_royal_bronze", None),
    kind(0x31, 0x11, "Killer Plant", "enemy", None),
    kind(0x33, 0x00, "Energy Core", "itemboxa", None),
    kind(0x3A, 0x00, "Weapon Box", "objectphysics", Some("FlashBox")),
    kind(0x4F, 0x00, "Vehicle", "vehicle", None),
    kind(0x65, 0x00, "GUN Beetle", "enemy", None),
    kind(0x68, 0x00, "GUN Robot", "enemy", None),
    kind(0x88, 0x25, "Prison Island Path Object", "common_path_obj", None),
    kind(0x8D, 0x00, "Black Arms Warrior", "enemy", None),
    kind(0x90, 0x00, "Black Arms Worm", "enemy", None),
];

/// Look up the kind for an `(object_type, object_list)` pair.
pub fn lookup(object_type: u8, object_list: u8) -> Option<&'static ObjectKind> {
    CATALOG
        .iter()
        .find(|k| k.object_type == object_type && k.object_list == object_list)
}

/// Every catalogued kind.
pub fn kinds() -> &'static [ObjectKind] {
    CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_uses_both_keys() {
        assert_eq!(lookup(0x01, 0x00).map(|k| k.prefab), Some("spring"));
        assert_eq!(lookup(0x31, 0x11).map(|k| k.label), Some("Killer Plant"));
        assert!(lookup(0x31, 0x00).is_none());
    }

    #[test]
    fn test_shared_prefab_kinds_carry_a_variant() {
        assert_eq!(lookup(0x09, 0x00).and_then(|k| k.variant), Some("WoodBox"));
        assert_eq!(lookup(0x1B, 0x00).and_then(|k| k.variant), Some("twn_barricade"));
        assert_eq!(lookup(0x01, 0x00).and_then(|k| k.variant), None);
        for kind in kinds().iter().filter(|k| k.prefab == "objectphysics") {
            assert!(kind.variant.is_some(), "{} has no variant", kind.label);
        }
    }

    #[test]
    fn test_no_duplicate_keys() {
        for (i, a) in kinds().iter().enumerate() {
            for b in &kinds()[i + 1..] {
                assert!(
                    (a.object_type, a.object_list) != (b.object_type, b.object_list),
                    "duplicate catalog key {:#04x}/{:#04x}",
                    a.object_type,
                    a.object_list
                );
            }
        }
    }
}
