//! Entity matcher.

use tagtrail_core::EntityRecord;

/// Find the tracked entity by name.
///
/// First pass: case-insensitive equality. Second pass: either name contains
/// the other, case-insensitively. First match wins in each pass. An empty
/// entity name is contained in every target, so it matches in the second pass.
pub fn find_entity<'a>(items: &'a [EntityRecord], target: &str) -> Option<&'a EntityRecord> {
    let target = target.to_lowercase();

    if let Some(exact) = items.iter().find(|item| item.name.to_lowercase() == target) {
        return Some(exact);
    }

    items.iter().find(|item| {
        let name = item.name.to_lowercase();
        name.contains(&target) || target.contains(&name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<EntityRecord> {
        names.iter().map(|n| EntityRecord::named(*n)).collect()
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let items = named(&["Keys", "LYRIQ"]);
        assert_eq!(find_entity(&items, "lyriq").map(|e| e.name.as_str()), Some("LYRIQ"));
    }

    #[test]
    fn exact_match_beats_earlier_partial_match() {
        let items = named(&["ERAUBCU LYRIQ", "lyriq"]);
        assert_eq!(find_entity(&items, "LYRIQ").map(|e| e.name.as_str()), Some("lyriq"));
    }

    #[test]
    fn entity_name_containing_target_matches() {
        let items = named(&["ERAUBCU LYRIQ"]);
        assert_eq!(
            find_entity(&items, "LYRIQ").map(|e| e.name.as_str()),
            Some("ERAUBCU LYRIQ")
        );
    }

    #[test]
    fn target_containing_entity_name_matches() {
        let items = named(&["Keys", "Lyriq"]);
        assert_eq!(
            find_entity(&items, "ERAUBCU LYRIQ").map(|e| e.name.as_str()),
            Some("Lyriq")
        );
    }

    #[test]
    fn first_partial_match_wins() {
        let items = named(&["Car Keys", "House Keys"]);
        assert_eq!(find_entity(&items, "keys").map(|e| e.name.as_str()), Some("Car Keys"));
    }

    #[test]
    fn no_match_is_none() {
        let items = named(&["Keys", "Backpack"]);
        assert!(find_entity(&items, "LYRIQ").is_none());
        assert!(find_entity(&[], "LYRIQ").is_none());
    }

    #[test]
    fn empty_entity_name_matches_by_containment() {
        let items = named(&["", "Keys"]);
        assert_eq!(find_entity(&items, "LYRIQ").map(|e| e.name.as_str()), Some(""));
    }

    #[test]
    fn exact_match_still_beats_empty_name() {
        let items = named(&["", "lyriq"]);
        assert_eq!(find_entity(&items, "LYRIQ").map(|e| e.name.as_str()), Some("lyriq"));
    }
}
