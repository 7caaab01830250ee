//! Deterministic name generation for agents and settlements.
//!
//! Names are assembled from syllable tables indexed by a stable hash, so a
//! given `(seed, id)` always yields the same name on every run and every
//! restore.

use telluria_types::{mix, Sex};

const GIVEN_STEMS: [&str; 16] = [
    "Al", "Ber", "Cas", "Dor", "El", "Fen", "Gar", "Hal", "Is", "Jor", "Kel", "Lor", "Mar", "Ned",
    "Or", "Pell",
];

const FEMALE_ENDINGS: [&str; 8] = ["a", "ia", "wen", "ys", "ara", "ine", "eth", "onna"];

const MALE_ENDINGS: [&str; 8] = ["an", "ric", "mund", "os", "war", "en", "ulf", "ard"];

const FAMILY_STEMS: [&str; 12] = [
    "Ash", "Black", "Cole", "Dun", "Elm", "Frost", "Gray", "Hart", "Iron", "Marsh", "Stone",
    "Thorn",
];

const FAMILY_ENDINGS: [&str; 8] = ["field", "brook", "wood", "hill", "well", "mere", "ford", "den"];

const SETTLEMENT_STEMS: [&str; 14] = [
    "Alden", "Briar", "Crag", "Dawn", "Ember", "Fallow", "Glen", "Haven", "Kiln", "Lark", "Moor",
    "Oxen", "Rill", "Wold",
];

const SETTLEMENT_ENDINGS: [&str; 10] = [
    "gate", "stead", "mouth", "shire", "holt", "cross", "reach", "march", "haven", "fall",
];

/// Pick a table entry from a hash word.
fn pick<'a>(table: &'a [&'a str], hash: u64) -> &'a str {
    let idx = (hash % table.len() as u64) as usize;
    table.get(idx).copied().unwrap_or("")
}

/// Generate an agent's full name from a hash word.
#[must_use]
pub fn agent_name(hash: u64, sex: Sex) -> String {
    let given_stem = pick(&GIVEN_STEMS, hash);
    let ending = match sex {
        Sex::Female => pick(&FEMALE_ENDINGS, mix(hash ^ 1)),
        Sex::Male => pick(&MALE_ENDINGS, mix(hash ^ 1)),
    };
    let family = format!(
        "{}{}",
        pick(&FAMILY_STEMS, mix(hash ^ 2)),
        pick(&FAMILY_ENDINGS, mix(hash ^ 3))
    );
    format!("{given_stem}{ending} {family}")
}

/// Generate a settlement name from a hash word.
#[must_use]
pub fn settlement_name(hash: u64) -> String {
    format!(
        "{}{}",
        pick(&SETTLEMENT_STEMS, hash),
        pick(&SETTLEMENT_ENDINGS, mix(hash ^ 5))
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::stable_hash;

    use super::*;

    #[test]
    fn names_are_deterministic() {
        let h = stable_hash(&[42, 7]);
        assert_eq!(agent_name(h, Sex::Female), agent_name(h, Sex::Female));
        assert_eq!(settlement_name(h), settlement_name(h));
    }

    #[test]
    fn names_vary_with_hash() {
        let a = settlement_name(stable_hash(&[1]));
        let b = settlement_name(stable_hash(&[2]));
        assert_ne!(a, b);
    }

    #[test]
    fn agent_names_have_given_and_family_parts() {
        let name = agent_name(stable_hash(&[9]), Sex::Male);
        assert_eq!(name.split(' ').count(), 2);
    }
}
