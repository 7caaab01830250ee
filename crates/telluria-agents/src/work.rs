//! Production: extraction against the hex commons, and recipe work.
//!
//! Each resource-producing occupation has a required hex resource. A work
//! action picks the healthiest hex in the home neighborhood that still holds
//! at least one unit, extracts `floor(skill · multiplier)` clamped to what
//! is there (and to at least one unit), and chips the hex's health. When no
//! hex qualifies, the producer still shows up: they get small safety,
//! belonging, and purpose increments and no output. The land failed them,
//! not the other way around -- punishing them would turn depletion into a
//! death spiral.
//!
//! Crafters and scholars work a parallel non-hex path whose success
//! criterion is consuming recipe inputs from inventory. Merchants and
//! soldiers train.

use telluria_types::{
    Agent, AxialCoord, GoodKind, Need, Occupation, ResourceKind, Skills, AGNOSIS,
};
use telluria_world::{HexMap, EXTRACTION_HEALTH_LOSS, LABORER_HEALTH_GAIN};

/// Needs increment for a successful work action.
pub const WORK_NEED_GAIN: f64 = AGNOSIS * 0.01;

/// Survival increment for hex-backed extraction (working the land feeds).
pub const WORK_SURVIVAL_GAIN: f64 = AGNOSIS * 0.005;

/// Needs increment for showing up to work on barren land.
pub const BARREN_NEED_GAIN: f64 = AGNOSIS * 0.005;

/// Per-action skill growth.
pub const SKILL_GROWTH: f64 = AGNOSIS * 0.002;

/// The hex resource an occupation extracts, if it is hex-backed.
#[must_use]
pub const fn required_resource(occupation: Occupation) -> Option<ResourceKind> {
    match occupation {
        Occupation::Farmer => Some(ResourceKind::Grain),
        Occupation::Fisher => Some(ResourceKind::Fish),
        Occupation::Hunter => Some(ResourceKind::Furs),
        Occupation::Miner => Some(ResourceKind::IronOre),
        Occupation::Laborer => Some(ResourceKind::Stone),
        Occupation::Alchemist => Some(ResourceKind::Herbs),
        Occupation::Crafter
        | Occupation::Merchant
        | Occupation::Soldier
        | Occupation::Scholar => None,
    }
}

/// Yield multiplier per hex-backed occupation.
#[must_use]
pub const fn yield_multiplier(occupation: Occupation) -> f64 {
    match occupation {
        Occupation::Farmer | Occupation::Laborer => 3.0,
        Occupation::Fisher => 5.0,
        Occupation::Hunter | Occupation::Miner | Occupation::Alchemist => 2.0,
        _ => 0.0,
    }
}

/// The skill value an occupation works with.
#[must_use]
pub fn work_skill(occupation: Occupation, skills: &Skills) -> f64 {
    match occupation {
        Occupation::Farmer => skills.farming,
        // Fishers draw on either field craft or the hunt, with a floor.
        Occupation::Fisher => skills.farming.max(skills.combat).max(0.5),
        Occupation::Hunter | Occupation::Soldier => skills.combat,
        Occupation::Miner | Occupation::Laborer => skills.mining,
        Occupation::Alchemist | Occupation::Crafter | Occupation::Scholar => skills.crafting,
        Occupation::Merchant => skills.trade,
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// A crafting recipe: inputs consumed, one unit of output produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    /// The good produced.
    pub output: GoodKind,
    /// Required `(good, units)` inputs.
    pub inputs: &'static [(GoodKind, u32)],
}

/// The crafter's recipe book, in preference order.
pub const CRAFTER_RECIPES: [Recipe; 4] = [
    Recipe {
        output: GoodKind::Tools,
        inputs: &[(GoodKind::IronOre, 1), (GoodKind::Timber, 1)],
    },
    Recipe {
        output: GoodKind::Cloth,
        inputs: &[(GoodKind::Furs, 2)],
    },
    Recipe {
        output: GoodKind::Potions,
        inputs: &[(GoodKind::Herbs, 2)],
    },
    Recipe {
        output: GoodKind::Jewelry,
        inputs: &[(GoodKind::Gems, 1), (GoodKind::IronOre, 1)],
    },
];

/// The scholar's single recipe.
pub const SCHOLAR_RECIPE: Recipe = Recipe {
    output: GoodKind::Manuscripts,
    inputs: &[(GoodKind::Herbs, 1), (GoodKind::Timber, 1)],
};

/// The recipe whose inputs the inventory is closest to completing, with the
/// still-missing `(good, units)` pairs.
///
/// This is the single-recipe demand rule: a crafter demands only the missing
/// inputs of their closest recipe, never every raw material at once.
#[must_use]
pub fn closest_recipe(
    recipes: &'static [Recipe],
    inventory: &telluria_types::Inventory,
) -> Option<(&'static Recipe, Vec<(GoodKind, u32)>)> {
    let mut best: Option<(&'static Recipe, Vec<(GoodKind, u32)>, u32)> = None;
    for recipe in recipes {
        let missing: Vec<(GoodKind, u32)> = recipe
            .inputs
            .iter()
            .filter_map(|(good, required)| {
                let held = inventory.get(*good);
                (held < *required).then(|| (*good, *required - held))
            })
            .collect();
        let missing_units: u32 = missing.iter().map(|(_, units)| *units).sum();
        // Strictly-less keeps ties on the earlier recipe in the book.
        if best
            .as_ref()
            .is_none_or(|(_, _, best_units)| missing_units < *best_units)
        {
            best = Some((recipe, missing, missing_units));
        }
    }
    best.map(|(recipe, missing, _)| (recipe, missing))
}

// ---------------------------------------------------------------------------
// Work resolution
// ---------------------------------------------------------------------------

/// The result of one work action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Extracted units of a good from a hex.
    Extracted {
        /// Good produced.
        good: GoodKind,
        /// Units extracted.
        units: u32,
        /// Secondary good granted alongside, if any.
        secondary: Option<GoodKind>,
    },
    /// Consumed recipe inputs and produced one unit.
    Crafted {
        /// Good produced.
        good: GoodKind,
    },
    /// Showed up, but every nearby hex was exhausted.
    Barren,
    /// Trained or studied; no goods moved.
    Trained,
    /// Recipe work wanted for inputs.
    NoMaterials,
}

/// Resolve one work action for a live agent.
///
/// `workplace` is the agent's home settlement hex (the neighborhood searched
/// is that hex plus its six neighbors); `boost` is the settlement's active
/// production multiplier.
pub fn perform_work(
    agent: &mut Agent,
    map: &mut HexMap,
    workplace: AxialCoord,
    tick: u64,
    boost: f64,
) -> WorkOutcome {
    match required_resource(agent.occupation) {
        Some(resource) => extract(agent, map, workplace, resource, tick, boost),
        None => match agent.occupation {
            Occupation::Crafter => craft(agent, &CRAFTER_RECIPES, tick),
            Occupation::Scholar => craft(agent, core::slice::from_ref(&SCHOLAR_RECIPE), tick),
            // Merchants and soldiers train between their real duties.
            _ => train(agent, tick),
        },
    }
}

/// Hex-backed extraction.
fn extract(
    agent: &mut Agent,
    map: &mut HexMap,
    workplace: AxialCoord,
    resource: ResourceKind,
    tick: u64,
    boost: f64,
) -> WorkOutcome {
    let Some(site) = select_site(map, workplace, resource) else {
        // Barren land: the producer is not punished for the commons' state.
        agent.needs.adjust(Need::Safety, BARREN_NEED_GAIN);
        agent.needs.adjust(Need::Belonging, BARREN_NEED_GAIN);
        agent.needs.adjust(Need::Purpose, BARREN_NEED_GAIN);
        return WorkOutcome::Barren;
    };

    let skill = work_skill(agent.occupation, &agent.skills);
    let multiplier = yield_multiplier(agent.occupation);

    let Some(hex) = map.get_mut(site) else {
        return WorkOutcome::Barren;
    };

    let available = hex.resources.get(resource).floor();
    let units = (skill * multiplier * boost).floor().max(1.0).min(available);
    let taken = hex.resources.take(resource, units) as u32;

    let secondary = match agent.occupation {
        Occupation::Miner => {
            // One coal alongside every ore haul; the seam supplies it when
            // it can.
            hex.resources.take(ResourceKind::Coal, 1.0);
            agent.inventory.add(GoodKind::Coal, 1);
            Some(GoodKind::Coal)
        }
        Occupation::Alchemist if hex.resources.get(ResourceKind::Exotics) >= 1.0 => {
            hex.resources.take(ResourceKind::Exotics, 1.0);
            agent.inventory.add(GoodKind::Exotics, 1);
            Some(GoodKind::Exotics)
        }
        _ => None,
    };

    hex.adjust_health(-EXTRACTION_HEALTH_LOSS);
    if agent.occupation == Occupation::Laborer {
        // Laborers tend the land they quarry.
        hex.adjust_health(LABORER_HEALTH_GAIN);
    }
    hex.last_extracted_tick = tick;

    let good = resource.good();
    agent.inventory.add(good, taken);
    award_work_needs(agent, true);
    grow_skill(agent);
    agent.last_work_tick = tick;

    WorkOutcome::Extracted {
        good,
        units: taken,
        secondary,
    }
}

/// Recipe work for crafters and scholars.
fn craft(agent: &mut Agent, recipes: &'static [Recipe], tick: u64) -> WorkOutcome {
    let Some((recipe, missing)) = closest_recipe(recipes, &agent.inventory) else {
        return WorkOutcome::NoMaterials;
    };
    if !missing.is_empty() {
        return WorkOutcome::NoMaterials;
    }

    for (good, units) in recipe.inputs {
        agent.inventory.take(*good, *units);
    }
    agent.inventory.add(recipe.output, 1);
    award_work_needs(agent, false);
    grow_skill(agent);
    agent.last_work_tick = tick;

    WorkOutcome::Crafted {
        good: recipe.output,
    }
}

/// Training for merchants and soldiers.
fn train(agent: &mut Agent, tick: u64) -> WorkOutcome {
    award_work_needs(agent, false);
    grow_skill(agent);
    agent.last_work_tick = tick;
    WorkOutcome::Trained
}

/// The healthiest neighborhood hex holding at least one unit of `resource`.
fn select_site(map: &HexMap, workplace: AxialCoord, resource: ResourceKind) -> Option<AxialCoord> {
    let mut best: Option<(AxialCoord, f64)> = None;
    for coord in map.neighborhood(workplace) {
        let Some(hex) = map.get(coord) else { continue };
        if hex.resources.get(resource) < 1.0 {
            continue;
        }
        // Strictly-greater keeps ties on the earlier neighborhood entry,
        // which is stable (center first, then neighbor order).
        if best.is_none_or(|(_, best_health)| hex.health > best_health) {
            best = Some((coord, hex.health));
        }
    }
    best.map(|(coord, _)| coord)
}

/// Needs awarded by a successful work action.
fn award_work_needs(agent: &mut Agent, hex_backed: bool) {
    agent.needs.adjust(Need::Esteem, WORK_NEED_GAIN);
    agent.needs.adjust(Need::Safety, WORK_NEED_GAIN);
    agent.needs.adjust(Need::Belonging, WORK_NEED_GAIN);
    agent.needs.adjust(Need::Purpose, WORK_NEED_GAIN);
    if hex_backed {
        agent.needs.adjust(Need::Survival, WORK_SURVIVAL_GAIN);
    }
}

/// Grow the skill the occupation works with.
fn grow_skill(agent: &mut Agent) {
    let skills = &mut agent.skills;
    let slot = match agent.occupation {
        Occupation::Farmer | Occupation::Fisher => &mut skills.farming,
        Occupation::Hunter | Occupation::Soldier => &mut skills.combat,
        Occupation::Miner | Occupation::Laborer => &mut skills.mining,
        Occupation::Alchemist | Occupation::Crafter | Occupation::Scholar => &mut skills.crafting,
        Occupation::Merchant => &mut skills.trade,
    };
    *slot = (*slot + SKILL_GROWTH).min(1.0);
}
