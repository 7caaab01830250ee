//! Settlement social passes: daily pair-ups and the weekly fabric.
//!
//! Each sim-day roughly a tenth of a settlement deterministically pairs off
//! and strengthens bonds. Weekly, the heavier threads are woven: family
//! formation between mutually well-disposed adults, mentorship from the
//! coherent to the scattered, and faction recruitment along high-sentiment
//! bonds.

use std::collections::BTreeMap;

use telluria_types::{
    chance, stable_hash, Agent, AgentId, Event, EventCategory, Need, SettlementId,
    AGNOSIS, TICKS_PER_DAY,
};

use crate::actions::socialize_pair;

/// Minimum mutual sentiment for family formation.
pub const FAMILY_SENTIMENT_THRESHOLD: f64 = 0.4;

/// Weekly probability that a qualifying pair forms a household.
pub const FAMILY_FORMATION_CHANCE: f64 = 0.3;

/// Coherence above which an agent can mentor.
pub const MENTOR_COHERENCE: f64 = 0.6;

/// Coherence below which an agent needs mentoring.
pub const MENTEE_COHERENCE: f64 = 0.3;

/// Coherence a mentee gains from a week of mentorship.
pub const MENTOR_COHERENCE_GAIN: f64 = AGNOSIS * 0.05;

/// Minimum sentiment for faction recruitment.
pub const RECRUIT_SENTIMENT_THRESHOLD: f64 = 0.4;

/// Weekly probability that a qualifying recruitment lands.
pub const RECRUIT_CHANCE: f64 = 0.4;

/// Age of adulthood.
pub const ADULT_AGE: u32 = 18;

/// Run one settlement's daily pair-ups: `population / 10` hash-picked pairs.
pub fn run_daily_pairups(
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    settlement: SettlementId,
    tick: u64,
) -> u32 {
    if members.len() < 2 {
        return 0;
    }
    let day = tick / TICKS_PER_DAY;
    let pairs = (members.len() / 10).max(1) as u64;
    let mut made = 0u32;

    for k in 0..pairs {
        let ha = stable_hash(&[day, settlement.raw(), k, 0x50C1]);
        let hb = stable_hash(&[day, settlement.raw(), k, 0x50C2]);
        let a = members[(ha as usize) % members.len()];
        let b = members[(hb as usize) % members.len()];
        if a != b {
            socialize_pair(agents, a, b);
            made += 1;
        }
    }
    made
}

/// Run one settlement's weekly social pass: families, mentorship,
/// recruitment.
pub fn run_weekly_social(
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    tick: u64,
    events: &mut Vec<Event>,
) {
    form_families(agents, members, tick, events);
    run_mentorship(agents, members, tick);
    recruit_into_factions(agents, members, tick, events);
}

/// Family formation among adults with mutual sentiment above the threshold.
fn form_families(
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    tick: u64,
    events: &mut Vec<Event>,
) {
    let week = tick / (TICKS_PER_DAY * 7);
    for &a_id in members {
        let Some(a) = agents.get(&a_id) else { continue };
        if !a.alive || a.age < ADULT_AGE {
            continue;
        }
        // The strongest qualifying mutual bond, if any.
        let partner = a
            .relationships
            .iter()
            .filter(|rel| rel.sentiment > FAMILY_SENTIMENT_THRESHOLD)
            .filter(|rel| rel.target > a_id) // each pair considered once
            .filter(|rel| {
                agents.get(&rel.target).is_some_and(|b| {
                    b.alive
                        && b.age >= ADULT_AGE
                        && members.contains(&rel.target)
                        && b.sentiment_toward(a_id) > FAMILY_SENTIMENT_THRESHOLD
                })
            })
            .max_by(|x, y| x.sentiment.total_cmp(&y.sentiment))
            .map(|rel| rel.target);

        let Some(b_id) = partner else { continue };
        if !chance(
            stable_hash(&[a_id.raw(), b_id.raw(), week, 0xFA41]),
            FAMILY_FORMATION_CHANCE,
        ) {
            continue;
        }

        for (this, other) in [(a_id, b_id), (b_id, a_id)] {
            if let Some(agent) = agents.get_mut(&this) {
                agent.note_relationship(other, 0.1, 0.1);
                agent.needs.adjust(Need::Belonging, AGNOSIS * 0.5);
                agent.remember(tick, "formed a household", 0.9);
            }
        }
        events.push(
            Event::new(tick, EventCategory::Social, "two households became one")
                .with("agent", a_id)
                .with("partner", b_id),
        );
    }
}

/// Pair the most coherent with the least, lifting the mentee.
fn run_mentorship(agents: &mut BTreeMap<AgentId, Agent>, members: &[AgentId], tick: u64) {
    let mut mentors: Vec<AgentId> = Vec::new();
    let mut mentees: Vec<AgentId> = Vec::new();
    for &id in members {
        let Some(agent) = agents.get(&id) else { continue };
        if !agent.alive {
            continue;
        }
        if agent.soul.coherence > MENTOR_COHERENCE {
            mentors.push(id);
        } else if agent.soul.coherence < MENTEE_COHERENCE {
            mentees.push(id);
        }
    }

    for (mentor_id, mentee_id) in mentors.iter().zip(mentees.iter()) {
        if let Some(mentee) = agents.get_mut(mentee_id) {
            mentee.soul.coherence = (mentee.soul.coherence + MENTOR_COHERENCE_GAIN).min(1.0);
            mentee.needs.adjust(Need::Belonging, AGNOSIS * 0.1);
            mentee.note_relationship(*mentor_id, 0.05, 0.1);
            mentee.remember(tick, "sat with a mentor", 0.5);
        }
        if let Some(mentor) = agents.get_mut(mentor_id) {
            mentor.needs.adjust(Need::Purpose, AGNOSIS * 0.1);
            mentor.note_relationship(*mentee_id, 0.05, 0.05);
        }
    }
}

/// Recruitment of the unaffiliated along high-sentiment bonds.
fn recruit_into_factions(
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    tick: u64,
    events: &mut Vec<Event>,
) {
    let week = tick / (TICKS_PER_DAY * 7);
    for &recruiter_id in members {
        let Some(recruiter) = agents.get(&recruiter_id) else {
            continue;
        };
        let Some(faction) = recruiter.faction else {
            continue;
        };
        if !recruiter.alive {
            continue;
        }
        let target = recruiter
            .relationships
            .iter()
            .filter(|rel| rel.sentiment > RECRUIT_SENTIMENT_THRESHOLD)
            .filter(|rel| {
                agents
                    .get(&rel.target)
                    .is_some_and(|t| t.alive && t.faction.is_none() && members.contains(&rel.target))
            })
            .max_by(|x, y| x.sentiment.total_cmp(&y.sentiment))
            .map(|rel| rel.target);

        let Some(target_id) = target else { continue };
        if !chance(
            stable_hash(&[recruiter_id.raw(), target_id.raw(), week, 0x4EC4]),
            RECRUIT_CHANCE,
        ) {
            continue;
        }
        if let Some(recruit) = agents.get_mut(&target_id) {
            recruit.faction = Some(faction);
            recruit.remember(tick, "joined a faction on a friend's word", 0.6);
            events.push(
                Event::new(tick, EventCategory::Social, "a friend brought a friend in")
                    .with("agent", target_id)
                    .with("faction", faction),
            );
        }
    }
}
