//! Deterministic churn over a [`Coordinator`].
//!
//! Each tick spawns entities, toggles components at random, despawns a few,
//! integrates the Movement system and then checks that every system's
//! membership matches the entity signatures exactly.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::StressConfig;
use crate::ecs::{Component, Coordinator, Entity, Signature, System};
use crate::error::EcsResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health(pub u32);
impl Component for Health {}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Clock {
    pub tick: u64,
}

/// Integrates velocity into position for every member.
#[derive(Debug, Default)]
pub struct Movement {
    pub joined: u64,
    pub left: u64,
}

impl System for Movement {
    fn entity_registered(&mut self, _entity: Entity) {
        self.joined += 1;
    }

    fn entity_erased(&mut self, _entity: Entity) {
        self.left += 1;
    }
}

impl Movement {
    pub fn update(coordinator: &mut Coordinator) -> EcsResult<usize> {
        let members: Vec<Entity> = coordinator
            .system_entities::<Movement>()?
            .iter()
            .copied()
            .collect();
        for &entity in &members {
            let velocity = *coordinator.get_component::<Velocity>(entity)?;
            let position = coordinator.get_component_mut::<Position>(entity)?;
            position.x += velocity.dx;
            position.y += velocity.dy;
        }
        Ok(members.len())
    }
}

/// Follows every entity holding [`Health`].
#[derive(Debug, Default)]
pub struct Healing;

impl System for Healing {}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StressReport {
    pub ticks: u64,
    pub spawned: u64,
    pub despawned: u64,
    pub toggles: u64,
    pub live: usize,
    pub movement_members: usize,
    pub healing_members: usize,
    pub movement_joined: u64,
    pub movement_left: u64,
    pub moved: u64,
    pub invariant_failures: u64,
}

/// Register the stress components, systems and resources on `coordinator`.
pub fn install(coordinator: &mut Coordinator) -> EcsResult<()> {
    coordinator.register_component::<Position>()?;
    coordinator.register_component::<Velocity>()?;
    coordinator.register_component::<Health>()?;

    coordinator.register_system(Movement::default())?;
    let movement: Signature = [
        coordinator.get_component_type::<Position>()?,
        coordinator.get_component_type::<Velocity>()?,
    ]
    .into_iter()
    .collect();
    coordinator.set_system_signature::<Movement>(movement);

    coordinator.register_system(Healing)?;
    let healing = Signature::new().with(coordinator.get_component_type::<Health>()?);
    coordinator.set_system_signature::<Healing>(healing);

    coordinator.register_resource_type::<Clock>();
    coordinator.insert_resource("main", Clock::default())?;
    Ok(())
}

/// Install the stress setup on a fresh `coordinator` and churn it for
/// `config.ticks` ticks.
pub fn run(config: &StressConfig, coordinator: &mut Coordinator) -> EcsResult<StressReport> {
    install(coordinator)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut report = StressReport::default();

    for tick in 0..config.ticks {
        spawn(config, coordinator, &mut rng, &mut report)?;
        churn(config, coordinator, &mut rng, &mut report)?;
        report.moved += Movement::update(coordinator)? as u64;

        if !membership_consistent::<Movement>(coordinator)?
            || !membership_consistent::<Healing>(coordinator)?
        {
            report.invariant_failures += 1;
        }
        if let Some(clock) = coordinator.get_resource::<Clock>("main")? {
            clock.borrow_mut().tick = tick + 1;
        }
        report.ticks += 1;
    }

    report.live = coordinator.living_entity_count();
    report.movement_members = coordinator.system_entities::<Movement>()?.len();
    report.healing_members = coordinator.system_entities::<Healing>()?.len();
    let movement = coordinator.system::<Movement>()?;
    report.movement_joined = movement.joined;
    report.movement_left = movement.left;
    tracing::info!(?report, "stress run finished");
    Ok(report)
}

/// `true` when `T`'s members are exactly the living entities matching its signature.
pub fn membership_consistent<T: System>(coordinator: &Coordinator) -> EcsResult<bool> {
    let required = coordinator.system_signature::<T>()?;
    let expected: BTreeSet<Entity> = coordinator
        .living_entities()
        .filter(|&entity| coordinator.signature(entity).contains_all(&required))
        .collect();
    Ok(&expected == coordinator.system_entities::<T>()?)
}

fn spawn(
    config: &StressConfig,
    coordinator: &mut Coordinator,
    rng: &mut ChaCha8Rng,
    report: &mut StressReport,
) -> EcsResult<()> {
    for _ in 0..config.spawn_per_tick {
        if coordinator.living_entity_count() >= config.max_live as usize {
            break;
        }
        let entity = coordinator.create_entity()?;
        coordinator.add_component(
            entity,
            Position {
                x: rng.gen_range(-100.0..100.0),
                y: rng.gen_range(-100.0..100.0),
            },
        )?;
        if rng.gen_bool(0.5) {
            coordinator.add_component(entity, random_velocity(rng))?;
        }
        if rng.gen_bool(0.5) {
            coordinator.add_component(entity, Health(rng.gen_range(1..100)))?;
        }
        report.spawned += 1;
    }
    Ok(())
}

fn churn(
    config: &StressConfig,
    coordinator: &mut Coordinator,
    rng: &mut ChaCha8Rng,
    report: &mut StressReport,
) -> EcsResult<()> {
    let living: Vec<Entity> = coordinator.living_entities().collect();
    for entity in living {
        if rng.gen_bool(config.component_toggle_chance) {
            if rng.gen_bool(0.5) {
                if coordinator.has_component::<Velocity>(entity)? {
                    coordinator.remove_component::<Velocity>(entity)?;
                } else {
                    coordinator.add_component(entity, random_velocity(rng))?;
                }
            } else if coordinator.has_component::<Health>(entity)? {
                coordinator.remove_component::<Health>(entity)?;
            } else {
                coordinator.add_component(entity, Health(rng.gen_range(1..100)))?;
            }
            report.toggles += 1;
        }
        if rng.gen_bool(config.despawn_chance) {
            coordinator.destroy_entity(entity);
            report.despawned += 1;
        }
    }
    Ok(())
}

fn random_velocity(rng: &mut ChaCha8Rng) -> Velocity {
    Velocity {
        dx: rng.gen_range(-1.0..1.0),
        dy: rng.gen_range(-1.0..1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> StressConfig {
        StressConfig {
            seed,
            ticks: 20,
            spawn_per_tick: 16,
            max_live: 200,
            ..StressConfig::default()
        }
    }

    #[test]
    fn test_run_is_deterministic() {
        let report_a = run(&small_config(3), &mut Coordinator::new()).unwrap();
        let report_b = run(&small_config(3), &mut Coordinator::new()).unwrap();

        assert_eq!(report_a, report_b);
        assert_eq!(report_a.ticks, 20);
        assert_eq!(report_a.invariant_failures, 0);
    }

    #[test]
    fn test_live_count_respects_cap() {
        let mut coordinator = Coordinator::new();
        let config = StressConfig {
            despawn_chance: 0.0,
            ..small_config(11)
        };
        let report = run(&config, &mut coordinator).unwrap();

        assert_eq!(report.live, 200);
        assert_eq!(report.spawned, 200);
        let clock = coordinator.get_resource::<Clock>("main").unwrap().unwrap();
        assert_eq!(clock.borrow().tick, 20);
    }

    #[test]
    fn test_movement_integrates_velocity() {
        let mut coordinator = Coordinator::new();
        install(&mut coordinator).unwrap();
        let entity = coordinator.create_entity().unwrap();
        coordinator.add_component(entity, Position { x: 0.0, y: 0.0 }).unwrap();
        coordinator.add_component(entity, Velocity { dx: 1.0, dy: -2.0 }).unwrap();

        assert_eq!(Movement::update(&mut coordinator).unwrap(), 1);
        assert_eq!(Movement::update(&mut coordinator).unwrap(), 1);
        assert_eq!(
            *coordinator.get_component::<Position>(entity).unwrap(),
            Position { x: 2.0, y: -4.0 }
        );
    }
}
