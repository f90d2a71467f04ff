//! One-shot actions fired after a delay.
//!
//! Targets are referenced by `Entity`, which carries a generation, so a
//! task never acts on a different entity that reused the same slot. A task
//! whose target is already gone is dropped.
use std::time::Duration;

use bevy::prelude::*;

use crate::components::{configure_sandbox_sets, SandboxSet};
use crate::effects::EffectDeactivated;

pub struct DeferredPlugin;

impl Plugin for DeferredPlugin {
    fn build(&self, app: &mut App) {
        configure_sandbox_sets(app);
        app.init_resource::<DeferredQueue>()
            .add_systems(Update, run_deferred_tasks_system.in_set(SandboxSet::Cleanup));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    Despawn,
    DeactivateEffect,
}

#[derive(Debug)]
struct DeferredTask {
    timer: Timer,
    target: Entity,
    action: DeferredAction,
}

#[derive(Resource, Debug, Default)]
pub struct DeferredQueue {
    tasks: Vec<DeferredTask>,
}

impl DeferredQueue {
    pub fn schedule(&mut self, delay_secs: f32, target: Entity, action: DeferredAction) {
        self.tasks.push(DeferredTask {
            timer: Timer::from_seconds(delay_secs.max(0.), TimerMode::Once),
            target,
            action,
        });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Advances timers of all tasks and removes the due ones from the queue.
    pub fn tick(&mut self, delta: Duration) -> Vec<(Entity, DeferredAction)> {
        let mut due = Vec::new();
        self.tasks.retain_mut(|task| {
            if task.timer.tick(delta).finished() {
                due.push((task.target, task.action));
                false
            } else {
                true
            }
        });
        due
    }
}

fn run_deferred_tasks_system(
    mut commands: Commands,
    time: Res<Time>,
    mut queue: ResMut<DeferredQueue>,
) {
    for (target, action) in queue.tick(time.delta()) {
        let Some(mut entity_commands) = commands.get_entity(target) else {
            debug!("Skip {:?} of entity {:?} which is already removed", action, target);
            continue;
        };
        match action {
            DeferredAction::Despawn => entity_commands.despawn_recursive(),
            DeferredAction::DeactivateEffect => {
                entity_commands.insert(EffectDeactivated);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::headless_app;

    #[test]
    fn test_tick_returns_due_tasks_once() {
        let mut queue = DeferredQueue::default();
        let entity = Entity::from_raw(7);
        queue.schedule(1.0, entity, DeferredAction::Despawn);
        queue.schedule(2.0, entity, DeferredAction::DeactivateEffect);

        assert!(queue.tick(Duration::from_millis(500)).is_empty());
        assert_eq!(
            queue.tick(Duration::from_millis(600)),
            vec![(entity, DeferredAction::Despawn)]
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.tick(Duration::from_secs(1)),
            vec![(entity, DeferredAction::DeactivateEffect)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_despawn_after_delay() {
        let mut app = headless_app(Duration::from_millis(100));
        app.add_plugins(DeferredPlugin);
        let entity = app.world.spawn_empty().id();
        app.world
            .resource_mut::<DeferredQueue>()
            .schedule(0.5, entity, DeferredAction::Despawn);

        app.update();
        app.update();
        assert!(app.world.get_entity(entity).is_some());

        for _ in 0..5 {
            app.update();
        }
        assert!(app.world.get_entity(entity).is_none());
        assert!(app.world.resource::<DeferredQueue>().is_empty());
    }

    #[test]
    fn test_removed_target_is_skipped() {
        let mut app = headless_app(Duration::from_millis(100));
        app.add_plugins(DeferredPlugin);
        let entity = app.world.spawn_empty().id();
        app.world
            .resource_mut::<DeferredQueue>()
            .schedule(0.2, entity, DeferredAction::DeactivateEffect);
        app.world.despawn(entity);
        // Slot of removed entity may be reused by a new one
        let other = app.world.spawn_empty().id();

        for _ in 0..5 {
            app.update();
        }
        assert!(app.world.resource::<DeferredQueue>().is_empty());
        assert!(app.world.get::<EffectDeactivated>(other).is_none());
    }
}
