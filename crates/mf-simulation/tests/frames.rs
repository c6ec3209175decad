//! Integration tests for simulation frames.

use std::time::Duration;

use mf_core::component::Position;
use mf_core::kind::Monster;
use mf_core::{World, WorldConfig};
use mf_simulation::{MovementSystem, Scheduler, SchedulerConfig, SimError};
use proptest::prelude::*;

fn moving_world() -> (Scheduler, mf_core::EntityId) {
    let mut world = World::with_config(WorldConfig::new("frames"));
    world.create_system(MovementSystem::new());
    let monster = world
        .create_entity(Monster::at(0.0, 0.0).with_velocity(3.0, 0.0))
        .unwrap();
    (
        Scheduler::new(world, SchedulerConfig::default()).unwrap(),
        monster,
    )
}

#[test]
fn three_frames_of_twenty_ms() {
    let (mut s, _) = moving_world();
    let steps: Vec<u64> = (0..3)
        .map(|_| s.frame_secs(0.02).unwrap().logic_steps)
        .collect();
    assert_eq!(steps, vec![0, 1, 0]);
    assert_eq!(s.clock().logic_frame(), 1);
    assert!((s.clock().bank_secs() - 0.026_666_667).abs() < 1e-6);
}

#[test]
fn one_second_at_sixty_fps() {
    let (mut s, _) = moving_world();
    let frame = Duration::from_nanos(16_666_667);
    let mut logic = 0;
    for _ in 0..60 {
        logic += s.frame(frame).unwrap().logic_steps;
    }
    assert_eq!(logic, 30);
    assert_eq!(s.fps(), 60);
    assert_eq!(s.render_frames(), 60);
}

#[test]
fn float_deltas_stay_within_a_step_of_exact() {
    let (mut s, _) = moving_world();
    for _ in 0..60 {
        s.frame_secs(1.0 / 60.0).unwrap();
    }
    assert!((29..=30).contains(&s.clock().logic_frame()));
}

#[test]
fn movement_is_frame_rate_independent() {
    let (mut fast, a) = moving_world();
    let (mut slow, b) = moving_world();
    for _ in 0..120 {
        fast.frame(Duration::from_nanos(8_333_334)).unwrap();
    }
    for _ in 0..10 {
        slow.frame(Duration::from_millis(100)).unwrap();
    }
    assert_eq!(fast.clock().logic_frame(), slow.clock().logic_frame());
    assert_eq!(
        fast.world().component::<Position>(a),
        slow.world().component::<Position>(b)
    );
}

#[test]
fn stop_tears_the_world_down() {
    let (mut s, monster) = moving_world();
    s.frame(Duration::from_millis(50)).unwrap();
    s.stop();
    assert!(s.world().entity(monster).is_none());
    assert_eq!(s.world().pool_stats().outstanding, 0);
    assert!(matches!(s.frame_secs(0.016), Err(SimError::Stopped)));
}

proptest! {
    #[test]
    fn logic_steps_match_total_banked_time(
        deltas in proptest::collection::vec(0u64..100_000_000, 1..50),
    ) {
        let (mut s, _) = moving_world();
        let mut steps = 0;
        for &d in &deltas {
            steps += s.frame(Duration::from_nanos(d)).unwrap().logic_steps;
        }
        let total: u64 = deltas.iter().sum();
        prop_assert_eq!(steps, total / 33_333_333);
        prop_assert_eq!(s.clock().banked(), Duration::from_nanos(total % 33_333_333));
    }
}
