use std::collections::HashMap;

use warren::{prelude::*, storage::ComponentTypeId};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pos(f32, f32, f32);
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rot(f32, f32, f32);
#[derive(Clone, Copy, Debug, PartialEq)]
struct Vel(f32, f32, f32);
#[derive(Clone, Copy, Debug, PartialEq)]
struct Static;

/// Builds the three entity world used by most tests:
/// `#1 {Pos}`, `#2 {Pos, Vel}`, `#3 {Vel}`.
fn pos_vel_world() -> (World, [Entity; 3]) {
    let mut world = World::default();
    let a = world.spawn();
    let b = world.spawn();
    let c = world.spawn();
    world.add_component(a, Pos(1., 1., 1.)).unwrap();
    world.add_component(b, Pos(2., 2., 2.)).unwrap();
    world.add_component(b, Vel(0.5, 0.5, 0.5)).unwrap();
    world.add_component(c, Vel(3., 3., 3.)).unwrap();
    (world, [a, b, c])
}

#[test]
fn query_read_entity_data() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut world, [a, b, _]) = pos_vel_world();
    let query = world.query::<(Entity, &Pos)>().build().unwrap();

    let mut seen = HashMap::new();
    query
        .guard(&world)
        .unwrap()
        .for_each(|(entity, pos)| {
            seen.insert(*entity, *pos);
        });

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[&a], Pos(1., 1., 1.));
    assert_eq!(seen[&b], Pos(2., 2., 2.));
}

#[test]
fn query_intersection_matches_one() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut world, [a, b, c]) = pos_vel_world();
    let pos = world.query::<&Pos>().build().unwrap();
    let both = world.query::<(Entity, &Pos, &Vel)>().build().unwrap();

    assert_eq!(pos.count(&world), Ok(2));
    assert_eq!(both.count(&world), Ok(1));
    assert_eq!(both.contains(&world, b), Ok(true));
    assert_eq!(both.contains(&world, a), Ok(false));
    assert_eq!(both.contains(&world, c), Ok(false));

    let mut entities = Vec::new();
    both.guard(&world)
        .unwrap()
        .for_each(|(entity, _, _)| entities.push(*entity));
    assert_eq!(entities, vec![b]);
}

#[test]
fn query_write_entity_data() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut world, [_, b, _]) = pos_vel_world();
    let query = world.query::<(&mut Pos, &Vel)>().build().unwrap();

    query.guard(&world).unwrap().for_each(|(pos, vel)| {
        pos.0 += vel.0;
        pos.1 += vel.1;
        pos.2 += vel.2;
    });

    assert_eq!(*world.get_component::<Pos>(b).unwrap(), Pos(2.5, 2.5, 2.5));
}

#[test]
fn query_filters() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut world, [a, b, _]) = pos_vel_world();
    world.add_component(a, Static).unwrap();

    let moving = world.query::<(Entity, &Pos)>().without::<Static>().build().unwrap();
    let fixed = world.query::<(Entity, &Pos)>().with::<Static>().build().unwrap();

    let mut found = Vec::new();
    moving
        .guard(&world)
        .unwrap()
        .for_each(|(entity, _)| found.push(*entity));
    assert_eq!(found, vec![b]);

    found.clear();
    fixed
        .guard(&world)
        .unwrap()
        .for_each(|(entity, _)| found.push(*entity));
    assert_eq!(found, vec![a]);
}

#[test]
fn query_sees_archetypes_created_later() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut world = World::default();
    let before = world.query::<(&Pos, &Vel)>().build().unwrap();
    assert_eq!(before.count(&world), Ok(0));

    let e = world.spawn();
    world.add_component(e, Vel(0., 0., 0.)).unwrap();
    world.add_component(e, Pos(0., 0., 0.)).unwrap();
    world.add_component(e, Rot(0., 0., 0.)).unwrap();
    let f = world.spawn();
    world.add_component(f, Pos(0., 0., 0.)).unwrap();
    world.add_component(f, Vel(0., 0., 0.)).unwrap();

    let after = world.query::<(&Pos, &Vel)>().build().unwrap();
    assert_eq!(before.count(&world), Ok(2));
    assert_eq!(after.count(&world), Ok(2));

    let mut a = before.archetypes();
    let mut b = after.archetypes();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn query_cache_is_shared() {
    let (mut world, _) = pos_vel_world();
    let first = world.query::<&Pos>().build().unwrap();
    let second = world.query::<&mut Pos>().build().unwrap();
    assert_eq!(first.filter(), second.filter());
    assert_eq!(first.archetypes(), second.archetypes());
}

#[test]
fn query_sees_modifications_between_runs() {
    let (mut world, [a, _, c]) = pos_vel_world();
    let query = world.query::<(&Pos, &Vel)>().build().unwrap();
    assert_eq!(query.count(&world), Ok(1));

    world.add_component(a, Vel(0., 0., 0.)).unwrap();
    world.add_component(c, Pos(0., 0., 0.)).unwrap();
    assert_eq!(query.count(&world), Ok(3));

    world.despawn(a).unwrap();
    assert_eq!(query.count(&world), Ok(2));
}

#[test]
fn query_conflicting_access_rejected() {
    let mut world = World::default();
    assert_eq!(
        world.query::<(&mut Pos, &Pos)>().build().map(|_| ()),
        Err(WorldError::ConflictingAccess(ComponentTypeId::of::<Pos>()))
    );
    assert!(world.query::<(&Pos, &Pos)>().build().is_ok());
}

#[test]
fn query_guard_conflicts() {
    let (mut world, _) = pos_vel_world();
    let writer = world.query::<&mut Pos>().build().unwrap();
    let reader = world.query::<&Pos>().build().unwrap();
    let other = world.query::<&Vel>().build().unwrap();

    let guard = writer.guard(&world).unwrap();
    assert!(world.is_locked());
    assert_eq!(
        reader.guard(&world).map(|_| ()),
        Err(WorldError::ComponentBorrowed(ComponentTypeId::of::<Pos>()))
    );
    assert!(other.guard(&world).is_ok());
    drop(guard);

    assert!(!world.is_locked());
    let first = reader.guard(&world).unwrap();
    let second = reader.guard(&world).unwrap();
    assert_eq!(first.len(), second.len());
}

#[test]
fn query_disposal() {
    let _ = tracing_subscriber::fmt::try_init();

    let (mut world, _) = pos_vel_world();
    let mut query = world.query::<&Pos>().build().unwrap();
    let shared = query.clone();

    query.dispose();
    assert_eq!(query.count(&world), Err(WorldError::Disposed));
    assert_eq!(query.guard(&world).map(|_| ()), Err(WorldError::Disposed));
    assert_eq!(shared.count(&world), Ok(2));

    let other = World::default();
    world.dispose();
    assert_eq!(shared.count(&other), Err(WorldError::Disposed));
    assert_eq!(shared.assert_not_disposed(), Err(WorldError::Disposed));
}

#[test]
fn query_rejects_other_world() {
    let (mut world, _) = pos_vel_world();
    let (other, [a, ..]) = pos_vel_world();
    let query = world.query::<&Pos>().build().unwrap();
    assert_eq!(query.count(&other), Err(WorldError::WorldMismatch));
    assert_eq!(query.contains(&other, a), Err(WorldError::WorldMismatch));
}

#[test]
fn query_contains_stale_entity() {
    let (mut world, [a, ..]) = pos_vel_world();
    let query = world.query::<&Pos>().build().unwrap();
    world.despawn(a).unwrap();
    assert_eq!(query.contains(&world, a), Err(WorldError::InvalidEntity(a)));
}

#[test]
fn query_for_each_with_uniform() {
    let (mut world, [a, b, _]) = pos_vel_world();
    let query = world.query::<&mut Pos>().build().unwrap();
    query
        .guard(&world)
        .unwrap()
        .for_each_with(2.0f32, |pos, scale| pos.0 *= scale);
    assert_eq!(world.get_component::<Pos>(a).unwrap().0, 2.);
    assert_eq!(world.get_component::<Pos>(b).unwrap().0, 4.);
}

#[test]
fn query_try_for_each_stops() {
    let mut world = World::default();
    for i in 0..10 {
        let e = world.spawn();
        world.add_component(e, i as u32).unwrap();
    }
    let query = world.query::<&u32>().build().unwrap();

    let mut visited = 0;
    let result = query.guard(&world).unwrap().try_for_each(|n| {
        visited += 1;
        if *n == 4 {
            Err(*n)
        } else {
            Ok(())
        }
    });
    assert_eq!(result, Err(4));
    assert_eq!(visited, 5);
}

#[test]
fn query_entity_only() {
    let (mut world, entities) = pos_vel_world();
    let query = world.query::<Entity>().build().unwrap();
    let mut all = Vec::new();
    query
        .guard(&world)
        .unwrap()
        .for_each(|entity| all.push(*entity));
    all.sort_by_key(|e| e.index());
    assert_eq!(all, entities.to_vec());
}

#[derive(Debug, PartialEq)]
struct Likes(u32);

#[test]
fn query_wildcard_relation_joins() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut world = World::default();
    let alice = world.spawn();
    let bob = world.spawn();
    let carol = world.spawn();
    world.add_relation(carol, alice, Likes(1)).unwrap();
    world.add_relation(carol, bob, Likes(2)).unwrap();

    let query = world
        .query::<(Entity, &Likes)>()
        .matching::<Likes>(Target::AnyEntity)
        .build()
        .unwrap();

    let mut guard = query.guard(&world).unwrap();
    assert_eq!(guard.join_count(), 2);
    assert_eq!(guard.len(), 2);

    let mut values = Vec::new();
    guard.for_each(|(entity, likes)| {
        assert_eq!(*entity, carol);
        values.push(likes.0);
    });
    values.sort();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn query_specific_relation_target() {
    let mut world = World::default();
    let alice = world.spawn();
    let bob = world.spawn();
    let x = world.spawn();
    let y = world.spawn();
    world.add_relation(x, alice, Likes(1)).unwrap();
    world.add_relation(y, bob, Likes(2)).unwrap();

    let query = world
        .query::<(Entity, &Likes)>()
        .matching::<Likes>(Target::Entity(bob))
        .build()
        .unwrap();
    let mut found = Vec::new();
    query
        .guard(&world)
        .unwrap()
        .for_each(|(entity, likes)| found.push((*entity, likes.0)));
    assert_eq!(found, vec![(y, 2)]);

    let loners = world
        .query::<Entity>()
        .without_relation::<Likes>(Target::AnyEntity)
        .build()
        .unwrap();
    assert_eq!(loners.count(&world), Ok(2));

    let fans = world
        .query::<Entity>()
        .with_relation::<Likes>(Target::Entity(alice))
        .build()
        .unwrap();
    assert_eq!(fans.contains(&world, x), Ok(true));
    assert_eq!(fans.contains(&world, y), Ok(false));
}

#[test]
fn query_wildcard_write() {
    let mut world = World::default();
    let alice = world.spawn();
    let bob = world.spawn();
    let carol = world.spawn();
    world.add_component(carol, Pos(0., 0., 0.)).unwrap();
    world.add_relation(carol, alice, Likes(1)).unwrap();
    world.add_relation(carol, bob, Likes(2)).unwrap();

    let query = world
        .query::<(&Pos, &mut Likes)>()
        .matching::<Likes>(Target::AnyEntity)
        .build()
        .unwrap();
    query.guard(&world).unwrap().for_each(|(_, likes)| likes.0 *= 10);

    assert_eq!(world.get_relation::<Likes>(carol, alice).unwrap().0, 10);
    assert_eq!(world.get_relation::<Likes>(carol, bob).unwrap().0, 20);

    assert!(world
        .query::<(&mut Pos, &Likes)>()
        .matching::<Likes>(Target::AnyEntity)
        .build()
        .is_err());
}

#[test]
fn despawn_target_updates_wildcard_queries() {
    let mut world = World::default();
    let alice = world.spawn();
    let bob = world.spawn();
    let carol = world.spawn();
    world.add_relation(carol, alice, Likes(1)).unwrap();
    world.add_relation(carol, bob, Likes(2)).unwrap();

    let query = world
        .query::<&Likes>()
        .matching::<Likes>(Target::AnyEntity)
        .build()
        .unwrap();
    world.despawn(alice).unwrap();

    let mut values = Vec::new();
    query.guard(&world).unwrap().for_each(|likes| values.push(likes.0));
    assert_eq!(values, vec![2]);
}

#[test]
fn consistency_check_during_write_dispatch() {
    let (mut world, _) = pos_vel_world();
    let query = world.query::<&mut Pos>().build().unwrap();

    let mut checked = 0;
    query.guard(&world).unwrap().for_each(|pos| {
        pos.0 += 1.;
        assert!(world.archetypes().iter().all(|a| a.is_consistent()));
        checked += 1;
    });
    assert_eq!(checked, 2);
}
