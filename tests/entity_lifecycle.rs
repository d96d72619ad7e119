use sparse_ecs::{make_handle, Entity, World, NULL_HANDLE};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Health(u32);

#[test]
fn new_entities_are_live_and_counted() {
    let world = World::new();
    assert_eq!(world.count(), 0);

    let a = world.new_entity();
    let b = world.new_entity();

    assert!(a.valid());
    assert!(b.valid());
    assert_eq!(world.count(), 2);

    assert_eq!(a.id(), 0);
    assert_eq!(b.id(), 1);
    assert_eq!(a.version(), 0);
    assert_eq!(b.version(), 0);
}

#[test]
fn handle_packs_version_above_slot() {
    let world = World::new();
    let e = world.new_entity();

    assert_eq!(e.handle(), make_handle(e.id(), e.version()));
    assert_eq!(e.handle(), ((e.version() as u64) << 32) | e.id() as u64);
}

#[test]
fn at_reflects_the_identity_table() {
    let world = World::new();
    let a = world.new_entity();
    let b = world.new_entity();

    assert_eq!(world.at(0), a);
    assert_eq!(world.at(1), b);

    b.destroy();
    // The slot now holds a free-list node, not a live entity.
    assert!(!world.at(1).valid());
    assert!(world.at(0).valid());
}

#[test]
fn destroy_invalidates_every_copy_of_the_handle() {
    let world = World::new();
    let e = world.new_entity();
    let copy = e;

    e.destroy();

    assert!(!copy.valid());
    assert_eq!(world.count(), 0);
}

#[test]
fn recycling_reuses_most_recently_freed_slot() {
    let world = World::new();
    let entities: Vec<_> = (0..10).map(|_| world.new_entity()).collect();

    let stale = entities[4];
    stale.destroy();

    let recycled = world.new_entity();
    assert_eq!(recycled.id(), 4);
    assert_eq!(recycled.version(), 1);

    // The stale handle stays invalid even though the slot is live again.
    assert!(!stale.valid());
    assert!(recycled.valid());
}

#[test]
fn free_list_is_lifo_across_several_destroys() {
    let world = World::new();
    let entities: Vec<_> = (0..6).map(|_| world.new_entity()).collect();

    entities[1].destroy();
    entities[3].destroy();
    entities[5].destroy();

    assert_eq!(world.new_entity().id(), 5);
    assert_eq!(world.new_entity().id(), 3);
    assert_eq!(world.new_entity().id(), 1);
    // Free list exhausted; the next entity takes a fresh slot.
    assert_eq!(world.new_entity().id(), 6);
}

#[test]
fn spawn_destroy_pair_leaves_count_unchanged() {
    let world = World::new();
    world.new_entity();
    let before = world.count();

    let e = world.new_entity();
    e.destroy();

    assert_eq!(world.count(), before);
}

#[test]
fn count_matches_validity_over_the_table() {
    let world = World::new();
    let entities: Vec<_> = (0..8).map(|_| world.new_entity()).collect();
    entities[0].destroy();
    entities[7].destroy();
    entities[3].destroy();

    let live = (0..8).filter(|&i| world.at(i).valid()).count() as u64;
    assert_eq!(world.count(), live);
    assert_eq!(live, 5);
}

#[test]
fn add_then_get_roundtrips() {
    let world = World::new();
    let e = world.new_entity();

    e.add(Position { x: 1.5, y: -2.0 });

    assert!(e.has::<Position>());
    assert_eq!(*e.get::<Position>(), Position { x: 1.5, y: -2.0 });
}

#[test]
fn get_mut_writes_through() {
    let world = World::new();
    let e = world.new_entity();
    e.add(Health(10));

    e.get_mut::<Health>().0 = 42;

    assert_eq!(*e.get::<Health>(), Health(42));
}

#[test]
fn remove_then_readd_succeeds() {
    let world = World::new();
    let e = world.new_entity();

    e.add(Health(1));
    e.remove::<Health>();
    assert!(!e.has::<Health>());

    e.add(Health(2));
    assert_eq!(*e.get::<Health>(), Health(2));
}

#[test]
fn remove_preserves_other_entities_payloads() {
    let world = World::new();
    let entities: Vec<_> = (0..16).map(|_| world.new_entity()).collect();
    for (i, e) in entities.iter().enumerate() {
        e.add(Health(i as u32));
    }

    entities[5].remove::<Health>();

    assert!(!entities[5].has::<Health>());
    for (i, e) in entities.iter().enumerate() {
        if i == 5 {
            continue;
        }
        assert!(e.has::<Health>());
        assert_eq!(*e.get::<Health>(), Health(i as u32));
    }
}

#[test]
fn destroy_removes_all_components() {
    let world = World::new();
    let keeper = world.new_entity();
    keeper.add(Position { x: 9.0, y: 9.0 });
    keeper.add(Health(7));

    let victim = world.new_entity();
    victim.add(Position { x: 1.0, y: 2.0 });
    victim.add(Health(3));
    victim.destroy();

    // The survivor's payloads are untouched by the swap-and-pop.
    assert_eq!(*keeper.get::<Position>(), Position { x: 9.0, y: 9.0 });
    assert_eq!(*keeper.get::<Health>(), Health(7));
}

#[test]
fn null_entity_is_never_valid() {
    let null = Entity::null();
    assert!(!null.valid());
    assert_eq!(null.handle(), NULL_HANDLE);
    assert!(null.world().is_none());
}

#[test]
fn equality_requires_same_world() {
    let world_a = World::new();
    let world_b = World::new();

    let a = world_a.new_entity();
    let b = world_b.new_entity();

    // Same slot and version, different registries.
    assert_eq!(a.handle(), b.handle());
    assert_ne!(a, b);
    assert_eq!(a, world_a.at(0));
    assert_eq!(Entity::null(), Entity::null());
}

#[test]
#[should_panic(expected = "already has component")]
fn duplicate_add_is_a_contract_violation() {
    let world = World::new();
    let e = world.new_entity();
    e.add(Health(1));
    e.add(Health(2));
}

#[test]
#[should_panic(expected = "does not have component")]
fn get_without_component_is_a_contract_violation() {
    let world = World::new();
    let e = world.new_entity();
    e.get::<Position>();
}

#[test]
#[should_panic(expected = "does not have component")]
fn remove_without_component_is_a_contract_violation() {
    let world = World::new();
    let e = world.new_entity();
    e.remove::<Position>();
}

#[test]
#[should_panic(expected = "invalid entity handle")]
fn operating_on_a_destroyed_entity_is_a_contract_violation() {
    let world = World::new();
    let e = world.new_entity();
    e.destroy();
    e.has::<Position>();
}
