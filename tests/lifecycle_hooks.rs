use std::cell::RefCell;
use std::rc::Rc;

use sparse_ecs::World;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Tag {
    name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Marker(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Counter(u64);

#[test]
fn create_hook_sees_the_installed_payload() {
    let world = World::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let record = seen.clone();
    world.set_create_func::<Tag, _>(move |_, entity| {
        record.borrow_mut().push(entity.get::<Tag>().name);
    });

    world.new_entity().add(Tag { name: "X" });

    assert_eq!(*seen.borrow(), vec!["X"]);
}

#[test]
fn destroy_hook_fires_once_with_the_last_value() {
    let world = World::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let record = seen.clone();
    world.set_destroy_func::<Tag, _>(move |_, entity| {
        record.borrow_mut().push(entity.get::<Tag>().name);
    });

    let e = world.new_entity();
    e.add(Tag { name: "doomed" });
    e.get_mut::<Tag>().name = "final";
    e.destroy();

    assert_eq!(*seen.borrow(), vec!["final"]);
}

#[test]
fn destroy_hook_fires_on_component_removal() {
    let world = World::new();
    let fired = Rc::new(RefCell::new(0));

    let count = fired.clone();
    world.set_destroy_func::<Tag, _>(move |_, entity| {
        assert_eq!(entity.get::<Tag>().name, "still here");
        *count.borrow_mut() += 1;
    });

    let e = world.new_entity();
    e.add(Tag { name: "still here" });
    e.remove::<Tag>();

    assert_eq!(*fired.borrow(), 1);
    assert!(!e.has::<Tag>());
}

#[test]
fn destroy_hooks_fire_for_survivors_at_world_teardown() {
    let seen = Rc::new(RefCell::new(Vec::new()));

    {
        let world = World::new();
        let record = seen.clone();
        world.set_destroy_func::<Tag, _>(move |_, entity| {
            record.borrow_mut().push(entity.get::<Tag>().name);
        });

        world.new_entity().add(Tag { name: "a" });
        world.new_entity().add(Tag { name: "b" });
        world.new_entity().add(Tag { name: "c" });
    }

    // Teardown walks the pool in dense (insertion) order.
    assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn hooks_receive_the_owning_entity() {
    let world = World::new();
    let slots = Rc::new(RefCell::new(Vec::new()));

    let record = slots.clone();
    world.set_create_func::<Marker, _>(move |_, entity| {
        record.borrow_mut().push(entity.id());
    });

    let a = world.new_entity();
    let b = world.new_entity();
    b.add(Marker(0));
    a.add(Marker(1));

    assert_eq!(*slots.borrow(), vec![b.id(), a.id()]);
}

#[test]
fn later_registration_replaces_the_hook() {
    let world = World::new();
    let fired = Rc::new(RefCell::new((0, 0)));

    let first = fired.clone();
    world.set_create_func::<Tag, _>(move |_, _| {
        first.borrow_mut().0 += 1;
    });
    let second = fired.clone();
    world.set_create_func::<Tag, _>(move |_, _| {
        second.borrow_mut().1 += 1;
    });

    world.new_entity().add(Tag { name: "once" });

    assert_eq!(*fired.borrow(), (0, 1));
}

#[test]
fn create_hook_may_attach_other_components() {
    let world = World::new();

    world.set_create_func::<Tag, _>(move |_, entity| {
        entity.add(Marker(7));
    });

    let e = world.new_entity();
    e.add(Tag { name: "composite" });

    assert!(e.has::<Marker>());
    assert_eq!(*e.get::<Marker>(), Marker(7));
}

#[test]
fn destroy_hook_may_read_sibling_components() {
    let world = World::new();
    let totals = Rc::new(RefCell::new(0u64));

    let sum = totals.clone();
    world.set_destroy_func::<Tag, _>(move |_, entity| {
        if entity.has::<Counter>() {
            *sum.borrow_mut() += entity.get::<Counter>().0;
        }
    });

    let e = world.new_entity();
    e.add(Tag { name: "t" });
    e.add(Counter(40));
    let lone = world.new_entity();
    lone.add(Tag { name: "lone" });

    e.destroy();
    lone.destroy();

    assert_eq!(*totals.borrow(), 40);
}

#[test]
fn create_hook_may_spawn_entities() {
    let world = World::new();

    world.set_create_func::<Tag, _>(move |world, _| {
        world.new_entity().add(Marker(1));
    });

    world.new_entity().add(Tag { name: "leader" });

    assert_eq!(world.count(), 2);
    assert_eq!(world.pool_stats::<Marker>().map(|(n, _)| n), Some(1));
}
