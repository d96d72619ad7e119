#![allow(dead_code)]

use sparse_ecs::prelude::*;

pub const ENTITIES_SMALL: usize = 1_000;
pub const ENTITIES_MED: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Health {
    pub value: f32,
}

pub fn populate(world: &World, count: usize) {
    for i in 0..count {
        let e = world.new_entity();
        e.add(Position {
            x: i as f32,
            y: 0.0,
        });
        e.add(Velocity { dx: 1.0, dy: 0.5 });
        if i % 2 == 0 {
            e.add(Health { value: 100.0 });
        }
    }
}
