pub use super::factories::{EntityFactory, EventFactory, SpecFactory};

pub struct Factory;

impl Factory {
    pub fn event() -> EventFactory {
        EventFactory::new()
    }

    pub fn entity() -> EntityFactory {
        EntityFactory::new()
    }

    pub fn spec() -> SpecFactory {
        SpecFactory::new()
    }

    pub fn retention_spec() -> SpecFactory {
        SpecFactory::retention()
    }
}
