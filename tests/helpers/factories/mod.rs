pub mod entity_factory;
pub mod event_factory;
pub mod spec_factory;

pub use entity_factory::EntityFactory;
pub use event_factory::EventFactory;
pub use spec_factory::SpecFactory;

#[cfg(test)]
mod entity_factory_test;
#[cfg(test)]
mod event_factory_test;
#[cfg(test)]
mod spec_factory_test;
