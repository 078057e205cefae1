pub mod event;

pub use event::entity::Entity;
pub use event::event::Event;
