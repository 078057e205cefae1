pub mod entity;
pub mod event;

#[cfg(test)]
mod event_tests;
