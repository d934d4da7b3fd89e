//! Built-in feature actions and the factory content loads them through.

mod add_components;
mod factory;

pub use add_components::{AddComponentsAction, ComponentEntry};
pub use factory::BuiltinActionFactory;
