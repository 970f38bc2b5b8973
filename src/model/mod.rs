pub mod element;
pub mod property;
pub mod scene;

pub use element::{Element, ElementRef, ElementSummary};
pub use property::{Property, PropertySet, PropertyValue};
pub use scene::{ContainedObjects, SceneGraph, BUILDING_TYPE, SPACE_TYPE, STOREY_TYPE};
