pub mod aliases;
pub mod extraction;
pub mod types;

pub use aliases::canonicalize;
pub use extraction::{event_set, extract_entities, location_set, named_entity_set};
pub use types::{Entity, EntityType, ExtractedEntities, ImportanceLevel};

pub const TARGET_ENTITY: &str = "entity";
