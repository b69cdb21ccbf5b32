use std::fmt;

/// Kind of named entity extracted from article text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Event,
    Product,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Person => write!(f, "PERSON"),
            EntityType::Organization => write!(f, "ORGANIZATION"),
            EntityType::Location => write!(f, "LOCATION"),
            EntityType::Event => write!(f, "EVENT"),
            EntityType::Product => write!(f, "PRODUCT"),
        }
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PERSON" => EntityType::Person,
            "ORGANIZATION" => EntityType::Organization,
            "LOCATION" => EntityType::Location,
            "EVENT" => EntityType::Event,
            "PRODUCT" => EntityType::Product,
            _ => EntityType::Location,
        }
    }
}

/// How central an entity is to the article it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceLevel {
    Primary,
    Secondary,
    Mentioned,
}

impl fmt::Display for ImportanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportanceLevel::Primary => write!(f, "PRIMARY"),
            ImportanceLevel::Secondary => write!(f, "SECONDARY"),
            ImportanceLevel::Mentioned => write!(f, "MENTIONED"),
        }
    }
}

impl From<&str> for ImportanceLevel {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PRIMARY" => ImportanceLevel::Primary,
            "SECONDARY" => ImportanceLevel::Secondary,
            _ => ImportanceLevel::Mentioned,
        }
    }
}

/// A named entity as found in a specific piece of text, already
/// canonicalized (aliases resolved) by the time it reaches the clusterer.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub normalized_name: String,
    pub entity_type: EntityType,
    pub importance: ImportanceLevel,
}

impl Entity {
    pub fn new(name: &str, normalized_name: &str, entity_type: EntityType) -> Self {
        Entity {
            name: name.to_string(),
            normalized_name: normalized_name.to_string(),
            entity_type,
            importance: ImportanceLevel::Mentioned,
        }
    }

    pub fn with_importance(mut self, importance: ImportanceLevel) -> Self {
        self.importance = importance;
        self
    }
}

/// All entities found in one text, grouped for the clusterer's overlap signals.
#[derive(Debug, Clone, Default)]
pub struct ExtractedEntities {
    pub entities: Vec<Entity>,
}

impl ExtractedEntities {
    pub fn by_type(&self, t: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.entity_type == t)
    }

    pub fn normalized_names_by_type(&self, t: EntityType) -> std::collections::HashSet<String> {
        self.by_type(t).map(|e| e.normalized_name.clone()).collect()
    }
}
