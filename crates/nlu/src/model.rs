use serde::{Deserialize, Serialize};

/// A named NLU entity (intent, slot type, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluEntity {
    pub id: String,
    pub name: String,
    /// Scoring weight; unset means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_id: Option<String>,
    #[serde(default)]
    pub lookups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl NluEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight: None,
            foreign_id: None,
            lookups: vec!["keywords".into()],
            doc: None,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub fn with_foreign_id(mut self, foreign_id: impl Into<String>) -> Self {
        self.foreign_id = Some(foreign_id.into());
        self
    }
}

/// One value of an entity, with its training expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluValue {
    pub id: String,
    pub entity_id: String,
    pub value: String,
    #[serde(default)]
    pub expressions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_id: Option<String>,
}

impl NluValue {
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            value: value.into(),
            expressions: Vec::new(),
            foreign_id: None,
        }
    }

    #[must_use]
    pub fn with_foreign_id(mut self, foreign_id: impl Into<String>) -> Self {
        self.foreign_id = Some(foreign_id.into());
        self
    }
}

/// A value joined with its owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedValue {
    #[serde(flatten)]
    pub value: NluValue,
    pub entity: NluEntity,
}

/// Entity detected by the provider during inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEntity {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub confidence: f64,
}

impl ParsedEntity {
    pub fn new(entity: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity: entity.into(),
            value: None,
            confidence,
        }
    }
}

/// [`ParsedEntity`] plus `score = confidence * weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    #[serde(flatten)]
    pub parsed: ParsedEntity,
    pub score: f64,
}
