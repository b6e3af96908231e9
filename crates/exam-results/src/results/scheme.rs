use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::ComponentKey;

/// One bounded sub-score of a subject, or an aggregate derived from other components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringComponent {
    pub key: ComponentKey,
    pub label: String,
    pub kind: ComponentKind,
}

/// Input components are entered by staff; computed components are the sum of their declared
/// input sources and are never entered directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    Input { max: f64 },
    Computed { sources: Vec<ComponentKey> },
}

impl ScoringComponent {
    pub fn input(key: &str, label: &str, max: f64) -> Self {
        Self {
            key: ComponentKey::from(key),
            label: label.to_string(),
            kind: ComponentKind::Input { max },
        }
    }

    pub fn computed(key: &str, label: &str, sources: &[&str]) -> Self {
        Self {
            key: ComponentKey::from(key),
            label: label.to_string(),
            kind: ComponentKind::Computed {
                sources: sources.iter().map(|source| ComponentKey::from(*source)).collect(),
            },
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.kind, ComponentKind::Computed { .. })
    }

    /// Entered maximum; `None` for computed components.
    pub fn max(&self) -> Option<f64> {
        match self.kind {
            ComponentKind::Input { max } => Some(max),
            ComponentKind::Computed { .. } => None,
        }
    }

    pub fn sources(&self) -> &[ComponentKey] {
        match &self.kind {
            ComponentKind::Input { .. } => &[],
            ComponentKind::Computed { sources } => sources,
        }
    }
}

/// Ordered components of a subject plus the structural designation of its total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringScheme {
    pub components: Vec<ScoringComponent>,
    /// Computed component whose value is the subject total. Without one, the subject total is
    /// the sum of the input components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<ComponentKey>,
}

impl ScoringScheme {
    pub fn new(components: Vec<ScoringComponent>) -> Self {
        Self {
            components,
            total: None,
        }
    }

    pub fn with_total(mut self, key: &str) -> Self {
        self.total = Some(ComponentKey::from(key));
        self
    }

    /// Written + continuous evaluation scheme with a derived total (`W`, `CE`, `T`).
    pub fn written_and_ce(written_max: f64, ce_max: f64) -> Self {
        Self::new(vec![
            ScoringComponent::input("W", "Written", written_max),
            ScoringComponent::input("CE", "CE", ce_max),
            ScoringComponent::computed("T", "Total", &["W", "CE"]),
        ])
        .with_total("T")
    }

    pub fn component(&self, key: &ComponentKey) -> Option<&ScoringComponent> {
        self.components.iter().find(|component| &component.key == key)
    }

    pub fn input_components(&self) -> impl Iterator<Item = &ScoringComponent> {
        self.components
            .iter()
            .filter(|component| !component.is_computed())
    }

    pub fn computed_components(&self) -> impl Iterator<Item = &ScoringComponent> {
        self.components
            .iter()
            .filter(|component| component.is_computed())
    }

    /// Sum of the maxima of every input component; the subject's share of the batch maximum.
    pub fn max_total(&self) -> f64 {
        self.input_components()
            .filter_map(ScoringComponent::max)
            .sum()
    }

    /// Maximum of a component. Computed components take the sum of their sources' maxima.
    pub fn effective_max(&self, key: &ComponentKey) -> Option<f64> {
        let component = self.component(key)?;
        match &component.kind {
            ComponentKind::Input { max } => Some(*max),
            ComponentKind::Computed { sources } => Some(
                sources
                    .iter()
                    .filter_map(|source| self.component(source).and_then(ScoringComponent::max))
                    .sum(),
            ),
        }
    }

    /// Maximum of the subject total as reported on result cards.
    pub fn total_max(&self) -> f64 {
        self.total
            .as_ref()
            .and_then(|key| self.effective_max(key))
            .unwrap_or_else(|| self.max_total())
    }

    pub fn validate(&self) -> Result<(), SchemeError> {
        let mut seen = HashSet::new();
        let mut has_input = false;

        for component in &self.components {
            if !seen.insert(&component.key) {
                return Err(SchemeError::DuplicateKey(component.key.clone()));
            }
            if let ComponentKind::Input { max } = component.kind {
                if !max.is_finite() || max < 0.0 {
                    return Err(SchemeError::InvalidMax {
                        component: component.key.clone(),
                        max,
                    });
                }
                has_input = true;
            }
        }

        if !has_input {
            return Err(SchemeError::NoInputComponents);
        }

        for component in self.computed_components() {
            let sources = component.sources();
            if sources.is_empty() {
                return Err(SchemeError::EmptySources(component.key.clone()));
            }

            let mut seen_sources = HashSet::new();
            for source in sources {
                if !seen_sources.insert(source) {
                    return Err(SchemeError::DuplicateSource {
                        component: component.key.clone(),
                        dependency: source.clone(),
                    });
                }
                match self.component(source) {
                    Some(found) if !found.is_computed() => {}
                    Some(_) => {
                        return Err(SchemeError::SourceNotInput {
                            component: component.key.clone(),
                            dependency: source.clone(),
                        })
                    }
                    None => {
                        return Err(SchemeError::UnknownSource {
                            component: component.key.clone(),
                            dependency: source.clone(),
                        })
                    }
                }
            }
        }

        if let Some(total) = &self.total {
            match self.component(total) {
                Some(found) if found.is_computed() => {}
                Some(_) => return Err(SchemeError::TotalNotComputed(total.clone())),
                None => return Err(SchemeError::UnknownTotal(total.clone())),
            }
        }

        Ok(())
    }
}

/// Structural defect in a scoring scheme.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemeError {
    #[error("scheme declares no input components")]
    NoInputComponents,
    #[error("component key {0} is declared more than once")]
    DuplicateKey(ComponentKey),
    #[error("component {component} has invalid max {max}")]
    InvalidMax { component: ComponentKey, max: f64 },
    #[error("computed component {0} declares no sources")]
    EmptySources(ComponentKey),
    #[error("computed component {component} lists source {dependency} twice")]
    DuplicateSource {
        component: ComponentKey,
        dependency: ComponentKey,
    },
    #[error("computed component {component} references unknown source {dependency}")]
    UnknownSource {
        component: ComponentKey,
        dependency: ComponentKey,
    },
    #[error("computed component {component} must derive from input components, not {dependency}")]
    SourceNotInput {
        component: ComponentKey,
        dependency: ComponentKey,
    },
    #[error("designated total {0} is not a computed component")]
    TotalNotComputed(ComponentKey),
    #[error("designated total {0} does not exist")]
    UnknownTotal(ComponentKey),
}
