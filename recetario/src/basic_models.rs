use serde::{Deserialize, Serialize};

/// An in-progress recipe, as produced by transcription or manual entry.
/// Not persisted until the editor commits it.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct DraftRecipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DraftRecipe {
    /// Drop blank and whitespace-only ingredient and step lines.
    /// The editor tolerates them while composing, storage never sees them.
    pub fn sanitized(&self) -> DraftRecipe {
        let keep = |lines: &[String]| {
            lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .cloned()
                .collect::<Vec<_>>()
        };
        DraftRecipe {
            title: self.title.trim().to_string(),
            ingredients: keep(&self.ingredients),
            steps: keep(&self.steps),
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
        }
    }
}

/// The fields the general recipe update is allowed to touch.
/// Album membership and the dish photo have their own operations.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecipeUpdate {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
}
