//! The gallery read path: an explicit view state (album filter + search
//! term) and the pure pipeline that turns the full recipe list into what
//! the current view shows.

use serde::{Deserialize, Serialize};

use crate::models::Recipe;

/// How many recipes the unfiltered, unsearched home view shows.
pub const RECENT_LIMIT: usize = 5;

/// Serializable view state, carried in the gallery query string.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GalleryView {
    /// Album filter; `None` is the "all recipes" view.
    #[serde(default)]
    pub album: Option<i64>,
    /// Free-text search over titles and ingredient lines.
    #[serde(default)]
    pub q: Option<String>,
}

impl GalleryView {
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Apply the view to a recency-ordered recipe list: album filter first,
/// then search, then the recent-view truncation. Filtering by album
/// switches the ordering to alphabetical.
pub fn apply(view: &GalleryView, recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut recipes = recipes;
    if let Some(album_id) = view.album {
        recipes.retain(|r| r.album_id == Some(album_id));
        recipes.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.recipe_id.cmp(&b.recipe_id))
        });
    }
    if let Some(term) = view.search_term() {
        let needle = term.to_lowercase();
        recipes.retain(|r| matches_search(r, &needle));
    }
    if view.album.is_none() && view.search_term().is_none() {
        recipes.truncate(RECENT_LIMIT);
    }
    recipes
}

/// Case-insensitive substring match against the title or any ingredient.
fn matches_search(recipe: &Recipe, needle_lowercase: &str) -> bool {
    recipe.title.to_lowercase().contains(needle_lowercase)
        || recipe
            .ingredients
            .iter()
            .any(|line| line.to_lowercase().contains(needle_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64, title: &str, ingredients: &[&str], album_id: Option<i64>) -> Recipe {
        Recipe {
            recipe_id: id,
            title: title.into(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            steps: vec![],
            notes: None,
            photo_url: None,
            font: "rotulador".into(),
            album_id,
            created_on: format!("2024-01-{:02} 12:00:00", id),
            album_name: None,
            album_icon: None,
        }
    }

    fn sample() -> Vec<Recipe> {
        vec![
            recipe(7, "Tortilla", &["huevos", "patata"], Some(1)),
            recipe(6, "Arroz con pollo", &["arroz", "pollo"], Some(2)),
            recipe(5, "Flan", &["leche", "huevos", "azúcar"], Some(2)),
            recipe(4, "Gazpacho", &["tomate", "pepino"], None),
            recipe(3, "Croquetas", &["leche", "harina"], Some(1)),
            recipe(2, "Sopa", &["agua"], None),
            recipe(1, "Bizcocho", &["harina", "huevos"], None),
        ]
    }

    #[test]
    fn home_view_shows_five_most_recent() {
        let shown = apply(&GalleryView::default(), sample());
        assert_eq!(shown.len(), RECENT_LIMIT);
        assert_eq!(shown[0].title, "Tortilla");
        assert_eq!(shown[4].title, "Croquetas");
    }

    #[test]
    fn album_filter_sorts_alphabetically() {
        let view = GalleryView {
            album: Some(2),
            q: None,
        };
        let shown = apply(&view, sample());
        let titles: Vec<_> = shown.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Arroz con pollo", "Flan"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_ingredients() {
        for term in ["ARROZ", "arroz"] {
            let view = GalleryView {
                album: None,
                q: Some(term.into()),
            };
            let shown = apply(&view, sample());
            // "Arroz con pollo" by title, "Flan" not; nothing else has arroz
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].title, "Arroz con pollo");
        }
        let view = GalleryView {
            album: None,
            q: Some("LECHE".into()),
        };
        let titles: Vec<_> = apply(&view, sample())
            .iter()
            .map(|r| r.title.clone())
            .collect();
        assert_eq!(titles, vec!["Flan", "Croquetas"]);
    }

    #[test]
    fn search_misses_return_empty() {
        let view = GalleryView {
            album: None,
            q: Some("chocolate".into()),
        };
        assert!(apply(&view, sample()).is_empty());
    }

    #[test]
    fn search_applies_after_album_filter_without_truncation() {
        let view = GalleryView {
            album: Some(2),
            q: Some("huevos".into()),
        };
        let shown = apply(&view, sample());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Flan");
    }

    #[test]
    fn blank_search_counts_as_no_search() {
        let view = GalleryView {
            album: None,
            q: Some("   ".into()),
        };
        assert_eq!(apply(&view, sample()).len(), RECENT_LIMIT);
    }
}
