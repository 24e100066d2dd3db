use anyhow::Result;
use recetario::basic_models::{DraftRecipe, RecipeUpdate};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::database::{Database, FromRow};

pub fn sqlite_current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Decode a JSON array column of text lines.
fn json_lines(row: &rusqlite::Row, column: &str) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Album {
    pub album_id: i64,
    pub name: String,
    pub icon: String,
    pub created_on: String,
}

impl FromRow for Album {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            album_id: row.get("album_id")?,
            name: row.get("name")?,
            icon: row.get("icon")?,
            created_on: row.get("created_on")?,
        })
    }
}

impl Album {
    /// All albums in creation order, the gallery's default.
    pub fn list_by_creation(db: &Database) -> Result<Vec<Album>> {
        db.collect_rows(
            "SELECT * FROM Album ORDER BY created_on ASC, album_id ASC",
            params![],
        )
    }

    /// All albums alphabetically, for navigation chrome and print menus.
    pub fn list_by_name(db: &Database) -> Result<Vec<Album>> {
        db.collect_rows(
            "SELECT * FROM Album ORDER BY name COLLATE NOCASE ASC",
            params![],
        )
    }

    pub fn get_by_id(db: &Database, album_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM Album WHERE album_id = ?", params![album_id])?
            .pop())
    }

    /// Add a new album. Duplicate names are allowed.
    pub fn push(db: &Database, name: &str, icon: &str) -> Result<i64> {
        let conn = db.pool.get()?;
        conn.execute(
            "INSERT INTO Album (name, icon, created_on) VALUES (?, ?, ?)",
            params![name, icon, sqlite_current_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(db: &Database, album_id: i64, name: &str, icon: &str) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute(
            "UPDATE Album SET name = ?, icon = ? WHERE album_id = ?",
            params![name, icon, album_id],
        )?;
        Ok(())
    }

    pub fn delete(db: &Database, album_id: i64) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute("DELETE FROM Album WHERE album_id = ?", params![album_id])?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Recipe {
    pub recipe_id: i64,
    pub title: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub font: String,
    pub album_id: Option<i64>,
    pub created_on: String,
    /// Denormalized from the joined album, when fetched with one.
    pub album_name: Option<String>,
    pub album_icon: Option<String>,
}

impl FromRow for Recipe {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            title: row.get("title")?,
            ingredients: json_lines(row, "ingredients")?,
            steps: json_lines(row, "steps")?,
            notes: row.get("notes")?,
            photo_url: row.get("photo_url")?,
            font: row.get("font")?,
            album_id: row.get("album_id")?,
            created_on: row.get("created_on")?,
            album_name: row.get("album_name").ok(),
            album_icon: row.get("album_icon").ok(),
        })
    }
}

impl Recipe {
    /// All recipes, most recent first, with the owning album joined in.
    pub fn list_recent(db: &Database) -> Result<Vec<Recipe>> {
        db.collect_rows(
            "SELECT Recipe.*, Album.name AS album_name, Album.icon AS album_icon
            FROM Recipe
            LEFT JOIN Album ON Album.album_id = Recipe.album_id
            ORDER BY Recipe.created_on DESC, Recipe.recipe_id DESC",
            params![],
        )
    }

    /// Recipes of one album, alphabetical by title.
    pub fn list_by_album(db: &Database, album_id: i64) -> Result<Vec<Recipe>> {
        db.collect_rows(
            "SELECT Recipe.*, Album.name AS album_name, Album.icon AS album_icon
            FROM Recipe
            LEFT JOIN Album ON Album.album_id = Recipe.album_id
            WHERE Recipe.album_id = ?
            ORDER BY Recipe.title COLLATE NOCASE ASC",
            params![album_id],
        )
    }

    /// Recipes outside every album, the "General" section of the print view.
    pub fn list_unfiled(db: &Database) -> Result<Vec<Recipe>> {
        db.collect_rows(
            "SELECT Recipe.*, NULL AS album_name, NULL AS album_icon
            FROM Recipe
            WHERE Recipe.album_id IS NULL
            ORDER BY Recipe.title COLLATE NOCASE ASC",
            params![],
        )
    }

    pub fn get_by_id(db: &Database, recipe_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT Recipe.*, Album.name AS album_name, Album.icon AS album_icon
                FROM Recipe
                LEFT JOIN Album ON Album.album_id = Recipe.album_id
                WHERE Recipe.recipe_id = ?",
                params![recipe_id],
            )?
            .pop())
    }

    /// Photo URLs of every recipe in an album; used for storage cleanup
    /// before the album cascade delete.
    pub fn photo_urls_for_album(db: &Database, album_id: i64) -> Result<Vec<String>> {
        let recipes = Self::list_by_album(db, album_id)?;
        Ok(recipes.into_iter().filter_map(|r| r.photo_url).collect())
    }

    /// Insert a committed draft as a new row.
    pub fn push(
        db: &Database,
        recipe: &DraftRecipe,
        font: &str,
        album_id: Option<i64>,
        photo_url: Option<&str>,
    ) -> Result<i64> {
        let conn = db.pool.get()?;
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let steps = serde_json::to_string(&recipe.steps)?;
        conn.execute(
            "INSERT INTO Recipe (title, ingredients, steps, notes, photo_url, font, album_id, created_on)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                recipe.title,
                ingredients,
                steps,
                recipe.notes,
                photo_url,
                font,
                album_id,
                sqlite_current_timestamp()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update exactly the general editing fields. Album membership and the
    /// photo have their own single-field updates.
    pub fn update_fields(db: &Database, recipe_id: i64, update: &RecipeUpdate) -> Result<()> {
        let conn = db.pool.get()?;
        let ingredients = serde_json::to_string(&update.ingredients)?;
        let steps = serde_json::to_string(&update.steps)?;
        conn.execute(
            "UPDATE Recipe SET title = ?, ingredients = ?, steps = ?, notes = ?,
                font = COALESCE(?, font)
            WHERE recipe_id = ?",
            params![
                update.title,
                ingredients,
                steps,
                update.notes,
                update.font,
                recipe_id
            ],
        )?;
        Ok(())
    }

    pub fn set_photo_url(db: &Database, recipe_id: i64, photo_url: &str) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute(
            "UPDATE Recipe SET photo_url = ? WHERE recipe_id = ?",
            params![photo_url, recipe_id],
        )?;
        Ok(())
    }

    pub fn set_album(db: &Database, recipe_id: i64, album_id: Option<i64>) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute(
            "UPDATE Recipe SET album_id = ? WHERE recipe_id = ?",
            params![album_id, recipe_id],
        )?;
        Ok(())
    }

    pub fn delete(db: &Database, recipe_id: i64) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute("DELETE FROM Recipe WHERE recipe_id = ?", params![recipe_id])?;
        Ok(())
    }

    pub fn delete_by_album(db: &Database, album_id: i64) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute("DELETE FROM Recipe WHERE album_id = ?", params![album_id])?;
        Ok(())
    }
}
