//! The persistence gateway: every mutation the app performs against the
//! datastore and the photo bucket. Nothing here throws past its boundary;
//! each operation folds failures into the uniform [`ActionResult`].
//!
//! Multi-step operations are deliberately not transactional. Photo cleanup
//! is best effort and the row delete is authoritative; a create that
//! uploads a photo and then fails the insert leaves the object orphaned
//! and says so.

use rand::Rng;
use serde::Serialize;

use recetario::basic_models::RecipeUpdate;
use recetario::draft::{CommittedDraft, DishPhoto};

use crate::database::Database;
use crate::models::{Album, Recipe};
use crate::storage::ObjectStore;

/// Uniform result envelope for every gateway operation.
#[derive(Debug, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Envelope for operations with nothing to return.
pub type Done = ActionResult<()>;

pub fn done() -> Done {
    ActionResult {
        success: true,
        data: None,
        error: None,
    }
}

// --- recipes ---

/// Commit a draft: upload the dish photo if there is one, then insert the
/// row. The two steps are sequenced, not atomic; an insert failure after a
/// successful upload is reported distinctly.
pub async fn create_recipe(
    db: &Database,
    store: &dyn ObjectStore,
    draft: &CommittedDraft,
    album_id: Option<i64>,
) -> ActionResult<i64> {
    let mut photo_url = None;
    if let Some(photo) = &draft.photo {
        let object_name = photo_object_name(&draft.recipe.title, &photo.extension);
        if let Err(e) = store
            .upload(&object_name, photo.bytes.clone(), &photo.mime)
            .await
        {
            return ActionResult::fail(format!("Error subiendo imagen: {e:#}"));
        }
        photo_url = Some(store.public_url(&object_name));
    }
    match Recipe::push(
        db,
        &draft.recipe,
        draft.font.key(),
        album_id,
        photo_url.as_deref(),
    ) {
        Ok(recipe_id) => ActionResult::ok(recipe_id),
        Err(e) => {
            if let Some(url) = &photo_url {
                tracing::warn!(url = %url, error = %e, "insert failed after photo upload, object orphaned");
                ActionResult::fail("La foto se subió, pero la receta no se pudo guardar.")
            } else {
                ActionResult::fail(format!("Error guardando en base de datos: {e:#}"))
            }
        }
    }
}

/// Update title, lists, notes and font. Blank lines are dropped before
/// they can reach storage; the title stays required.
pub async fn update_recipe(db: &Database, recipe_id: i64, update: &RecipeUpdate) -> Done {
    let clean = RecipeUpdate {
        title: update.title.trim().to_string(),
        ingredients: without_blank_lines(&update.ingredients),
        steps: without_blank_lines(&update.steps),
        notes: update
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
        font: update.font.clone(),
    };
    if clean.title.is_empty() {
        return ActionResult::fail("La receta necesita un título.");
    }
    match Recipe::update_fields(db, recipe_id, &clean) {
        Ok(()) => done(),
        Err(e) => ActionResult::fail(format!("Error guardando cambios: {e:#}")),
    }
}

/// Attach or replace the dish photo of an existing recipe. Only the photo
/// field is touched.
pub async fn attach_photo(
    db: &Database,
    store: &dyn ObjectStore,
    recipe_id: i64,
    photo: &DishPhoto,
) -> ActionResult<String> {
    let recipe = match Recipe::get_by_id(db, recipe_id) {
        Ok(Some(recipe)) => recipe,
        Ok(None) => return ActionResult::fail("Receta no encontrada."),
        Err(e) => return ActionResult::fail(format!("Error leyendo la receta: {e:#}")),
    };
    let object_name = photo_object_name(&recipe.title, &photo.extension);
    if let Err(e) = store
        .upload(&object_name, photo.bytes.clone(), &photo.mime)
        .await
    {
        return ActionResult::fail(format!("Error al subir la imagen a la nube: {e:#}"));
    }
    let public_url = store.public_url(&object_name);
    match Recipe::set_photo_url(db, recipe_id, &public_url) {
        Ok(()) => ActionResult::ok(public_url),
        Err(e) => {
            tracing::warn!(url = %public_url, error = %e, "photo update failed after upload, object orphaned");
            ActionResult::fail("La foto subió, pero falló al guardar en la receta.")
        }
    }
}

/// Delete a recipe. If it has a photo the object is removed first, best
/// effort; the row delete goes ahead regardless.
pub async fn delete_recipe(db: &Database, store: &dyn ObjectStore, recipe_id: i64) -> Done {
    let recipe = match Recipe::get_by_id(db, recipe_id) {
        Ok(Some(recipe)) => recipe,
        Ok(None) => return ActionResult::fail("Receta no encontrada."),
        Err(e) => return ActionResult::fail(format!("Error leyendo la receta: {e:#}")),
    };
    if let Some(name) = recipe.photo_url.as_deref().and_then(object_name_from_url) {
        if let Err(e) = store.remove(&name).await {
            tracing::warn!(object = %name, error = %e, "photo removal failed, object orphaned");
        }
    }
    match Recipe::delete(db, recipe_id) {
        Ok(()) => done(),
        Err(e) => ActionResult::fail(format!("Error al eliminar la receta: {e:#}")),
    }
}

/// Move a recipe to another album (or out of every album with `None`).
pub async fn move_recipe(db: &Database, recipe_id: i64, album_id: Option<i64>) -> Done {
    match Recipe::set_album(db, recipe_id, album_id) {
        Ok(()) => done(),
        Err(e) => ActionResult::fail(format!("Error al mover la receta: {e:#}")),
    }
}

// --- albums ---

pub async fn create_album(db: &Database, name: &str, icon: &str) -> ActionResult<i64> {
    let name = name.trim();
    if name.is_empty() {
        return ActionResult::fail("El álbum necesita un nombre.");
    }
    match Album::push(db, name, icon) {
        Ok(album_id) => ActionResult::ok(album_id),
        Err(e) => ActionResult::fail(format!("Error creando álbum: {e:#}")),
    }
}

pub async fn update_album(db: &Database, album_id: i64, name: &str, icon: &str) -> Done {
    let name = name.trim();
    if name.is_empty() {
        return ActionResult::fail("El álbum necesita un nombre.");
    }
    match Album::update(db, album_id, name, icon) {
        Ok(()) => done(),
        Err(e) => ActionResult::fail(format!("Error actualizando álbum: {e:#}")),
    }
}

/// Delete an album and everything it contains, strictly sequenced: photo
/// objects (best effort), then the recipe rows, then the album row.
pub async fn delete_album(db: &Database, store: &dyn ObjectStore, album_id: i64) -> Done {
    let photo_urls = match Recipe::photo_urls_for_album(db, album_id) {
        Ok(urls) => urls,
        Err(e) => return ActionResult::fail(format!("Error leyendo el álbum: {e:#}")),
    };
    for name in photo_urls.iter().filter_map(|u| object_name_from_url(u)) {
        if let Err(e) = store.remove(&name).await {
            tracing::warn!(object = %name, error = %e, "photo removal failed, object orphaned");
        }
    }
    if let Err(e) = Recipe::delete_by_album(db, album_id) {
        return ActionResult::fail(format!("Error borrando las recetas del álbum: {e:#}"));
    }
    match Album::delete(db, album_id) {
        Ok(()) => done(),
        Err(e) => ActionResult::fail(format!("Error borrando el álbum: {e:#}")),
    }
}

pub async fn list_albums(db: &Database) -> ActionResult<Vec<Album>> {
    match Album::list_by_creation(db) {
        Ok(albums) => ActionResult::ok(albums),
        Err(e) => ActionResult::fail(format!("Error leyendo álbumes: {e:#}")),
    }
}

// --- helpers ---

fn without_blank_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .cloned()
        .collect()
}

/// Derive a collision-resistant object name from a recipe title:
/// diacritics folded, non-alphanumerics dropped, spaces hyphenated,
/// lowercased, plus a short random suffix and the extension.
pub fn photo_object_name(title: &str, extension: &str) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() { "receta" } else { slug.as_str() };
    format!("{}-{}.{}", slug, random_suffix(), extension)
}

fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match fold_diacritic(c) {
            c @ ('a'..='z' | '0'..='9') => cleaned.push(c),
            ' ' | '\t' => cleaned.push(' '),
            _ => {}
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Fold the accented characters the family's recipes actually contain.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| {
            let alphabet = b"abcdefghijklmnopqrstuvwxyz0123456789";
            alphabet[rng.gen_range(0..alphabet.len())] as char
        })
        .collect()
}

/// The object name is the final path segment of the public URL.
pub fn object_name_from_url(url: &str) -> Option<String> {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(String::from)
}
