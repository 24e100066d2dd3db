//! End-to-end scenarios over the persistence gateway, against a throwaway
//! sqlite database and the in-memory object store.

use recetario::basic_models::{DraftRecipe, RecipeUpdate};
use recetario::draft::{CommittedDraft, DishPhoto, DraftEditor};
use recetario::fonts::RecipeFont;
use recetario_server::actions;
use recetario_server::database::Database;
use recetario_server::models::{Album, Recipe};
use recetario_server::storage::MemoryStore;

async fn test_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recetario.db");
    let db = Database::connect(path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

fn draft(title: &str, ingredients: &[&str], steps: &[&str]) -> DraftRecipe {
    DraftRecipe {
        title: title.into(),
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        notes: None,
    }
}

fn dish_photo() -> DishPhoto {
    DishPhoto {
        bytes: vec![0x52, 0x49, 0x46, 0x46],
        mime: "image/webp".into(),
        extension: "webp".into(),
    }
}

fn commit(recipe: DraftRecipe, photo: Option<DishPhoto>) -> CommittedDraft {
    let mut editor = DraftEditor::editable_from(recipe, RecipeFont::default());
    if let Some(photo) = photo {
        editor.attach_photo(photo).unwrap();
    }
    editor.commit().unwrap()
}

#[tokio::test]
async fn create_with_photo_round_trips() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let committed = commit(
        draft("Tarta de Limón", &["limones", "azúcar"], &["Exprimir", "Hornear"]),
        Some(dish_photo()),
    );
    let result = actions::create_recipe(&db, &store, &committed, None).await;
    assert!(result.success, "{:?}", result.error);
    let recipe_id = result.data.unwrap();

    let fetched = Recipe::get_by_id(&db, recipe_id).unwrap().unwrap();
    assert_eq!(fetched.title, "Tarta de Limón");
    let photo_url = fetched.photo_url.expect("photo url must be set");
    assert!(photo_url.contains("tarta-de-limon-"));
    // The uploaded object is the one the URL points at
    let names = store.object_names();
    assert_eq!(names.len(), 1);
    assert!(photo_url.ends_with(&names[0]));
}

#[tokio::test]
async fn blank_lines_never_reach_storage() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let committed = commit(
        draft(
            "Sopa",
            &["agua", "   ", "sal", ""],
            &["", "Hervir", "\t", "Servir"],
        ),
        None,
    );
    let recipe_id = actions::create_recipe(&db, &store, &committed, None)
        .await
        .data
        .unwrap();
    let fetched = Recipe::get_by_id(&db, recipe_id).unwrap().unwrap();
    assert_eq!(fetched.ingredients, vec!["agua", "sal"]);
    assert_eq!(fetched.steps, vec!["Hervir", "Servir"]);

    // The general update filters the same way
    let result = actions::update_recipe(
        &db,
        recipe_id,
        &RecipeUpdate {
            title: "Sopa de ajo".into(),
            ingredients: vec!["agua".into(), " ".into(), "ajo".into()],
            steps: vec!["Hervir".into(), String::new()],
            notes: Some("  ".into()),
            font: None,
        },
    )
    .await;
    assert!(result.success);
    let fetched = Recipe::get_by_id(&db, recipe_id).unwrap().unwrap();
    assert_eq!(fetched.title, "Sopa de ajo");
    assert_eq!(fetched.ingredients, vec!["agua", "ajo"]);
    assert_eq!(fetched.steps, vec!["Hervir"]);
    assert_eq!(fetched.notes, None);
}

#[tokio::test]
async fn update_requires_a_title() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();
    let recipe_id = actions::create_recipe(&db, &store, &commit(draft("Flan", &[], &[]), None), None)
        .await
        .data
        .unwrap();
    let result = actions::update_recipe(
        &db,
        recipe_id,
        &RecipeUpdate {
            title: "   ".into(),
            ingredients: vec![],
            steps: vec![],
            notes: None,
            font: None,
        },
    )
    .await;
    assert!(!result.success);
    assert_eq!(
        Recipe::get_by_id(&db, recipe_id).unwrap().unwrap().title,
        "Flan"
    );
}

#[tokio::test]
async fn album_cascade_delete() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let postres = actions::create_album(&db, "Postres", "cake").await.data.unwrap();
    let flan = actions::create_recipe(
        &db,
        &store,
        &commit(
            draft("Flan", &["leche", "huevos", "azúcar"], &["Mezclar", "Hornear"]),
            Some(dish_photo()),
        ),
        Some(postres),
    )
    .await
    .data
    .unwrap();

    let in_album = Recipe::list_by_album(&db, postres).unwrap();
    assert_eq!(in_album.len(), 1);
    assert_eq!(in_album[0].title, "Flan");
    assert_eq!(in_album[0].album_name.as_deref(), Some("Postres"));

    let result = actions::delete_album(&db, &store, postres).await;
    assert!(result.success, "{:?}", result.error);
    assert!(Recipe::list_by_album(&db, postres).unwrap().is_empty());
    assert!(Album::get_by_id(&db, postres).unwrap().is_none());
    assert!(Recipe::get_by_id(&db, flan).unwrap().is_none());
    // The photo object went with the album
    assert!(store.object_names().is_empty());
}

#[tokio::test]
async fn album_delete_removes_at_most_one_object_per_recipe() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let album = actions::create_album(&db, "Navidad", "navidad").await.data.unwrap();
    for (title, with_photo) in [("Cordero", true), ("Turrón", false), ("Sopa", true)] {
        let photo = with_photo.then(dish_photo);
        actions::create_recipe(&db, &store, &commit(draft(title, &[], &[]), photo), Some(album))
            .await
            .data
            .unwrap();
    }
    assert_eq!(store.object_names().len(), 2);

    assert!(actions::delete_album(&db, &store, album).await.success);
    assert!(store.object_names().is_empty());
    assert_eq!(store.removed_names().len(), 2);
}

#[tokio::test]
async fn recipe_delete_is_storage_aware() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let with_photo = actions::create_recipe(
        &db,
        &store,
        &commit(draft("Con foto", &[], &[]), Some(dish_photo())),
        None,
    )
    .await
    .data
    .unwrap();
    let without_photo =
        actions::create_recipe(&db, &store, &commit(draft("Sin foto", &[], &[]), None), None)
            .await
            .data
            .unwrap();

    assert!(actions::delete_recipe(&db, &store, without_photo).await.success);
    // No photo, no storage call
    assert!(store.removed_names().is_empty());

    assert!(actions::delete_recipe(&db, &store, with_photo).await.success);
    assert_eq!(store.removed_names().len(), 1);
    assert!(store.object_names().is_empty());
    assert!(Recipe::get_by_id(&db, with_photo).unwrap().is_none());
}

#[tokio::test]
async fn storage_failure_does_not_block_row_delete() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let recipe_id = actions::create_recipe(
        &db,
        &store,
        &commit(draft("Fantasma", &[], &[]), Some(dish_photo())),
        None,
    )
    .await
    .data
    .unwrap();
    // Simulate an already-orphaned row: the object vanished out of band
    let name = store.object_names().pop().unwrap();
    store.remove_sync(&name);

    assert!(actions::delete_recipe(&db, &store, recipe_id).await.success);
    assert!(Recipe::get_by_id(&db, recipe_id).unwrap().is_none());
}

#[tokio::test]
async fn move_recipe_between_albums() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let a = actions::create_album(&db, "Carnes", "carne").await.data.unwrap();
    let b = actions::create_album(&db, "Pescados", "fish").await.data.unwrap();
    let recipe_id = actions::create_recipe(
        &db,
        &store,
        &commit(draft("Albóndigas", &["carne picada"], &["Freír"]), None),
        Some(a),
    )
    .await
    .data
    .unwrap();

    assert!(actions::move_recipe(&db, recipe_id, Some(b)).await.success);
    assert!(Recipe::list_by_album(&db, a).unwrap().is_empty());
    let in_b = Recipe::list_by_album(&db, b).unwrap();
    assert_eq!(in_b.len(), 1);
    assert_eq!(in_b[0].recipe_id, recipe_id);
    // Unrelated fields survived the move
    assert_eq!(in_b[0].title, "Albóndigas");
    assert_eq!(in_b[0].ingredients, vec!["carne picada"]);
}

#[tokio::test]
async fn replace_photo_touches_only_the_photo_field() {
    let (db, _dir) = test_db().await;
    let store = MemoryStore::new();

    let recipe_id = actions::create_recipe(
        &db,
        &store,
        &commit(draft("Paella", &["arroz"], &["Sofreír"]), None),
        None,
    )
    .await
    .data
    .unwrap();

    let result = actions::attach_photo(&db, &store, recipe_id, &dish_photo()).await;
    assert!(result.success, "{:?}", result.error);
    let url = result.data.unwrap();
    let fetched = Recipe::get_by_id(&db, recipe_id).unwrap().unwrap();
    assert_eq!(fetched.photo_url.as_deref(), Some(url.as_str()));
    assert_eq!(fetched.title, "Paella");
    assert_eq!(fetched.ingredients, vec!["arroz"]);
}

#[tokio::test]
async fn albums_keep_creation_order_and_allow_duplicates() {
    let (db, _dir) = test_db().await;
    let first = actions::create_album(&db, "Tartas", "cake").await.data.unwrap();
    let second = actions::create_album(&db, "Tartas", "cake").await.data.unwrap();
    assert_ne!(first, second);

    let albums = Album::list_by_creation(&db).unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].album_id, first);
}
