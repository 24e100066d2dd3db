use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::CookieJar;
use clap::Parser;
use recetario::basic_models::{DraftRecipe, RecipeUpdate};
use recetario::draft::DraftEditor;
use recetario::fonts::{RecipeFont, FONTS};
use recetario::icons::{AlbumIcon, ALBUM_ICONS};
use recetario_server::{
    actions::{self, ActionResult},
    auth::{self, FamilySession},
    database::Database,
    errors::{WebError, WebResult},
    gallery::{self, GalleryView},
    models::{Album, Recipe},
    prep,
    scan::{self, OpenAiVision, VisionModel},
    storage::{GcsStore, ObjectStore},
};
use minijinja::context;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Map a stored icon key to its glyph, falling back to the default icon.
fn icon_glyph(key: Option<String>) -> String {
    AlbumIcon::parse(key.as_deref().unwrap_or_default())
        .glyph()
        .to_string()
}

/// Map a stored font key to the CSS class the stylesheet knows.
fn font_class(key: Option<String>) -> String {
    RecipeFont::parse(key.as_deref().unwrap_or_default()).css_class()
}

lazy_static::lazy_static! {
    static ref TEMPLATES: minijinja::Environment<'static> = {
        let mut env = minijinja::Environment::new();
        for (name, template) in &[
            ("base.html.jinja", include_str!("../templates/base.html.jinja")),
            ("index.html.jinja", include_str!("../templates/index.html.jinja")),
            ("login.html.jinja", include_str!("../templates/login.html.jinja")),
            ("nueva.html.jinja", include_str!("../templates/nueva.html.jinja")),
            ("receta.html.jinja", include_str!("../templates/receta.html.jinja")),
            ("imprimir.html.jinja", include_str!("../templates/imprimir.html.jinja")),
        ] {
            env.add_template(name, template)
                .expect("Failed to register template");
        }
        env.add_filter("icon_glyph", icon_glyph);
        env.add_filter("font_class", font_class);
        env
    };
}

#[derive(Parser, Debug)]
struct Args {
    /// The address and optionally port to bind to
    #[clap(long, default_value = "0.0.0.0:3000")]
    address: String,

    /// Path of the sqlite database file
    #[clap(long, default_value = "data/recetario.db")]
    database: String,

    /// Object storage bucket holding the dish photos
    #[clap(long, default_value = "recetario-fotos")]
    bucket: String,

    /// Whether to use HTTPS / TLS
    #[clap(long)]
    tls: bool,

    #[clap(long, default_value = "/etc/letsencrypt/live/recetario/fullchain.pem")]
    tls_cert: String,

    #[clap(long, default_value = "/etc/letsencrypt/live/recetario/privkey.pem")]
    tls_key: String,
}

#[derive(Clone)]
struct AllStates {
    db: Database,
    store: Arc<dyn ObjectStore>,
    vision: Arc<dyn VisionModel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // initialize tracing
    let file_appender = tracing_appender::rolling::daily(
        if std::fs::exists("/app")? {
            "/app/data/logs".into()
        } else {
            std::env::current_dir()?
        },
        "access.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let db = Database::connect(&args.database)
        .await
        .context("Connecting to database")?;
    let store: Arc<dyn ObjectStore> = Arc::new(
        GcsStore::connect(&args.bucket)
            .await
            .context("Connecting to object storage")?,
    );
    let vision: Arc<dyn VisionModel> =
        Arc::new(OpenAiVision::from_env().context("Configuring the vision model")?);

    let app = Router::new()
        // Pages, behind the family cookie
        .route("/", get(root))
        .route("/nueva", get(nueva))
        .route("/receta/:recipe_id", get(get_recipe))
        .route("/imprimir/todo", get(print_all))
        .route("/imprimir/album/:album_id", get(print_album))
        // Login flow and health, outside the gate
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/health", get(health))
        // The JSON API consumed by the pages
        .route("/api/scan", post(scan_pages))
        .route("/api/recipe", post(create_recipe))
        .route("/api/recipe/:recipe_id", post(update_recipe))
        .route("/api/recipe/:recipe_id/photo", post(upload_dish_photo))
        .route("/api/recipe/:recipe_id/move", post(move_recipe))
        .route("/api/recipe/:recipe_id/delete", post(delete_recipe))
        .route("/api/albums", get(list_albums))
        .route("/api/album", post(create_album))
        .route("/api/album/:album_id", post(update_album))
        .route("/api/album/:album_id/delete", post(delete_album))
        // serve static files from the `./static` directory
        .route("/static/*path", get(serve_static))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(AllStates { db, store, vision });

    // In development, use HTTP. In production, use HTTPS.
    if args.tls {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&args.tls_cert, &args.tls_key)
                .await
                .context("Loading TLS certificate")?;

        let addr = args.address.parse()?;
        tracing::info!("Listening on {}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(args.address).await?;
        axum::serve(listener, app).await?;
    }
    Ok(())
}

// --- pages ---

/// The gallery: albums plus the recipes the current view state selects.
async fn root(
    State(allstates): State<AllStates>,
    Query(view): Query<GalleryView>,
    _: FamilySession,
) -> WebResult<Html<String>> {
    let albums = Album::list_by_creation(&allstates.db)?;
    let recipes = gallery::apply(&view, Recipe::list_recent(&allstates.db)?);
    let current_album = view.album.and_then(|id| {
        albums
            .iter()
            .find(|album| album.album_id == id)
            .cloned()
    });
    Ok(Html(TEMPLATES.get_template("index.html.jinja")?.render(
        context! {
            albums => albums,
            recipes => recipes,
            view => view,
            current_album => current_album,
        },
    )?))
}

/// The capture page: scan pages or write a recipe by hand.
async fn nueva(State(allstates): State<AllStates>, _: FamilySession) -> WebResult<Html<String>> {
    let albums = Album::list_by_creation(&allstates.db)?;
    let fonts: Vec<_> = FONTS
        .iter()
        .map(|f| context! { key => f.key(), label => f.label(), class => f.css_class() })
        .collect();
    let icons: Vec<_> = ALBUM_ICONS
        .iter()
        .map(|i| context! { key => i.key(), glyph => i.glyph() })
        .collect();
    Ok(Html(TEMPLATES.get_template("nueva.html.jinja")?.render(
        context! {
            albums => albums,
            fonts => fonts,
            icons => icons,
        },
    )?))
}

async fn get_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<i64>,
    _: FamilySession,
) -> WebResult<Html<String>> {
    let recipe = Recipe::get_by_id(&allstates.db, recipe_id)?.ok_or(WebError::NotFound)?;
    let albums = Album::list_by_name(&allstates.db)?;
    Ok(Html(TEMPLATES.get_template("receta.html.jinja")?.render(
        context! {
            recipe => recipe,
            albums => albums,
        },
    )?))
}

/// Printable layout of every album, including the unfiled "General" set.
async fn print_all(
    State(allstates): State<AllStates>,
    _: FamilySession,
) -> WebResult<Html<String>> {
    let mut sections = vec![];
    for album in Album::list_by_name(&allstates.db)? {
        let recipes = Recipe::list_by_album(&allstates.db, album.album_id)?;
        sections.push(context! { album => album, recipes => recipes });
    }
    let unfiled = Recipe::list_unfiled(&allstates.db)?;
    if !unfiled.is_empty() {
        sections.push(context! { album => (), recipes => unfiled });
    }
    Ok(Html(TEMPLATES.get_template("imprimir.html.jinja")?.render(
        context! { sections => sections },
    )?))
}

/// Printable layout of a single album.
async fn print_album(
    State(allstates): State<AllStates>,
    Path(album_id): Path<i64>,
    _: FamilySession,
) -> WebResult<Html<String>> {
    let album = Album::get_by_id(&allstates.db, album_id)?.ok_or(WebError::NotFound)?;
    let recipes = Recipe::list_by_album(&allstates.db, album_id)?;
    Ok(Html(TEMPLATES.get_template("imprimir.html.jinja")?.render(
        context! {
            sections => vec![context! { album => album, recipes => recipes }],
        },
    )?))
}

// --- login ---

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    error: Option<String>,
}

async fn login_page(Query(query): Query<LoginQuery>) -> WebResult<Html<String>> {
    Ok(Html(TEMPLATES.get_template("login.html.jinja")?.render(
        context! { error => query.error.is_some() },
    )?))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    password: String,
}

async fn login(jar: CookieJar, Form(form): Form<LoginForm>) -> impl IntoResponse {
    if auth::verify_password(&form.password) {
        match auth::session_cookie() {
            Some(cookie) => (jar.add(cookie), Redirect::to("/")).into_response(),
            None => Redirect::to("/login?error=1").into_response(),
        }
    } else {
        Redirect::to("/login?error=1").into_response()
    }
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(auth::SESSION_COOKIE), Redirect::to("/login"))
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

// --- API: capture and transcription ---

/// Receive captured page images, compress them, and transcribe them into
/// an editable draft.
async fn scan_pages(
    State(allstates): State<AllStates>,
    mut multipart: Multipart,
) -> WebResult<Json<ActionResult<DraftRecipe>>> {
    let mut editor = DraftEditor::new();
    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        if field.name() != Some("images") && field.name() != Some("image") {
            continue;
        }
        let bytes = field.bytes().await.map_err(anyhow::Error::from)?;
        match prep::prepare_page(&bytes) {
            // Adding a prepared page to a fresh editor cannot be rejected
            Ok(page) => editor.add_page(page).expect("editor accepts pages"),
            Err(e) => {
                tracing::warn!(error = %e, "discarding one unreadable page upload");
            }
        }
    }

    if editor.pages().is_empty() {
        return Ok(Json(ActionResult::fail(
            scan::ScanError::NoImages.to_string(),
        )));
    }
    let pages = match editor.begin_transcription() {
        Ok(pages) => pages.to_vec(),
        Err(e) => return Ok(Json(ActionResult::fail(e.to_string()))),
    };
    match scan::scan_pages(allstates.vision.as_ref(), &pages).await {
        Ok(draft) => {
            editor
                .transcription_succeeded(draft.clone())
                .expect("editor was transcribing");
            Ok(Json(ActionResult::ok(draft)))
        }
        Err(e) => {
            editor.transcription_failed().expect("editor was transcribing");
            Ok(Json(ActionResult::fail(e.to_string())))
        }
    }
}

/// Save a committed draft, with its optional dish photo, into an album.
async fn create_recipe(
    State(allstates): State<AllStates>,
    mut multipart: Multipart,
) -> WebResult<Json<ActionResult<i64>>> {
    let mut draft: Option<DraftRecipe> = None;
    let mut font = RecipeFont::default();
    let mut album_id: Option<i64> = None;
    let mut dish_image: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = field.text().await.map_err(anyhow::Error::from)?;
                match serde_json::from_str(&text) {
                    Ok(parsed) => draft = Some(parsed),
                    Err(e) => return Ok(Json(ActionResult::fail(format!("Datos ilegibles: {e}")))),
                }
            }
            Some("font") => {
                font = RecipeFont::parse(&field.text().await.map_err(anyhow::Error::from)?)
            }
            Some("albumId") => {
                album_id = field
                    .text()
                    .await
                    .map_err(anyhow::Error::from)?
                    .parse()
                    .ok()
            }
            Some("dishImage") => {
                dish_image = Some(field.bytes().await.map_err(anyhow::Error::from)?.to_vec())
            }
            _ => {}
        }
    }
    let Some(draft) = draft else {
        return Ok(Json(ActionResult::fail("Faltan datos")));
    };

    let mut editor = DraftEditor::editable_from(draft, font);
    if let Some(bytes) = dish_image.filter(|b| !b.is_empty()) {
        match prep::prepare_dish_photo(&bytes) {
            Ok(photo) => editor.attach_photo(photo).expect("editor is editable"),
            Err(e) => {
                return Ok(Json(ActionResult::fail(format!(
                    "Error procesando la foto del plato: {e:#}"
                ))))
            }
        }
    }
    let committed = match editor.commit() {
        Ok(committed) => committed,
        Err(e) => return Ok(Json(ActionResult::fail(e.to_string()))),
    };
    Ok(Json(
        actions::create_recipe(
            &allstates.db,
            allstates.store.as_ref(),
            &committed,
            album_id,
        )
        .await,
    ))
}

// --- API: recipes ---

async fn update_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<i64>,
    Json(update): Json<RecipeUpdate>,
) -> Json<ActionResult<()>> {
    Json(actions::update_recipe(&allstates.db, recipe_id, &update).await)
}

/// Replace the dish photo of an existing recipe.
async fn upload_dish_photo(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<i64>,
    mut multipart: Multipart,
) -> WebResult<Json<ActionResult<String>>> {
    let mut image: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        let name = field.name().map(str::to_string);
        if name.as_deref() == Some("image") {
            image = Some(field.bytes().await.map_err(anyhow::Error::from)?.to_vec());
        }
    }
    let Some(bytes) = image.filter(|b| !b.is_empty()) else {
        return Ok(Json(ActionResult::fail("Faltan datos")));
    };
    let photo = match prep::prepare_dish_photo(&bytes) {
        Ok(photo) => photo,
        Err(e) => {
            return Ok(Json(ActionResult::fail(format!(
                "Error procesando la foto: {e:#}"
            ))))
        }
    };
    Ok(Json(
        actions::attach_photo(&allstates.db, allstates.store.as_ref(), recipe_id, &photo).await,
    ))
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    #[serde(default)]
    album_id: Option<i64>,
}

async fn move_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<i64>,
    Json(request): Json<MoveRequest>,
) -> Json<ActionResult<()>> {
    Json(actions::move_recipe(&allstates.db, recipe_id, request.album_id).await)
}

async fn delete_recipe(
    State(allstates): State<AllStates>,
    Path(recipe_id): Path<i64>,
) -> Json<ActionResult<()>> {
    Json(actions::delete_recipe(&allstates.db, allstates.store.as_ref(), recipe_id).await)
}

// --- API: albums ---

async fn list_albums(State(allstates): State<AllStates>) -> Json<ActionResult<Vec<Album>>> {
    Json(actions::list_albums(&allstates.db).await)
}

#[derive(Debug, Deserialize)]
struct AlbumRequest {
    name: String,
    #[serde(default)]
    icon: String,
}

async fn create_album(
    State(allstates): State<AllStates>,
    Json(request): Json<AlbumRequest>,
) -> Json<ActionResult<i64>> {
    Json(actions::create_album(&allstates.db, &request.name, &request.icon).await)
}

async fn update_album(
    State(allstates): State<AllStates>,
    Path(album_id): Path<i64>,
    Json(request): Json<AlbumRequest>,
) -> Json<ActionResult<()>> {
    Json(actions::update_album(&allstates.db, album_id, &request.name, &request.icon).await)
}

async fn delete_album(
    State(allstates): State<AllStates>,
    Path(album_id): Path<i64>,
) -> Json<ActionResult<()>> {
    Json(actions::delete_album(&allstates.db, allstates.store.as_ref(), album_id).await)
}

/// Serve static files from memory using `include_dir!`
async fn serve_static(Path(path): Path<String>) -> WebResult<impl IntoResponse> {
    let dir = include_dir::include_dir!("$CARGO_MANIFEST_DIR/static");
    let bytes = dir.get_file(&path).ok_or(WebError::NotFound)?.contents();
    let header = (
        header::CONTENT_TYPE,
        match path.split('.').last() {
            Some("css") => "text/css",
            Some("js") => "text/javascript",
            Some("png") => "image/png",
            Some("svg") => "image/svg+xml",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        },
    );
    Ok(([header], bytes).into_response())
}
