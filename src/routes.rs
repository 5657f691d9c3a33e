use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::auth::{SessionKeys, User};
use crate::config::Settings;
use crate::display::{self, MaterialSummary, Panel, Property};
use crate::error::{AppError, Result};
use crate::guide::{self, Guide, GuideEntry};
use crate::material::{AnalysisResult, Material};
use crate::store::{Database, ObjectStore, Persistence, SavedAnalysis, UrlSigner};
use crate::ui;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub sessions: Option<SessionKeys>,
    pub persistence: Option<Arc<Persistence>>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let analyzer = Analyzer::new(settings).context("failed to build AI gateway client")?;

        if settings.api_key.is_none() {
            tracing::warn!("AI_GATEWAY_API_KEY is not set, analysis requests will fail");
        }

        let (sessions, persistence) = match &settings.session_secret {
            Some(secret) => {
                let db = Database::open(&settings.data_dir).with_context(|| {
                    format!("failed to open database in {}", settings.data_dir.display())
                })?;
                let objects = ObjectStore::open(&settings.data_dir)
                    .context("failed to prepare object storage")?;
                let persistence = Persistence {
                    db: Arc::new(db),
                    objects,
                    signer: UrlSigner::new(secret.clone(), settings.signed_url_ttl),
                };
                (Some(SessionKeys::new(secret.clone())), Some(Arc::new(persistence)))
            }
            None => {
                tracing::warn!("SESSION_SECRET is not set, saved analyses are disabled");
                (None, None)
            }
        };

        Ok(Self {
            analyzer: Arc::new(analyzer),
            sessions,
            persistence,
        })
    }

    fn persistence(&self) -> Result<&Persistence> {
        self.persistence
            .as_deref()
            .ok_or(AppError::NotConfigured("SESSION_SECRET"))
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/functions/v1/analyze-packaging", post(analyze_packaging))
        .route("/api/panels", post(render_panel))
        .route("/api/guide", get(materials_guide))
        .route("/api/guide/:name", get(guide_entry))
        .route("/api/analyses", get(list_analyses).post(save_analysis))
        .route("/api/analyses/:id", delete(delete_analysis))
        .route("/api/analyses/:id/materials/:index", get(saved_material))
        .route(
            "/api/analyses/:id/materials/:index/:property",
            get(saved_material_panel),
        )
        .route("/storage/v1/object/sign/analyses/*path", get(signed_object))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(ui::INDEX_HTML)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn json_object(body: &[u8]) -> Result<serde_json::Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::InvalidBody("expected a JSON object".into())),
        Err(e) => Err(AppError::InvalidBody(e.to_string())),
    }
}

fn image_field(body: &serde_json::Map<String, Value>) -> Result<&str> {
    body.get("imageBase64")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::MissingImage)
}

async fn analyze_packaging(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisResult>> {
    let body = json_object(&body)?;
    let image = image_field(&body)?;
    let result = state.analyzer.analyze(image).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct PanelRequest {
    material: Material,
    property: String,
}

async fn render_panel(body: Bytes) -> Result<Json<Panel>> {
    let request: PanelRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidBody(e.to_string()))?;
    panel_for(&request.material, &request.property).map(Json)
}

async fn materials_guide() -> Json<Guide> {
    Json(guide::guide())
}

async fn guide_entry(Path(name): Path<String>) -> Result<Json<GuideEntry>> {
    guide::find(&name)
        .copied()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Guide entry {name:?}")))
}

fn panel_for(material: &Material, property: &str) -> Result<Panel> {
    let property = Property::parse(property)
        .ok_or_else(|| AppError::NotFound(format!("Property {property:?}")))?;
    display::render(material, property)
        .ok_or_else(|| AppError::NotFound(format!("{} for {}", property.label(), material.kind)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest {
    #[serde(default)]
    image_base64: Option<String>,
    materials: Vec<Material>,
    #[serde(default)]
    overall_analysis: Option<String>,
}

async fn save_analysis(
    user: User,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SavedAnalysis>)> {
    let persistence = state.persistence()?;
    let request: SaveRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidBody(e.to_string()))?;
    let image = request
        .image_base64
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::MissingImage)?;
    if request.materials.iter().any(|m| m.kind.trim().is_empty()) {
        return Err(AppError::InvalidBody("every material needs a type".into()));
    }

    let saved = persistence
        .save(user.id, image, request.materials, request.overall_analysis)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_analyses(
    user: User,
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedAnalysis>>> {
    Ok(Json(state.persistence()?.list(user.id).await?))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Analysis".into()))
}

async fn delete_analysis(
    user: User,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.persistence()?.delete(user.id, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn saved_material_at(
    state: &AppState,
    user: User,
    id: &str,
    index: usize,
) -> Result<Material> {
    let analysis = state.persistence()?.get(user.id, parse_id(id)?).await?;
    analysis
        .materials
        .into_iter()
        .nth(index)
        .ok_or_else(|| AppError::NotFound(format!("Material {index}")))
}

async fn saved_material(
    user: User,
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<MaterialSummary>> {
    let material = saved_material_at(&state, user, &id, index).await?;
    Ok(Json(display::summarize(&material)))
}

async fn saved_material_panel(
    user: User,
    State(state): State<AppState>,
    Path((id, index, property)): Path<(String, usize, String)>,
) -> Result<Json<Panel>> {
    let material = saved_material_at(&state, user, &id, index).await?;
    panel_for(&material, &property).map(Json)
}

#[derive(Deserialize)]
struct SignedQuery {
    expires: i64,
    token: String,
}

async fn signed_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
    query: Option<Query<SignedQuery>>,
) -> Result<impl IntoResponse> {
    let Some(Query(query)) = query else {
        return Err(AppError::Forbidden);
    };
    let bytes = state
        .persistence()?
        .signed_object(&path, query.expires, &query.token)
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
