//! Shared fixtures: a fake AI gateway and helpers for driving the router.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use packscan::{router, AppState, Settings};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const API_KEY: &str = "test-key";
pub const SESSION_SECRET: &str = "test-secret";

/// Behaviour of the fake gateway.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub analysis_status: u16,
    pub analysis_content: String,
    /// Formulas whose structure-image call answers 500.
    pub failing_formulas: Vec<String>,
    /// How long each structure-image call takes to answer.
    pub image_delay: Duration,
}

impl Upstream {
    pub fn returning(content: Value) -> Self {
        Self {
            analysis_status: 200,
            analysis_content: content.to_string(),
            failing_formulas: Vec::new(),
            image_delay: Duration::ZERO,
        }
    }

    pub fn failing_with(status: u16) -> Self {
        Self {
            analysis_status: status,
            analysis_content: String::new(),
            failing_formulas: Vec::new(),
            image_delay: Duration::ZERO,
        }
    }
}

pub struct FakeGateway {
    pub url: String,
    pub image_calls: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct FakeState {
    upstream: Arc<Upstream>,
    image_calls: Arc<AtomicUsize>,
}

async fn completions(
    State(state): State<FakeState>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if body.get("modalities").is_some() {
        state.image_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(state.upstream.image_delay).await;
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        let failing = state
            .upstream
            .failing_formulas
            .iter()
            .any(|f| prompt.contains(&format!("of {f} chemical")));
        if failing {
            return (StatusCode::INTERNAL_SERVER_ERROR, "image model unavailable").into_response();
        }
        return Json(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "images": [{
                        "type": "image_url",
                        "image_url": { "url": "data:image/png;base64,U1RSVUNU" }
                    }]
                }
            }]
        }))
        .into_response();
    }

    assert_eq!(body["response_format"]["type"], "json_object");
    let status = StatusCode::from_u16(state.upstream.analysis_status).unwrap();
    if !status.is_success() {
        return (status, "upstream refused").into_response();
    }
    Json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": state.upstream.analysis_content }
        }]
    }))
    .into_response()
}

pub async fn spawn_gateway(upstream: Upstream) -> FakeGateway {
    let image_calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/chat/completions", post(completions))
        .with_state(FakeState {
            upstream: Arc::new(upstream),
            image_calls: image_calls.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeGateway {
        url: format!("http://{addr}"),
        image_calls,
    }
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn settings(gateway_url: &str, data_dir: &Path) -> Settings {
    Settings {
        api_key: Some(API_KEY.to_string()),
        gateway_url: gateway_url.to_string(),
        data_dir: data_dir.to_path_buf(),
        session_secret: Some(SESSION_SECRET.to_string()),
        ..Settings::default()
    }
}

pub fn app(settings: &Settings) -> Router {
    router(AppState::from_settings(settings).unwrap(), settings.body_limit)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn png_data_url() -> String {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([30, 120, 200]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
}

pub fn three_materials() -> Value {
    json!({
        "materials": [
            {
                "type": "HDPE bottle",
                "chemicalFormula": "(C2H4)n",
                "fssaiLimits": ["Overall migration: 60 mg/kg"],
                "bisLimits": "IS 10146",
                "thickness": "1.2 mm",
                "gsm": "N/A",
                "foodApplications": ["Milk", "Juice"],
                "plasticResinCode": 2
            },
            {
                "type": "Aluminum foil",
                "chemicalFormula": "Al",
                "fssaiLimits": "Heavy metals below 1 ppm",
                "bisLimits": ["IS 15392"],
                "thickness": "9 microns",
                "gsm": "N/A",
                "foodApplications": "Chocolate"
            },
            {
                "type": "Kraft paper",
                "chemicalFormula": "(C6H10O5)n",
                "fssaiLimits": [],
                "bisLimits": [],
                "thickness": "0.1 mm",
                "gsm": "80",
                "foodApplications": ["Bakery"],
                "plasticResinCode": null
            }
        ],
        "overallAnalysis": "Multi-material pack"
    })
}
