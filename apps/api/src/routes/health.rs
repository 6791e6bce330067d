use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::db::ping;
use crate::state::AppState;

fn service_info() -> Value {
    json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    })
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(service_info())
}

/// GET /health/detailed
/// Checks the database and the analysis engine; 503 if either is down.
pub async fn detailed_health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (database, engine) = tokio::join!(ping(&state.db), state.engine.health());
    let healthy = database && engine;

    let mut body = service_info();
    body["status"] = json!(if healthy { "ok" } else { "degraded" });
    body["checks"] = json!({
        "database": if database { "ok" } else { "unreachable" },
        "analysisService": if engine { "ok" } else { "unreachable" }
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
