//! HTTP exposition for the meter snapshot.
//!
//! One pull endpoint in Prometheus text format, plus a JSON health check and
//! an API index. Scrapes copy the current [`MeterState`] snapshot into the
//! gauges and encode; they never block ingestion, and a scrape before the
//! first successful decode simply renders an empty snapshot.

use std::io;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use p1meter_core::{MeterState, Reading};

/// Shared server state: the meter snapshot and the gauge families it is
/// published through.
struct AppState {
    meter: Arc<MeterState>,
    registry: Registry,
    power_draw: GaugeVec,
    power_meter: GaugeVec,
    metrics_path: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    readings_observed: usize,
    readings_total: usize,
}

impl AppState {
    fn new(meter: Arc<MeterState>, metrics_path: String) -> Self {
        let registry = Registry::new();
        let power_draw = GaugeVec::new(
            Opts::new("power_draw_watts", "Current power draw in Watts"),
            &["direction"],
        )
        .expect("gauge opts are static");
        let power_meter = GaugeVec::new(
            Opts::new("power_meter_watthours", "Power meter reading in Watthours"),
            &["metering", "direction"],
        )
        .expect("gauge opts are static");
        registry
            .register(Box::new(power_draw.clone()))
            .expect("fresh registry");
        registry
            .register(Box::new(power_meter.clone()))
            .expect("fresh registry");
        Self {
            meter,
            registry,
            power_draw,
            power_meter,
            metrics_path,
        }
    }

    /// Copy the current snapshot into the gauges. A reading never observed
    /// has no label child yet, so it stays out of the output entirely.
    fn fill_gauges(&self) {
        for (reading, value) in self.meter.snapshot() {
            match reading.tariff() {
                Some(tariff) => self
                    .power_meter
                    .with_label_values(&[tariff, reading.direction()])
                    .set(value),
                None => self
                    .power_draw
                    .with_label_values(&[reading.direction()])
                    .set(value),
            }
        }
    }

    fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        self.fill_gauges();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(buf)
    }
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.encode_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            log::error!("metrics encode failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "encode failed").into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let observed = state.meter.observed();
    Json(HealthResponse {
        status: if observed > 0 { "ok" } else { "waiting" },
        readings_observed: observed,
        readings_total: Reading::ALL.len(),
    })
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "p1meter",
        "version": p1meter_core::VERSION,
        "endpoints": {
            "index": "/",
            "health": "/health",
            "metrics": state.metrics_path.clone(),
        },
        "readings": Reading::ALL
            .iter()
            .map(|reading| {
                let info = reading.info();
                serde_json::json!({
                    "obis": info.obis,
                    "unit": info.unit,
                    "description": info.description,
                })
            })
            .collect::<Vec<_>>(),
    }))
}

/// Build the axum router.
fn build_router(meter: Arc<MeterState>, metrics_path: &str) -> Router {
    let metrics_path = if metrics_path.starts_with('/') {
        metrics_path.to_string()
    } else {
        format!("/{metrics_path}")
    };
    let state = Arc::new(AppState::new(meter, metrics_path.clone()));

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route(&metrics_path, get(handle_metrics))
        .with_state(state)
}

/// Serve the snapshot until the process dies.
///
/// A listen address without a host part (`:9357`) binds every interface.
pub async fn run_server(
    meter: Arc<MeterState>,
    listen: &str,
    metrics_path: &str,
) -> io::Result<()> {
    let app = build_router(meter, metrics_path);
    let addr = if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    };
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("serving metrics on http://{addr}");
    axum::serve(listener, app).await
}
