// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::StatusCode;
use ndarray::{Array2, ArrayView1};
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};
use warp::{Filter, Rejection, Reply};

use crate::state::{SettingsUpdate, SharedThermalState, ThermalSnapshot};

/// The viewer page served at `/`.
const INDEX_PAGE: &str = include_str!("index.html");

/// Settings payloads are tiny; anything bigger than this is refused outright.
const MAX_SETTINGS_BODY: u64 = 16 * 1024;

/// Serializes a grid as a list of rows.
struct GridRows<'a>(&'a Array2<f32>);

struct GridRow<'a>(ArrayView1<'a, f32>);

impl Serialize for GridRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.outer_iter().map(GridRow))
    }
}

impl Serialize for GridRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[derive(Serialize)]
struct ThermalResponse<'a> {
    temperature: f32,
    min_temp: f32,
    max_temp: f32,
    image: Option<GridRows<'a>>,
    /// Seconds since the Unix epoch.
    timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_displayed: Option<f32>,
}

impl<'a> From<&'a ThermalSnapshot> for ThermalResponse<'a> {
    fn from(snapshot: &'a ThermalSnapshot) -> Self {
        Self {
            temperature: snapshot.temperature,
            min_temp: snapshot.min_temp,
            max_temp: snapshot.max_temp,
            image: snapshot.image.as_ref().map(|frame| GridRows(&frame.grid)),
            timestamp: unix_seconds(snapshot.timestamp),
            min_displayed: snapshot.min_displayed(),
        }
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs_f64())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum StatusReply {
    Success,
    Error { message: String },
}

impl StatusReply {
    fn with_status(&self, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
        warp::reply::with_status(warp::reply::json(self), status)
    }
}

fn with_state(
    state: SharedThermalState,
) -> impl Filter<Extract = (SharedThermalState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn get_thermal(state: SharedThermalState) -> impl Reply {
    // Serialization happens after the lock has been released, on our own handle to the snapshot.
    let snapshot = state.read();
    warp::reply::json(&ThermalResponse::from(snapshot.as_ref()))
}

fn post_settings(body: Bytes, state: SharedThermalState) -> impl Reply {
    let result = SettingsUpdate::from_json(&body).and_then(|update| state.update_settings(update));
    match result {
        Ok(settings) => {
            info!(
                min_temp = settings.min_temp,
                max_temp = settings.max_temp,
                rotation = %settings.rotation,
                "Display settings changed"
            );
            StatusReply::Success.with_status(StatusCode::OK)
        }
        Err(err) => {
            warn!(error = %err, "Rejected settings update");
            StatusReply::Error {
                message: err.to_string(),
            }
            .with_status(StatusCode::BAD_REQUEST)
        }
    }
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else if rejection
        .find::<warp::reject::MethodNotAllowed>()
        .is_some()
    {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "request body length required")
    } else {
        error!(?rejection, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };
    Ok(StatusReply::Error {
        message: message.to_string(),
    }
    .with_status(status))
}

/// All of the HTTP routes, sharing `state`.
pub(crate) fn routes(
    state: SharedThermalState,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    // Paths are matched before methods, so unknown paths are a 404 rather than a 405.
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_PAGE));
    let thermal = warp::path("thermal")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(get_thermal);
    let settings = warp::path("settings")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_SETTINGS_BODY))
        .and(warp::body::bytes())
        .and(with_state(state))
        .map(post_settings);
    index
        .or(thermal)
        .or(settings)
        .recover(handle_rejection)
        .with(warp::trace::request())
}
