use crate::classify::LegendRow;
use crate::config::AppConfig;
use crate::context::MapContext;
use crate::error::PipelineError;
use crate::interaction::{
    HighlightState, InfoReadout, InfoView, InteractionController, StyledLayer,
};
use crate::style::FeatureStyle;
use crate::types::FeatureProperties;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

// Wrapper for RTree indexing
struct FeatureIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

type Controller = InteractionController<StyledLayer, InfoReadout>;

pub struct LoadedMap {
    ctx: MapContext,
    shapes: Vec<Option<MultiPolygon<f64>>>,
    tree: RTree<FeatureIndex>,
    interaction: Mutex<Controller>,
}

/// A server whose pipeline failed keeps running and reports the failure on
/// every map endpoint.
pub enum AppState {
    Ready(LoadedMap),
    Failed(String),
}

impl AppState {
    pub fn new(map: Result<MapContext, PipelineError>) -> Self {
        match map {
            Ok(ctx) => Self::Ready(LoadedMap::new(ctx)),
            Err(e) => {
                error!("Map data unavailable: {e}");
                Self::Failed(e.to_string())
            }
        }
    }

    fn map(&self) -> Result<&LoadedMap, ApiError> {
        match self {
            Self::Ready(map) => Ok(map),
            Self::Failed(reason) => Err(ApiError::Unavailable(reason.clone())),
        }
    }
}

impl LoadedMap {
    pub fn new(ctx: MapContext) -> Self {
        info!("Building spatial index for {} features...", ctx.features.len());
        let shapes: Vec<Option<MultiPolygon<f64>>> = ctx
            .features
            .features
            .iter()
            .map(|feature| {
                let geometry = feature.geometry.as_ref()?;
                let valid_geo: geo::Geometry<f64> = geometry.value.clone().try_into().ok()?;
                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => Some(mp),
                    geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
                    _ => None, // Points and lines can't be hovered
                }
            })
            .collect();

        let tree_items: Vec<FeatureIndex> = shapes
            .iter()
            .enumerate()
            .filter_map(|(index, shape)| {
                let rect = shape.as_ref()?.bounding_rect()?;
                Some(FeatureIndex {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        let controller = InteractionController::new(
            &ctx,
            StyledLayer::new(&ctx),
            InfoReadout::new(ctx.current_aggregate()),
        );

        Self {
            shapes,
            tree: RTree::bulk_load(tree_items),
            interaction: Mutex::new(controller),
            ctx,
        }
    }

    /// The lowest-indexed feature whose polygon contains the point.
    fn feature_at(&self, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&index| {
                self.shapes
                    .get(index)
                    .and_then(Option::as_ref)
                    .is_some_and(|shape| shape.contains(&point))
            })
            .min()
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unavailable(String),
    NotFound(usize),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unavailable(reason) => (StatusCode::SERVICE_UNAVAILABLE, reason),
            Self::NotFound(index) => {
                (StatusCode::NOT_FOUND, format!("no feature at index {index}"))
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    index: usize,
    id: String,
    properties: FeatureProperties,
}

#[derive(Serialize)]
pub struct InteractionResponse {
    index: usize,
    id: String,
    state: HighlightState,
    style: Option<FeatureStyle>,
    info: InfoView,
}

pub fn router(state: Arc<AppState>, config: &AppConfig) -> Router {
    let router = Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/features", get(features_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/info", get(info_handler))
        .route("/api/query", get(query_handler))
        .route("/api/features/:index/enter", post(enter_handler))
        .route("/api/features/:index/leave", post(leave_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    match &config.server.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

pub async fn start_server(
    config: AppConfig,
    map: Result<MapContext, PipelineError>,
) -> Result<()> {
    let state = Arc::new(AppState::new(map));

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = router(state, &config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.as_ref() {
        AppState::Ready(map) => Json(json!({
            "status": "ready",
            "features": map.ctx.features.len(),
            "worldwide_average": map.ctx.current_aggregate(),
            "joins": map.ctx.joins,
        }))
        .into_response(),
        AppState::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "failed", "error": reason })),
        )
            .into_response(),
    }
}

async fn features_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<geojson::FeatureCollection>, ApiError> {
    Ok(Json(state.map()?.ctx.features.to_geojson()))
}

async fn legend_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LegendRow>>, ApiError> {
    Ok(Json(state.map()?.ctx.legend()))
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Result<Json<InfoView>, ApiError> {
    let map = state.map()?;
    let controller = map.interaction.lock().await;
    Ok(Json(controller.info().view()))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Option<QueryResponse>>, ApiError> {
    let map = state.map()?;
    let found = map.feature_at(params.lon, params.lat).map(|index| {
        let feature = &map.ctx.features.features[index];
        QueryResponse {
            index,
            id: feature.id.clone(),
            properties: feature.properties.clone(),
        }
    });
    Ok(Json(found))
}

async fn enter_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<InteractionResponse>, ApiError> {
    interact(&state, index, |controller, ctx| {
        controller.on_feature_enter(ctx, index)
    })
    .await
}

async fn leave_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<InteractionResponse>, ApiError> {
    interact(&state, index, |controller, ctx| {
        controller.on_feature_leave(ctx, index)
    })
    .await
}

async fn interact<F>(
    state: &AppState,
    index: usize,
    event: F,
) -> Result<Json<InteractionResponse>, ApiError>
where
    F: FnOnce(&mut Controller, &MapContext) -> Option<HighlightState>,
{
    let map = state.map()?;
    let feature = map
        .ctx
        .features
        .features
        .get(index)
        .ok_or(ApiError::NotFound(index))?;

    let mut controller = map.interaction.lock().await;
    let highlight = event(&mut controller, &map.ctx).ok_or(ApiError::NotFound(index))?;
    Ok(Json(InteractionResponse {
        index,
        id: feature.id.clone(),
        state: highlight,
        style: controller.layer().style(index).cloned(),
        info: controller.info().view(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{JoinSummary, PipelineOutput};
    use crate::stats::AggregateStat;
    use crate::style::StyleSheet;
    use crate::types::{EnrichedFeatureCollection, GeoFeature};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use geojson::{Geometry, Value as GeoValue};
    use serde_json::Value;
    use tower::ServiceExt;

    fn square(name: &str, x: f64, percentage: f64) -> GeoFeature {
        let ring = vec![
            vec![x, 0.0],
            vec![x + 1.0, 0.0],
            vec![x + 1.0, 1.0],
            vec![x, 1.0],
            vec![x, 0.0],
        ];
        GeoFeature {
            id: name.to_string(),
            bbox: None,
            geometry: Some(Geometry::new(GeoValue::Polygon(vec![ring]))),
            properties: FeatureProperties {
                percentage,
                name: name.to_string(),
            },
        }
    }

    fn context() -> MapContext {
        context_with(vec![square("Peru", 0.0, 58.0), square("Chad", 5.0, 88.0)])
    }

    fn context_with(features: Vec<GeoFeature>) -> MapContext {
        MapContext::new(
            PipelineOutput {
                countries: Vec::new(),
                features: EnrichedFeatureCollection { features },
                aggregate: AggregateStat::Mean(73.0),
                joins: JoinSummary::default(),
            },
            StyleSheet::default(),
        )
    }

    fn config() -> AppConfig {
        AppConfig::from_toml("[input]\npercentages = \"a\"\ncountries = \"b\"\nworld = \"c\"\n")
            .unwrap()
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn query_finds_feature_under_point() {
        let app = router(Arc::new(AppState::new(Ok(context()))), &config());

        let (status, body) = call(app.clone(), "GET", "/api/query?lat=0.5&lon=5.5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], 1);
        assert_eq!(body["id"], "Chad");
        assert_eq!(body["properties"]["percentage"], 88.0);

        let (_, body) = call(app, "GET", "/api/query?lat=0.5&lon=3.0").await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn enter_and_leave_drive_the_info_readout() {
        let app = router(Arc::new(AppState::new(Ok(context()))), &config());

        let (status, body) = call(app.clone(), "POST", "/api/features/0/enter").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], 0);
        assert_eq!(body["id"], "Peru");
        assert_eq!(body["state"], "highlighted");
        assert_eq!(body["style"]["weight"], 3.0);
        assert_eq!(body["info"]["kind"], "country");
        assert_eq!(body["info"]["name"], "Peru");

        let (_, body) = call(app.clone(), "POST", "/api/features/0/leave").await;
        assert_eq!(body["state"], "normal");
        assert_eq!(body["style"]["weight"], 1.0);

        let (_, body) = call(app, "GET", "/api/info").await;
        assert_eq!(body["kind"], "worldwide");
        assert_eq!(body["average"], "73.00");
    }

    #[tokio::test]
    async fn unknown_index_is_not_found() {
        let app = router(Arc::new(AppState::new(Ok(context()))), &config());
        let (status, body) = call(app.clone(), "POST", "/api/features/2/enter").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("index 2"));

        let (_, body) = call(app, "GET", "/api/info").await;
        assert_eq!(body["kind"], "worldwide");
    }

    #[tokio::test]
    async fn same_named_features_highlight_independently() {
        let features = vec![square("Congo", 0.0, 60.0), square("Congo", 5.0, 90.0)];
        let app = router(Arc::new(AppState::new(Ok(context_with(features)))), &config());

        let (_, body) = call(app.clone(), "POST", "/api/features/1/enter").await;
        assert_eq!(body["index"], 1);
        assert_eq!(body["info"]["percentage"], 90.0);

        let (_, body) = call(app.clone(), "POST", "/api/features/0/leave").await;
        assert_eq!(body["state"], "normal");
        assert_eq!(body["info"]["kind"], "worldwide");

        let (_, body) = call(app, "POST", "/api/features/1/leave").await;
        assert_eq!(body["style"]["weight"], 1.0);
    }

    #[tokio::test]
    async fn failed_pipeline_reports_visible_error() {
        let failed = Err(PipelineError::network("./sni.json", "connection refused"));
        let app = router(Arc::new(AppState::new(failed)), &config());

        let (status, body) = call(app.clone(), "GET", "/api/features").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));

        let (status, body) = call(app, "GET", "/api/status").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "failed");
    }

    #[tokio::test]
    async fn legend_and_features_are_served() {
        let app = router(Arc::new(AppState::new(Ok(context()))), &config());

        let (_, legend) = call(app.clone(), "GET", "/api/legend").await;
        assert_eq!(legend.as_array().unwrap().len(), 10);
        assert_eq!(legend[0]["start"], 45.0);

        let (_, features) = call(app, "GET", "/api/features").await;
        assert_eq!(features["features"].as_array().unwrap().len(), 2);
        assert_eq!(features["features"][1]["id"], "Chad");
    }
}
