use crate::config::AppConfig;
use crate::render::{Figure, Projection};
use crate::types::{BoundaryFeature, CaseRecord};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// A boundary feature with its joined case count, hoverable in the
/// served figure.
pub struct Region {
    pub id: String,
    pub count: u32,
    pub geometry: MultiPolygon<f64>,
}

/// Matched (feature, record) pairs. Unmatched entries on either side
/// are dropped, mirroring the join the renderer performs.
pub fn matched_regions(boundaries: &[BoundaryFeature], records: &[CaseRecord]) -> Vec<Region> {
    let counts: HashMap<&str, u32> = records.iter().map(|r| (r.id.as_str(), r.count)).collect();

    boundaries
        .iter()
        .filter_map(|feature| {
            counts.get(feature.id.as_str()).map(|&count| Region {
                id: feature.id.clone(),
                count,
                geometry: feature.geometry.clone(),
            })
        })
        .collect()
}

// Wrapper for RTree indexing
struct RegionIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    regions: Vec<Region>,
    tree: RTree<RegionIndex>,
    projection: Projection,
    title: String,
}

#[derive(Deserialize)]
struct QueryParams {
    /// Figure pixel coordinates.
    px: f64,
    py: f64,
}

#[derive(Serialize)]
struct QueryResponse {
    id: String,
    count: u32,
}

pub async fn start_server(config: &AppConfig, figure: &Figure, regions: Vec<Region>) -> Result<()> {
    println!("Building spatial index for {} regions...", regions.len());
    let tree_items: Vec<RegionIndex> = regions
        .iter()
        .enumerate()
        .filter_map(|(index, region)| {
            region.geometry.bounding_rect().map(|rect| RegionIndex {
                index,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let state = Arc::new(AppState {
        regions,
        tree,
        projection: figure.projection,
        title: figure.title.clone(),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    println!("Serving figure on http://{}", addr);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/api/query", get(query_handler))
        .nest_service("/figure", ServeDir::new(&config.output.figure_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<style>
  body { font-family: sans-serif; margin: 1rem; }
  #tip { position: fixed; padding: 2px 6px; background: #08306b; color: white; pointer-events: none; visibility: hidden; }
</style>
</head>
<body>
<h1>__TITLE__</h1>
<img id="map" src="/figure/map.png" alt="__TITLE__">
<div id="tip"></div>
<script>
const map = document.getElementById('map');
const tip = document.getElementById('tip');
map.addEventListener('mousemove', async (e) => {
  const res = await fetch(`/api/query?px=${e.offsetX}&py=${e.offsetY}`);
  const hit = await res.json();
  if (hit) {
    tip.textContent = `${hit.id}: ${hit.count} confirmed cases`;
    tip.style.left = (e.clientX + 12) + 'px';
    tip.style.top = (e.clientY + 12) + 'px';
    tip.style.visibility = 'visible';
  } else {
    tip.style.visibility = 'hidden';
  }
});
map.addEventListener('mouseleave', () => { tip.style.visibility = 'hidden'; });
</script>
</body>
</html>
"#;

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(INDEX_HTML.replace("__TITLE__", &state.title))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let (lon, lat) = state.projection.unproject(params.px, params.py);
    let point = Point::new(lon, lat);
    let envelope = AABB::from_point([lon, lat]);

    // Envelope candidates first, exact containment second.
    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        if let Some(region) = state.regions.get(candidate.index) {
            if region.geometry.contains(&point) {
                return Json(Some(QueryResponse {
                    id: region.id.clone(),
                    count: region.count,
                }));
            }
        }
    }

    Json(None)
}
