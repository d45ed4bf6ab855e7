use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::analysis::{
    DatabaseSummary, MetaDistribution, MetaEvolution, MetaSnapshot, MetaSpotlight, ShareOverTime,
};
use crate::api::state::AppState;
use crate::api::{row_filter, ApiError};

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    pub region: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DistributionParams {
    pub region: Option<String>,
    /// Trailing window; all time when omitted
    pub days: Option<i64>,
    pub top: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub region: Option<String>,
    pub top: Option<usize>,
}

fn positive_days(days: i64) -> Result<i64, ApiError> {
    if days <= 0 {
        return Err(ApiError::BadRequest("days must be greater than 0".to_string()));
    }
    Ok(days)
}

pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<RegionParams>,
) -> Result<Json<DatabaseSummary>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    Ok(Json(state.analyzer().database_summary(&filter).await?))
}

pub async fn snapshot(
    State(state): State<AppState>,
    Query(params): Query<SnapshotParams>,
) -> Result<Json<MetaSnapshot>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let days = positive_days(params.days.unwrap_or(state.defaults().snapshot_days))?;
    Ok(Json(state.analyzer().meta_snapshot(&filter, days).await?))
}

pub async fn spotlight(
    State(state): State<AppState>,
    Query(params): Query<RegionParams>,
) -> Result<Json<MetaSpotlight>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    Ok(Json(state.analyzer().meta_spotlight(&filter).await?))
}

pub async fn distribution(
    State(state): State<AppState>,
    Query(params): Query<DistributionParams>,
) -> Result<Json<MetaDistribution>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let days = params.days.map(positive_days).transpose()?;
    let top = params.top.unwrap_or(state.defaults().distribution_top);
    Ok(Json(state.analyzer().meta_distribution(&filter, days, top).await?))
}

pub async fn share_over_time(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<ShareOverTime>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let top = params.top.unwrap_or(state.defaults().share_top);
    Ok(Json(state.analyzer().meta_share_over_time(&filter, top).await?))
}

pub async fn evolution(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<MetaEvolution>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let top = params.top.unwrap_or(state.defaults().evolution_top);
    Ok(Json(state.analyzer().meta_evolution(&filter, top).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::testing::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_summary() {
        let (status, json) = get_json(test_app(), "/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tournaments"], 3);
        assert_eq!(json["unique_blades"], 3);
        assert_eq!(json["latest_tournament"], "2025-06-30");

        let (_, json) = get_json(test_app(), "/api/summary?region=na").await;
        assert_eq!(json["tournaments"], 2);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (status, json) = get_json(test_app(), "/api/meta/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["period_days"], 30);
        assert_eq!(json["tournaments"], 2);
        // Phoenix Wing and Wizard Rod tie on uses; wins break the tie
        assert_eq!(json["top_blades"][0]["name"], "Phoenix Wing");
        assert_eq!(json["top_blades"][0]["wins"], 2);

        let (status, _) = get_json(test_app(), "/api/meta/snapshot?days=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_spotlight() {
        let (status, json) = get_json(test_app(), "/api/meta/spotlight").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["anchor_date"], "2025-06-30");
        assert_eq!(json["tournaments"], 2);
        assert_eq!(json["champion"]["blade"], "Phoenix Wing");
        assert_eq!(json["champion"]["best_combo"], "Phoenix Wing 9-60 Ball");
    }

    #[tokio::test]
    async fn test_distribution_with_others() {
        let (status, json) = get_json(test_app(), "/api/meta/distribution?top=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_uses"], 8);
        assert!(json["period_days"].is_null());

        let slices = json["slices"].as_array().unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[2]["name"], "Others");
        assert_eq!(slices[2]["uses"], 2);
        assert_eq!(slices[2]["share"], 25.0);
    }

    #[tokio::test]
    async fn test_share_and_evolution() {
        let (status, json) = get_json(test_app(), "/api/meta/share").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["months"].as_array().unwrap().len(), 2);

        let (status, json) = get_json(test_app(), "/api/meta/evolution?top=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["eras"].as_array().unwrap().len(), 4);
        assert_eq!(json["journeys"].as_array().unwrap().len(), 2);
    }
}
