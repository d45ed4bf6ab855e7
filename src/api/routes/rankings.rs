use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analysis::RankedEntry;
use crate::api::state::AppState;
use crate::api::{row_filter, ApiError};
use crate::models::PartKind;
use crate::normalize::{normalize_blade, ComboKey};

#[derive(Debug, Deserialize)]
pub struct RankingParams {
    pub region: Option<String>,
    pub limit: Option<usize>,
    pub min_uses: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BladeComboParams {
    pub region: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse<K> {
    pub category: String,
    pub region: Option<String>,
    pub count: usize,
    pub rankings: Vec<RankedEntry<K>>,
}

impl<K> RankingsResponse<K> {
    fn new(category: impl Into<String>, region: Option<String>, rankings: Vec<RankedEntry<K>>) -> Self {
        Self {
            category: category.into(),
            region,
            count: rankings.len(),
            rankings,
        }
    }
}

fn nonzero_limit(limit: Option<usize>, default: usize) -> Result<usize, ApiError> {
    match limit {
        Some(0) => Err(ApiError::BadRequest("limit must be greater than 0".to_string())),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

pub async fn blades(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingsResponse<String>>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let defaults = state.defaults();
    let limit = nonzero_limit(params.limit, defaults.blade_limit)?;
    let min_uses = params.min_uses.unwrap_or(defaults.blade_min_uses);

    let rankings = state.analyzer().ranked_blades(&filter, limit, min_uses).await?;
    Ok(Json(RankingsResponse::new("blades", params.region, rankings)))
}

pub async fn combos(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingsResponse<ComboKey>>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let defaults = state.defaults();
    let limit = nonzero_limit(params.limit, defaults.combo_limit)?;
    let min_uses = params.min_uses.unwrap_or(defaults.combo_min_uses);

    let rankings = state.analyzer().ranked_combos(&filter, limit, min_uses).await?;
    Ok(Json(RankingsResponse::new("combos", params.region, rankings)))
}

pub async fn parts(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<RankingParams>,
) -> Result<Json<RankingsResponse<String>>, ApiError> {
    let kind: PartKind = kind.parse().map_err(ApiError::NotFound)?;
    let filter = row_filter(params.region.as_deref())?;
    let defaults = state.defaults();
    let limit = nonzero_limit(params.limit, defaults.part_limit)?;
    let min_uses = params.min_uses.unwrap_or(defaults.part_min_uses);

    let rankings = state
        .analyzer()
        .ranked_parts(kind, &filter, limit, min_uses)
        .await?;
    Ok(Json(RankingsResponse::new(kind.as_str(), params.region, rankings)))
}

pub async fn blade_combos(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<BladeComboParams>,
) -> Result<Json<RankingsResponse<ComboKey>>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let limit = nonzero_limit(params.limit, state.defaults().blade_combo_limit)?;
    let blade = normalize_blade(&name);

    let rankings = state
        .analyzer()
        .best_combos_for_blade(&blade, &filter, limit)
        .await?;
    if rankings.is_empty() {
        return Err(ApiError::NotFound(format!("No placements for blade {}", blade)));
    }
    Ok(Json(RankingsResponse::new(blade, params.region, rankings)))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::testing::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_blade_rankings_defaults() {
        let (status, json) = get_json(test_app(), "/api/rankings/blades").await;
        assert_eq!(status, StatusCode::OK);

        // Shark Scale has 2 uses, below the default minimum of 3
        assert_eq!(json["count"], 2);
        let rankings = json["rankings"].as_array().unwrap();
        assert_eq!(rankings[0]["name"], "Phoenix Wing");
        assert_eq!(rankings[0]["rank"], 1);
        assert_eq!(rankings[0]["score"], 6.17);
        assert_eq!(rankings[1]["name"], "Wizard Rod");
        assert_eq!(rankings[1]["score"], 4.78);
    }

    #[tokio::test]
    async fn test_blade_rankings_region_and_min_uses() {
        let (status, json) =
            get_json(test_app(), "/api/rankings/blades?region=EU&min_uses=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["region"], "EU");

        let names: Vec<&str> = json["rankings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Wizard Rod", "Phoenix Wing", "Shark Scale"]);
    }

    #[tokio::test]
    async fn test_bad_region() {
        let (status, json) = get_json(test_app(), "/api/rankings/blades?region=MARS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let (status, _) = get_json(test_app(), "/api/rankings/combos?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_combo_rankings() {
        let (status, json) = get_json(test_app(), "/api/rankings/combos?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 2);
        assert_eq!(json["rankings"][0]["name"], "Phoenix Wing 9-60 Ball");
        assert_eq!(json["rankings"][0]["key"]["ratchet"], "9-60");
        assert_eq!(json["rankings"][1]["name"], "Wizard Rod 5-70 Hexa");
    }

    #[tokio::test]
    async fn test_part_rankings() {
        let (status, json) = get_json(test_app(), "/api/rankings/parts/bits?min_uses=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["category"], "bit");
        assert_eq!(json["rankings"][0]["name"], "Ball");
        assert_eq!(json["count"], 4);

        let (status, _) = get_json(test_app(), "/api/rankings/parts/wheels").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blade_combos() {
        let (status, json) = get_json(test_app(), "/api/blades/phoenix/combos").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["category"], "Phoenix Wing");
        assert_eq!(json["count"], 2);
        assert_eq!(json["rankings"][0]["name"], "Phoenix Wing 9-60 Ball");

        let (status, json) = get_json(test_app(), "/api/blades/Unknown%20Blade/combos").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }
}
