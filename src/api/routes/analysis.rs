use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::analysis::{
    parse_combo, ComboSpec, Comparison, DeckRating, HiddenGemsReport, Sparkline, SparklineTarget,
    MAX_WEEKS,
};
use crate::api::state::AppState;
use crate::api::{row_filter, ApiError};
use crate::normalize::ComboKey;

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub a: String,
    pub b: String,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SparklineParams {
    pub blade: Option<String>,
    /// `blade|ratchet|bit[|assist]`
    pub combo: Option<String>,
    pub weeks: Option<usize>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeckRequest {
    pub combos: Vec<ComboSpec>,
    pub region: Option<String>,
}

fn combo_param(value: &str) -> Result<ComboKey, ApiError> {
    parse_combo(value).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid combo {:?}, expected blade|ratchet|bit",
            value
        ))
    })
}

pub async fn compare_blades(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<Comparison>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let comparison = state
        .analyzer()
        .compare_blades(&params.a, &params.b, &filter)
        .await?;
    Ok(Json(comparison))
}

pub async fn compare_combos(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<Comparison>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let a = combo_param(&params.a)?;
    let b = combo_param(&params.b)?;
    Ok(Json(state.analyzer().compare_combos(&a, &b, &filter).await?))
}

pub async fn sparkline(
    State(state): State<AppState>,
    Query(params): Query<SparklineParams>,
) -> Result<Json<Sparkline>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    let target = match (params.blade.as_deref(), params.combo.as_deref()) {
        (Some(blade), None) => SparklineTarget::blade(blade),
        (None, Some(combo)) => SparklineTarget::Combo(combo_param(combo)?),
        _ => {
            return Err(ApiError::BadRequest(
                "Specify exactly one of blade or combo".to_string(),
            ))
        }
    };
    let weeks = match params.weeks {
        Some(0) => return Err(ApiError::BadRequest("weeks must be greater than 0".to_string())),
        Some(w) if w > MAX_WEEKS => {
            return Err(ApiError::BadRequest(format!(
                "weeks must be at most {}",
                MAX_WEEKS
            )))
        }
        Some(w) => w,
        None => state.defaults().sparkline_weeks,
    };

    Ok(Json(state.analyzer().sparkline(&target, weeks, &filter).await?))
}

pub async fn hidden_gems(
    State(state): State<AppState>,
    Query(params): Query<RegionParams>,
) -> Result<Json<HiddenGemsReport>, ApiError> {
    let filter = row_filter(params.region.as_deref())?;
    Ok(Json(state.analyzer().hidden_gems(&filter).await?))
}

pub async fn rate_deck(
    State(state): State<AppState>,
    Json(request): Json<DeckRequest>,
) -> Result<Json<DeckRating>, ApiError> {
    let filter = row_filter(request.region.as_deref())?;
    Ok(Json(state.analyzer().rate_deck(&request.combos, &filter).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::testing::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_compare_blades() {
        let (status, json) = get_json(
            test_app(),
            "/api/compare/blades?a=Phoenix%20Wing&b=Wizard%20Rod",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["a"]["name"], "Phoenix Wing");
        assert_eq!(json["a"]["uses"], 3);
        assert_eq!(json["head_to_head"]["common_tournaments"], 3);
        assert_eq!(json["head_to_head"]["a_placed_higher"], 2);
        assert_eq!(json["head_to_head"]["b_placed_higher"], 1);
    }

    #[tokio::test]
    async fn test_compare_combos() {
        let (status, json) = get_json(
            test_app(),
            "/api/compare/combos?a=Phoenix%20Wing%7C9-60%7CBall&b=Shark%20Scale%7C4-60%7CLow%20Flat",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["a"]["uses"], 2);
        assert_eq!(json["b"]["uses"], 2);
        assert_eq!(json["head_to_head"]["a_placed_higher"], 1);

        let (status, json) =
            get_json(test_app(), "/api/compare/combos?a=Phoenix&b=Wizard%20Rod").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_sparkline() {
        let (status, json) = get_json(test_app(), "/api/sparkline?blade=Phoenix%20Wing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["weeks"], 8);
        assert_eq!(json["points"].as_array().unwrap().len(), 8);
        // No decay: 3 + 3 + 2
        assert_eq!(json["total"], 8.0);

        let (_, json) = get_json(test_app(), "/api/sparkline?combo=Phoenix%20Wing%7C9-60%7CBall&weeks=4").await;
        assert_eq!(json["entity"], "Phoenix Wing 9-60 Ball");
        assert_eq!(json["total"], 6.0);

        let (status, _) = get_json(test_app(), "/api/sparkline").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sparkline_weeks_bounds() {
        let (status, json) = get_json(test_app(), "/api/sparkline?blade=Phoenix%20Wing&weeks=520").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["points"].as_array().unwrap().len(), 520);

        let (status, json) =
            get_json(test_app(), "/api/sparkline?blade=Phoenix%20Wing&weeks=15000000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        let (status, _) = get_json(test_app(), "/api/sparkline?blade=Phoenix%20Wing&weeks=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hidden_gems() {
        let (status, json) = get_json(test_app(), "/api/gems").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["underused"].is_array());
        assert!(json["counter_meta"].is_array());
    }

    #[tokio::test]
    async fn test_rate_deck() {
        let body = r#"{"combos":[
            {"blade":"Phoenix Wing","ratchet":"9-60","bit":"Ball"},
            {"blade":"Wizard Rod","ratchet":"5-70","bit":"Hexa"},
            {"blade":"Shark Scale","ratchet":"4-60","bit":"Low Flat"}
        ]}"#;
        let (status, json) = post_json(test_app(), "/api/deck/rate", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["combos"].as_array().unwrap().len(), 3);
        assert_eq!(json["combos"][0]["has_data"], true);
        assert!(json["overall_score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_rate_deck_wrong_size() {
        let body = r#"{"combos":[{"blade":"Phoenix Wing","ratchet":"9-60","bit":"Ball"}]}"#;
        let (status, json) = post_json(test_app(), "/api/deck/rate", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }
}
