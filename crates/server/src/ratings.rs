//! Rating queries, recomputed per request from the sales ledger.
//!
//! JSON API Endpoints:
//! - `GET /products/{id}/rating` — quintile stars + units sold for a product
//! - `GET /shops/{id}/rating`    — the same over the shop population
//!
//! Each request performs one aggregate pass and one sort; there is no cache,
//! so the answer always reflects the ledger at read time.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use bazari_core::domain::product::ProductId;
use bazari_core::domain::shop::ShopId;
use bazari_core::rating::{SalesLeaderboard, MAX_STARS, MIN_STARS};
use bazari_core::rating::service::{RatingService, SalesSourceError};
use bazari_db::repositories::SqlSalesLedger;
use bazari_db::DbPool;

#[derive(Clone)]
pub struct RatingsState {
    db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/products/{id}/rating", get(product_rating))
        .route("/shops/{id}/rating", get(shop_rating))
        .with_state(RatingsState { db_pool })
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: String,
    pub stars: u8,
    pub units_sold: u64,
    pub population: usize,
}

#[derive(Debug, Serialize)]
pub struct RatingError {
    pub error: String,
}

fn response_from_board<Id>(id: Id, raw: String, board: &SalesLeaderboard<Id>) -> RatingResponse
where
    Id: Clone + Eq + std::hash::Hash,
{
    // Empty population rates at the top; an entity that vanished between the
    // aggregate scan and this lookup bottoms out instead of erroring.
    let stars = if board.is_empty() {
        MAX_STARS
    } else {
        board.rating_of(&id).unwrap_or(MIN_STARS)
    };

    RatingResponse {
        id: raw,
        stars,
        units_sold: board.units_sold(&id).unwrap_or(0),
        population: board.len(),
    }
}

fn unavailable(error: SalesSourceError) -> (axum::http::StatusCode, Json<RatingError>) {
    warn!(event_name = "ratings.source_unavailable", error = %error, "rating read failed");
    (
        axum::http::StatusCode::SERVICE_UNAVAILABLE,
        Json(RatingError { error: "rating source unavailable".to_string() }),
    )
}

pub async fn product_rating(
    State(state): State<RatingsState>,
    Path(id): Path<String>,
) -> Result<Json<RatingResponse>, (axum::http::StatusCode, Json<RatingError>)> {
    let service = RatingService::new(SqlSalesLedger::new(state.db_pool.clone()));
    let board = service.product_leaderboard().await.map_err(unavailable)?;

    Ok(Json(response_from_board(ProductId(id.clone()), id, &board)))
}

pub async fn shop_rating(
    State(state): State<RatingsState>,
    Path(id): Path<String>,
) -> Result<Json<RatingResponse>, (axum::http::StatusCode, Json<RatingError>)> {
    let service = RatingService::new(SqlSalesLedger::new(state.db_pool.clone()));
    let board = service.shop_leaderboard().await.map_err(unavailable)?;

    Ok(Json(response_from_board(ShopId(id.clone()), id, &board)))
}
