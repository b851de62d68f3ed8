use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::ProductId;
use crate::domain::shop::ShopId;
use crate::rating::{quintile_rating, SalesLeaderboard, MAX_STARS, MIN_STARS};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SalesSourceError {
    #[error("sales source unavailable: {0}")]
    Unavailable(String),
}

/// One aggregate pass over the sales ledger: the full population of one kind
/// with per-entity totals, in the population's natural insertion order.
///
/// Implementations must include zero-sales entities and must never issue one
/// query per entity.
#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn product_population(&self) -> Result<Vec<(ProductId, u64)>, SalesSourceError>;
    async fn shop_population(&self) -> Result<Vec<(ShopId, u64)>, SalesSourceError>;
}

/// Stateless rating reads over a [`SalesSource`]. Every call re-aggregates and
/// re-ranks; nothing is cached, so results are always consistent with the
/// ledger at call time.
///
/// Degenerate cases follow the documented policy: an empty population rates
/// as `MAX_STARS`, an entity that vanished between the aggregate scan and the
/// lookup rates as `MIN_STARS` rather than erroring.
pub struct RatingService<S> {
    source: S,
}

impl<S> RatingService<S>
where
    S: SalesSource,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn product_rating(&self, id: &ProductId) -> Result<u8, SalesSourceError> {
        let population = self.source.product_population().await?;
        Ok(rating_within(population, id))
    }

    pub async fn product_sales_total(&self, id: &ProductId) -> Result<u64, SalesSourceError> {
        let population = self.source.product_population().await?;
        Ok(total_within(population, id))
    }

    pub async fn product_leaderboard(
        &self,
    ) -> Result<SalesLeaderboard<ProductId>, SalesSourceError> {
        Ok(SalesLeaderboard::rank(self.source.product_population().await?))
    }

    pub async fn shop_rating(&self, id: &ShopId) -> Result<u8, SalesSourceError> {
        let population = self.source.shop_population().await?;
        Ok(rating_within(population, id))
    }

    pub async fn shop_sales_total(&self, id: &ShopId) -> Result<u64, SalesSourceError> {
        let population = self.source.shop_population().await?;
        Ok(total_within(population, id))
    }

    pub async fn shop_leaderboard(&self) -> Result<SalesLeaderboard<ShopId>, SalesSourceError> {
        Ok(SalesLeaderboard::rank(self.source.shop_population().await?))
    }
}

fn rating_within<Id>(population: Vec<(Id, u64)>, id: &Id) -> u8
where
    Id: Clone + Eq + std::hash::Hash,
{
    if population.is_empty() {
        return MAX_STARS;
    }

    let board = SalesLeaderboard::rank(population);
    match board.rank_of(id) {
        Some(rank) => quintile_rating(rank, board.len()),
        None => MIN_STARS,
    }
}

fn total_within<Id>(population: Vec<(Id, u64)>, id: &Id) -> u64
where
    Id: Eq,
{
    population.into_iter().find(|(entity, _)| entity == id).map(|(_, total)| total).unwrap_or(0)
}
