//! Meta analysis entry points.
//!
//! [`Analyzer`] wraps a [`RowSource`]. Every entry point fixes its
//! reference date once, fetches the rows in scope and runs the pure
//! report functions of the submodules over them. Nothing is cached
//! between calls.

pub mod aggregate;
pub mod compare;
pub mod deck;
pub mod evolution;
pub mod gems;
pub mod meta;
pub mod rankings;
pub mod sparkline;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::debug;

use crate::models::{PartKind, PlacementRecord};
use crate::normalize::ComboKey;
use crate::storage::{RowFilter, RowSource, StorageError};

pub use aggregate::FinalizedAggregate;
pub use compare::{parse_combo, Comparison, HeadToHead, SideStats};
pub use deck::{ComboRating, ComboSpec, DeckRating, SubScores, DECK_SIZE};
pub use evolution::{EraSummary, MetaEvolution, MonthSummary, RankJourney};
pub use gems::{EnhancedGem, HiddenGemsReport};
pub use meta::{
    Champion, DatabaseSummary, MetaDistribution, MetaSnapshot, MetaSpotlight, ShareOverTime,
    ShareSeries, ShareShift, ShareSlice, UsageCount,
};
pub use rankings::RankedEntry;
pub use sparkline::{Sparkline, SparklinePoint, SparklineTarget, MAX_WEEKS};

/// Errors surfaced by the analysis entry points.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("A deck needs exactly {} combos, got {0}", DECK_SIZE)]
    InvalidDeck(usize),
}

/// Report generator over one row source.
pub struct Analyzer<S: ?Sized> {
    source: Arc<S>,
    reference_date: Option<NaiveDate>,
}

impl<S: ?Sized> Clone for Analyzer<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            reference_date: self.reference_date,
        }
    }
}

impl<S: RowSource + ?Sized> Analyzer<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            reference_date: None,
        }
    }

    /// Builder method to pin the reference date instead of using today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Reference date for one call.
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    async fn rows(&self, filter: &RowFilter) -> Result<Vec<PlacementRecord>, AnalysisError> {
        let rows = self.source.fetch_rows(filter).await?;
        debug!("Fetched {} rows (region={:?})", rows.len(), filter.region);
        Ok(rows)
    }

    pub async fn database_summary(&self, filter: &RowFilter) -> Result<DatabaseSummary, AnalysisError> {
        let rows = self.rows(filter).await?;
        Ok(meta::database_summary(&rows))
    }

    pub async fn ranked_blades(
        &self,
        filter: &RowFilter,
        limit: usize,
        min_uses: u32,
    ) -> Result<Vec<RankedEntry<String>>, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(rankings::ranked_blades(&rows, limit, min_uses, reference))
    }

    pub async fn ranked_combos(
        &self,
        filter: &RowFilter,
        limit: usize,
        min_uses: u32,
    ) -> Result<Vec<RankedEntry<ComboKey>>, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(rankings::ranked_combos(&rows, limit, min_uses, reference))
    }

    pub async fn ranked_parts(
        &self,
        kind: PartKind,
        filter: &RowFilter,
        limit: usize,
        min_uses: u32,
    ) -> Result<Vec<RankedEntry<String>>, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(rankings::ranked_parts(&rows, kind, limit, min_uses, reference))
    }

    pub async fn best_combos_for_blade(
        &self,
        blade: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<RankedEntry<ComboKey>>, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(rankings::best_combos_for_blade(&rows, blade, limit, reference))
    }

    pub async fn compare_blades(
        &self,
        a: &str,
        b: &str,
        filter: &RowFilter,
    ) -> Result<Comparison, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(compare::compare_blades(&rows, a, b, reference))
    }

    pub async fn compare_combos(
        &self,
        a: &ComboKey,
        b: &ComboKey,
        filter: &RowFilter,
    ) -> Result<Comparison, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(compare::compare_combos(&rows, a, b, reference))
    }

    pub async fn meta_snapshot(
        &self,
        filter: &RowFilter,
        days: i64,
    ) -> Result<MetaSnapshot, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(meta::meta_snapshot(&rows, days, reference))
    }

    /// Anchored at the latest tournament in scope, not the reference date.
    pub async fn meta_spotlight(&self, filter: &RowFilter) -> Result<MetaSpotlight, AnalysisError> {
        let rows = self.rows(filter).await?;
        Ok(meta::meta_spotlight(&rows))
    }

    pub async fn meta_distribution(
        &self,
        filter: &RowFilter,
        days: Option<i64>,
        top: usize,
    ) -> Result<MetaDistribution, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(meta::meta_distribution(&rows, days, top, reference))
    }

    pub async fn meta_share_over_time(
        &self,
        filter: &RowFilter,
        top: usize,
    ) -> Result<ShareOverTime, AnalysisError> {
        let rows = self.rows(filter).await?;
        Ok(meta::meta_share_over_time(&rows, top))
    }

    pub async fn meta_evolution(
        &self,
        filter: &RowFilter,
        top: usize,
    ) -> Result<MetaEvolution, AnalysisError> {
        let rows = self.rows(filter).await?;
        Ok(evolution::meta_evolution(&rows, top))
    }

    pub async fn sparkline(
        &self,
        target: &SparklineTarget,
        weeks: usize,
        filter: &RowFilter,
    ) -> Result<Sparkline, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(sparkline::sparkline(&rows, target, weeks, reference))
    }

    pub async fn hidden_gems(&self, filter: &RowFilter) -> Result<HiddenGemsReport, AnalysisError> {
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        Ok(gems::hidden_gems(&rows, reference))
    }

    /// Deck size is checked before any rows are fetched.
    pub async fn rate_deck(
        &self,
        combos: &[ComboSpec],
        filter: &RowFilter,
    ) -> Result<DeckRating, AnalysisError> {
        if combos.len() != DECK_SIZE {
            return Err(AnalysisError::InvalidDeck(combos.len()));
        }
        let reference = self.reference_date();
        let rows = self.rows(filter).await?;
        deck::rate_deck(combos, &rows, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use crate::storage::MemorySource;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn fixture() -> Vec<PlacementRecord> {
        let d = |n: i64| reference() - Duration::days(n);
        vec![
            PlacementRecord::new("t1", d(0), 1, "a", "Phoenix Wing", "9-60", "Ball").with_region(Region::Na),
            PlacementRecord::new("t2", d(10), 2, "b", "Phoenix Wing", "9-60", "Ball").with_region(Region::Na),
            PlacementRecord::new("t3", d(40), 3, "c", "Phoenix Wing", "9-60", "Ball").with_region(Region::Eu),
            PlacementRecord::new("t3", d(40), 1, "d", "Wizard Rod", "5-70", "Hexa").with_region(Region::Eu),
        ]
    }

    fn analyzer() -> Analyzer<MemorySource> {
        Analyzer::new(Arc::new(MemorySource::new(fixture()))).with_reference_date(reference())
    }

    /// Counts fetches and fails every one.
    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RowSource for FailingSource {
        async fn fetch_rows(&self, _filter: &RowFilter) -> Result<Vec<PlacementRecord>, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::PathNotFound(PathBuf::from("missing.jsonl")))
        }
    }

    #[tokio::test]
    async fn test_ranked_blades_end_to_end() {
        let blades = analyzer().ranked_blades(&RowFilter::all(), 20, 3).await.unwrap();
        assert_eq!(blades.len(), 1);
        assert_eq!(blades[0].name, "Phoenix Wing");
        assert_eq!(blades[0].score, 4.98);
        assert_eq!(blades[0].uses, 3);
    }

    #[tokio::test]
    async fn test_region_filter_scopes_rows() {
        let eu = RowFilter::all().with_region(Region::Eu);
        let blades = analyzer().ranked_blades(&eu, 20, 1).await.unwrap();
        let names: Vec<_> = blades.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Wizard Rod", "Phoenix Wing"]);

        let summary = analyzer().database_summary(&eu).await.unwrap();
        assert_eq!(summary.tournaments, 1);
        assert_eq!(summary.regions, vec![Region::Eu]);
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let source = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let analyzer = Analyzer::new(Arc::clone(&source));

        let err = analyzer.hidden_gems(&RowFilter::all()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Storage(StorageError::PathNotFound(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_deck_skips_fetch() {
        let source = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let analyzer = Analyzer::new(Arc::clone(&source));

        let combos = vec![ComboSpec::new("Wizard Rod", "9-60", "Ball")];
        let err = analyzer.rate_deck(&combos, &RowFilter::all()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDeck(1)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dyn_source() {
        let source: Arc<dyn RowSource> = Arc::new(MemorySource::new(fixture()));
        let analyzer = Analyzer::new(source).with_reference_date(reference());

        let line = analyzer
            .sparkline(&SparklineTarget::blade("Phoenix"), 8, &RowFilter::all())
            .await
            .unwrap();
        assert_eq!(line.entity, "Phoenix Wing");
        assert_eq!(line.total, 6.0);
    }
}
