//! # Financial Ratio Analyzer
//!
//! A library for turning a company's annual income statement, balance sheet
//! and cash-flow statement into per-fiscal-year ratio tables.
//!
//! ## Core Concepts
//!
//! - **Raw statements**: provider tables with one row per line item and one column per report date
//! - **Canonical statements**: one column per fiscal year, deduplicated, ascending
//! - **Ratio tables**: profitability, liquidity, leverage and efficiency ratios per year,
//!   plus an optional point-in-time market section
//! - **Missing data**: a ratio whose inputs are absent (or whose denominator is zero)
//!   is `None`, never an error
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_ratio_analyzer::*;
//!
//! let bundle = StatementBundle {
//!     income: RawStatement::from_cells(vec![
//!         ("Total Revenue", "2022-12-31", 1000.0),
//!         ("Total Revenue", "2023-12-31", 1100.0),
//!         ("Gross Profit", "2022-12-31", 400.0),
//!         ("Gross Profit", "2023-12-31", 450.0),
//!     ]),
//!     ..StatementBundle::empty()
//! };
//!
//! let processor = FinancialRatioProcessor::default();
//! let statements = processor.normalize(&bundle).unwrap();
//! let table = processor.analyze(&statements, None);
//!
//! let report = assemble(&table, &ReportOptions::default()).unwrap();
//! println!("{}", report.to_csv().unwrap());
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod line_items;
pub mod market;
pub mod normalizer;
pub mod provider;
pub mod ratios;
pub mod report;
pub mod schema;
pub mod utils;

#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use cache::{Cache, MemoryCache, NoCache, DEFAULT_TTL};
pub use engine::RatioEngine;
pub use error::{RatioAnalysisError, Result};
pub use line_items::LineItem;
pub use market::MarketRatios;
pub use normalizer::{normalize_bundle, normalize_statement, CanonicalStatement, NormalizedStatements};
pub use provider::{StatementLoader, StatementProvider, StaticProvider};
pub use ratios::*;
pub use report::*;
pub use schema::*;
pub use utils::*;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fiscal years are identified by the calendar year of their report date.
pub type FiscalYear = i32;

/// One line item's values, keyed by fiscal year.
pub type YearSeries = BTreeMap<FiscalYear, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How balance-sheet averages treat the earliest year.
    pub averaging: AveragingPolicy,
    /// Whether a live quote is used to add the market section.
    pub include_market: bool,
    /// Lifetime of cached statements in seconds. Zero disables caching.
    pub cache_ttl_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            averaging: AveragingPolicy::default(),
            include_market: true,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl AnalysisConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// A statement cache honouring `cache_ttl_secs`.
    pub fn statement_cache(&self) -> MemoryCache<NormalizedStatements> {
        MemoryCache::new(self.cache_ttl())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FinancialRatioProcessor {
    config: AnalysisConfig,
    engine: RatioEngine,
}

impl FinancialRatioProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        let engine = RatioEngine::new(config.averaging);
        Self { config, engine }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn normalize(&self, bundle: &StatementBundle) -> Result<NormalizedStatements> {
        normalize_bundle(bundle)
    }

    /// Ratio table for already-normalized statements. The market section is
    /// added only when a quote is given and the config allows it.
    pub fn analyze(&self, statements: &NormalizedStatements, quote: Option<&Quote>) -> RatioTable {
        let mut table = self.engine.compute(statements);

        if let Some(quote) = quote.filter(|_| self.config.include_market) {
            let market = MarketRatios::compute(quote, statements);
            market.attach_to(&mut table);
        }

        debug!(
            "Ratio table has {} sections over years {:?}",
            table.sections().len(),
            table.years()
        );
        table
    }

    /// Fetch, normalize and compute for one ticker.
    ///
    /// Fetch failures are logged by the loader and produce an empty table.
    pub fn analyze_ticker<P, C>(&self, loader: &StatementLoader<P, C>, ticker: &str) -> Result<RatioTable>
    where
        P: StatementProvider,
        C: Cache<NormalizedStatements>,
    {
        info!("Analyzing {}", ticker);

        let statements = loader.load(ticker)?;
        if statements.is_empty() {
            info!("No statements available for {}", ticker);
            return Ok(RatioTable::new(Vec::new()));
        }

        let quote = if self.config.include_market {
            loader.quote(ticker)
        } else {
            None
        };

        let table = self.analyze(&statements, quote.as_ref());
        info!(
            "Computed ratios for {} across {} fiscal years",
            ticker,
            table.years().len()
        );
        Ok(table)
    }
}

pub fn analyze_statements(bundle: &StatementBundle, quote: Option<&Quote>) -> Result<RatioTable> {
    let processor = FinancialRatioProcessor::default();
    let statements = processor.normalize(bundle)?;
    Ok(processor.analyze(&statements, quote))
}
