use crate::cache::Cache;
use crate::error::{RatioAnalysisError, Result};
use crate::normalizer::{normalize_bundle, NormalizedStatements};
use crate::schema::{Quote, StatementBundle};
use log::{debug, info, warn};
use std::collections::HashMap;

/// A source of raw statements and quotes for a ticker.
pub trait StatementProvider {
    fn fetch_statements(&self, ticker: &str) -> Result<StatementBundle>;

    fn fetch_quote(&self, ticker: &str) -> Result<Quote>;
}

impl<P: StatementProvider + ?Sized> StatementProvider for &P {
    fn fetch_statements(&self, ticker: &str) -> Result<StatementBundle> {
        (**self).fetch_statements(ticker)
    }

    fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
        (**self).fetch_quote(ticker)
    }
}

/// Cache key for a ticker; lookups are case-insensitive.
pub fn ticker_key(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// In-memory provider, for tests and for statements loaded from files.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    statements: HashMap<String, StatementBundle>,
    quotes: HashMap<String, Quote>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statements(mut self, ticker: &str, bundle: StatementBundle) -> Self {
        self.statements.insert(ticker_key(ticker), bundle);
        self
    }

    pub fn with_quote(mut self, ticker: &str, quote: Quote) -> Self {
        self.quotes.insert(ticker_key(ticker), quote);
        self
    }
}

impl StatementProvider for StaticProvider {
    fn fetch_statements(&self, ticker: &str) -> Result<StatementBundle> {
        self.statements
            .get(&ticker_key(ticker))
            .cloned()
            .ok_or_else(|| RatioAnalysisError::FetchFailed {
                ticker: ticker.to_string(),
                reason: "unknown ticker".to_string(),
            })
    }

    fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
        self.quotes
            .get(&ticker_key(ticker))
            .cloned()
            .ok_or_else(|| RatioAnalysisError::FetchFailed {
                ticker: ticker.to_string(),
                reason: "no quote available".to_string(),
            })
    }
}

/// Fetches and normalizes statements, consulting the cache first.
pub struct StatementLoader<P, C> {
    provider: P,
    cache: C,
}

impl<P, C> StatementLoader<P, C>
where
    P: StatementProvider,
    C: Cache<NormalizedStatements>,
{
    pub fn new(provider: P, cache: C) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Normalized statements for `ticker`.
    ///
    /// A fetch failure is not an error here: it yields empty statements,
    /// which are not cached so the next call retries the provider.
    pub fn load(&self, ticker: &str) -> Result<NormalizedStatements> {
        let key = ticker_key(ticker);
        if let Some(hit) = self.cache.get(&key) {
            debug!("Statement cache hit for {}", key);
            return Ok(hit);
        }
        debug!("Statement cache miss for {}", key);

        let bundle = match self.provider.fetch_statements(&key) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("No statements for {}: {}", key, e);
                return Ok(NormalizedStatements::empty());
            }
        };

        let normalized = normalize_bundle(&bundle)?;
        info!(
            "Loaded statements for {}: {} income years, {} balance sheet years, {} cash flow years",
            key,
            normalized.income.years().len(),
            normalized.balance_sheet.years().len(),
            normalized.cash_flow.years().len()
        );

        if !normalized.is_empty() {
            self.cache.set(&key, normalized.clone());
        }
        Ok(normalized)
    }

    /// The live quote, or `None` when the provider cannot supply one.
    pub fn quote(&self, ticker: &str) -> Option<Quote> {
        let key = ticker_key(ticker);
        match self.provider.fetch_quote(&key) {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!("Market data incomplete for {}: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoCache};
    use crate::schema::RawStatement;
    use std::cell::Cell;

    struct CountingProvider {
        inner: StaticProvider,
        calls: Cell<usize>,
    }

    impl StatementProvider for CountingProvider {
        fn fetch_statements(&self, ticker: &str) -> Result<StatementBundle> {
            self.calls.set(self.calls.get() + 1);
            self.inner.fetch_statements(ticker)
        }

        fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
            self.inner.fetch_quote(ticker)
        }
    }

    fn bundle() -> StatementBundle {
        StatementBundle {
            income: RawStatement::from_cells(vec![("Total Revenue", "2023-12-31", 100.0)]),
            ..StatementBundle::empty()
        }
    }

    fn counting() -> CountingProvider {
        CountingProvider {
            inner: StaticProvider::new().with_statements("aapl", bundle()),
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_cache_hit_skips_provider() {
        let loader = StatementLoader::new(counting(), MemoryCache::<NormalizedStatements>::default());

        let first = loader.load("AAPL").unwrap();
        let second = loader.load(" aapl ").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.income.years(), vec![2023]);
        assert_eq!(loader.provider().calls.get(), 1);
    }

    #[test]
    fn test_no_cache_always_fetches() {
        let loader = StatementLoader::new(counting(), NoCache);

        loader.load("AAPL").unwrap();
        loader.load("AAPL").unwrap();
        assert_eq!(loader.provider().calls.get(), 2);
    }

    #[test]
    fn test_unknown_ticker_is_empty_and_uncached() {
        let loader = StatementLoader::new(counting(), MemoryCache::<NormalizedStatements>::default());

        let statements = loader.load("NOPE").unwrap();
        assert!(statements.is_empty());
        assert!(loader.cache().is_empty());

        loader.load("NOPE").unwrap();
        assert_eq!(loader.provider().calls.get(), 2);
    }

    #[test]
    fn test_missing_quote_is_none() {
        let loader = StatementLoader::new(StaticProvider::new(), NoCache);
        assert!(loader.quote("AAPL").is_none());

        let provider = StaticProvider::new().with_quote(
            "AAPL",
            Quote {
                price: Some(190.0),
                ..Quote::default()
            },
        );
        let loader = StatementLoader::new(&provider, NoCache);
        assert_eq!(loader.quote("aapl").unwrap().price, Some(190.0));
    }
}
