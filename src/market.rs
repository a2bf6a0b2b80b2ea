//! Market ratios from a live quote.
//!
//! A quote is a point-in-time snapshot, so the market section carries values
//! only in the table's latest fiscal year. Missing quote fields fall back to
//! the latest statement figures; book value per share takes equity and
//! share count from the same balance-sheet year.

use crate::line_items::LineItem;
use crate::normalizer::NormalizedStatements;
use crate::ratios::{Ratio, RatioCategory, RatioRow, RatioSection, RatioTable};
use crate::schema::Quote;
use crate::utils::{checked_mul, latest_value, safe_divide};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRatios {
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub eps: Option<f64>,
    pub price_to_earnings: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividends_per_share: Option<f64>,
    pub dividend_yield: Option<f64>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Equity over share count from the latest balance-sheet year that reports
/// both, so the two figures never come from different years.
fn statement_book_value_per_share(statements: &NormalizedStatements) -> Option<f64> {
    let equity = LineItem::Equity.resolve(&statements.balance_sheet);
    let shares = LineItem::SharesOutstanding.resolve(&statements.balance_sheet);

    equity
        .iter()
        .rev()
        .find_map(|(year, e)| shares.get(year).map(|s| (*e, *s)))
        .and_then(|(e, s)| safe_divide(Some(e), Some(s)))
}

impl MarketRatios {
    pub fn compute(quote: &Quote, statements: &NormalizedStatements) -> Self {
        let price = finite(quote.price);

        let shares = finite(quote.shares_outstanding).or_else(|| {
            latest_value(&LineItem::SharesOutstanding.resolve(&statements.balance_sheet)).map(|(_, v)| v)
        });

        let market_cap = finite(quote.market_cap).or_else(|| checked_mul(price, shares));

        let eps = finite(quote.eps)
            .or_else(|| latest_value(&LineItem::Eps.resolve(&statements.income)).map(|(_, v)| v));

        // A loss-making company has no meaningful P/E
        let price_to_earnings = match eps {
            Some(e) if e > 0.0 => safe_divide(price, Some(e)),
            _ => None,
        };

        let book_value_per_share = finite(quote.book_value_per_share).or_else(|| {
            match finite(quote.shares_outstanding) {
                Some(quoted) => {
                    let equity = latest_value(&LineItem::Equity.resolve(&statements.balance_sheet));
                    safe_divide(equity.map(|(_, v)| v), Some(quoted))
                }
                None => statement_book_value_per_share(statements),
            }
        });

        let price_to_book = safe_divide(price, book_value_per_share);

        let dividends_per_share = finite(quote.dividend_per_share);
        let dividend_yield = safe_divide(dividends_per_share, price);

        debug!(
            "Market ratios: price={:?} shares={:?} eps={:?} bvps={:?}",
            price, shares, eps, book_value_per_share
        );

        Self {
            price,
            market_cap,
            eps,
            price_to_earnings,
            book_value_per_share,
            price_to_book,
            dividends_per_share,
            dividend_yield,
        }
    }

    pub fn get(&self, ratio: Ratio) -> Option<f64> {
        match ratio {
            Ratio::Price => self.price,
            Ratio::MarketCap => self.market_cap,
            Ratio::EarningsPerShare => self.eps,
            Ratio::PriceToEarnings => self.price_to_earnings,
            Ratio::BookValuePerShare => self.book_value_per_share,
            Ratio::PriceToBook => self.price_to_book,
            Ratio::DividendsPerShare => self.dividends_per_share,
            Ratio::DividendYield => self.dividend_yield,
            _ => None,
        }
    }

    /// Places the snapshot in the latest year of `table`. A table without
    /// years gets no market section.
    pub fn attach_to(&self, table: &mut RatioTable) {
        let Some(latest) = table.latest_year() else {
            return;
        };
        let years = table.years().to_vec();

        let rows = RatioCategory::Market
            .ratios()
            .iter()
            .map(|&ratio| {
                RatioRow::from_fn(ratio, &years, |year| {
                    if year == latest {
                        self.get(ratio)
                    } else {
                        None
                    }
                })
            })
            .collect();

        table.insert_section(RatioSection {
            category: RatioCategory::Market,
            rows,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RatioEngine;
    use crate::normalizer::normalize_bundle;
    use crate::schema::{RawStatement, StatementBundle};

    fn statements() -> NormalizedStatements {
        let bundle = StatementBundle {
            income: RawStatement::from_cells(vec![
                ("Basic EPS", "2022-12-31", 4.0),
                ("Basic EPS", "2023-12-31", 5.0),
                ("Net Income", "2023-12-31", 500.0),
            ]),
            balance_sheet: RawStatement::from_cells(vec![
                ("Share Issued", "2022-12-31", 90.0),
                ("Share Issued", "2023-12-31", 100.0),
                ("Total Equity Gross Minority Interest", "2023-12-31", 2000.0),
            ]),
            cash_flow: RawStatement::new(),
        };
        normalize_bundle(&bundle).unwrap()
    }

    #[test]
    fn test_falls_back_to_statements() {
        let quote = Quote {
            price: Some(50.0),
            dividend_per_share: Some(1.0),
            ..Quote::default()
        };

        let market = MarketRatios::compute(&quote, &statements());
        assert_eq!(market.market_cap, Some(5000.0));
        assert_eq!(market.eps, Some(5.0));
        assert_eq!(market.price_to_earnings, Some(10.0));
        assert_eq!(market.book_value_per_share, Some(20.0));
        assert_eq!(market.price_to_book, Some(2.5));
        assert_eq!(market.dividend_yield, Some(0.02));
    }

    #[test]
    fn test_quote_fields_take_precedence() {
        let quote = Quote {
            price: Some(50.0),
            shares_outstanding: Some(200.0),
            eps: Some(2.5),
            book_value_per_share: Some(25.0),
            market_cap: Some(12_000.0),
            dividend_per_share: None,
        };

        let market = MarketRatios::compute(&quote, &statements());
        assert_eq!(market.market_cap, Some(12_000.0));
        assert_eq!(market.price_to_earnings, Some(20.0));
        assert_eq!(market.price_to_book, Some(2.0));
        assert_eq!(market.dividend_yield, None);
    }

    #[test]
    fn test_book_value_pairs_same_year() {
        let bundle = StatementBundle {
            balance_sheet: RawStatement::from_cells(vec![
                ("Stockholders Equity", "2022-12-31", 1800.0),
                ("Stockholders Equity", "2023-12-31", 2400.0),
                ("Share Issued", "2022-12-31", 90.0),
                ("Share Issued", "2021-12-31", 80.0),
            ]),
            ..StatementBundle::empty()
        };
        let statements = normalize_bundle(&bundle).unwrap();
        let quote = Quote {
            price: Some(40.0),
            ..Quote::default()
        };

        let market = MarketRatios::compute(&quote, &statements);
        // 2023 equity has no 2023 share count, so 2022 supplies both figures
        assert_eq!(market.book_value_per_share, Some(20.0));
        assert_eq!(market.price_to_book, Some(2.0));

        let quoted_shares = Quote {
            price: Some(40.0),
            shares_outstanding: Some(120.0),
            ..Quote::default()
        };
        let market = MarketRatios::compute(&quoted_shares, &statements);
        assert_eq!(market.book_value_per_share, Some(20.0));
    }

    #[test]
    fn test_negative_eps_has_no_pe() {
        let quote = Quote {
            price: Some(10.0),
            eps: Some(-1.0),
            ..Quote::default()
        };

        let market = MarketRatios::compute(&quote, &NormalizedStatements::empty());
        assert_eq!(market.eps, Some(-1.0));
        assert_eq!(market.price_to_earnings, None);
    }

    #[test]
    fn test_missing_price() {
        let quote = Quote {
            price: Some(f64::NAN),
            dividend_per_share: Some(1.0),
            ..Quote::default()
        };

        let market = MarketRatios::compute(&quote, &statements());
        assert_eq!(market.price, None);
        assert_eq!(market.market_cap, None);
        assert_eq!(market.price_to_earnings, None);
        assert_eq!(market.dividend_yield, None);
        // Statement-derived figures survive
        assert_eq!(market.book_value_per_share, Some(20.0));
    }

    #[test]
    fn test_attach_to_latest_year() {
        let statements = statements();
        let mut table = RatioEngine::default().compute(&statements);
        let quote = Quote {
            price: Some(50.0),
            ..Quote::default()
        };

        MarketRatios::compute(&quote, &statements).attach_to(&mut table);

        assert_eq!(table.value(Ratio::Price, 2023), Some(50.0));
        assert_eq!(table.value(Ratio::Price, 2022), None);
        let last = table.sections().last().unwrap();
        assert_eq!(last.category, RatioCategory::Market);
    }

    #[test]
    fn test_attach_to_empty_table_is_noop() {
        let mut table = RatioEngine::default().compute(&NormalizedStatements::empty());
        MarketRatios::default().attach_to(&mut table);
        assert!(table.section(RatioCategory::Market).is_none());
    }
}
