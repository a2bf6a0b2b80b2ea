use crate::error::{RatioAnalysisError, Result};
use crate::FiscalYear;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum RatioCategory {
    Profitability,
    Liquidity,
    Leverage,
    Efficiency,
    Market,
}

impl RatioCategory {
    pub const ALL: [RatioCategory; 5] = [
        RatioCategory::Profitability,
        RatioCategory::Liquidity,
        RatioCategory::Leverage,
        RatioCategory::Efficiency,
        RatioCategory::Market,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RatioCategory::Profitability => "Profitability",
            RatioCategory::Liquidity => "Liquidity",
            RatioCategory::Leverage => "Leverage",
            RatioCategory::Efficiency => "Efficiency",
            RatioCategory::Market => "Market",
        }
    }

    /// Ratios of this category in display order.
    pub fn ratios(&self) -> &'static [Ratio] {
        use Ratio::*;
        match self {
            RatioCategory::Profitability => &[
                GrossMargin,
                EbitMargin,
                NetProfitMargin,
                ReturnOnAssets,
                ReturnOnEquity,
                AssetTurnover,
            ],
            RatioCategory::Liquidity => &[CurrentRatio, QuickRatio, CashRatio, WorkingCapital],
            RatioCategory::Leverage => &[DebtToAssets, DebtToEquity, InterestCoverage],
            RatioCategory::Efficiency => &[
                InventoryTurnover,
                ReceivablesTurnover,
                PayablesTurnover,
                DaysInventoryOutstanding,
                DaysSalesOutstanding,
                DaysPayablesOutstanding,
                CashConversionCycle,
            ],
            RatioCategory::Market => &[
                Price,
                MarketCap,
                EarningsPerShare,
                PriceToEarnings,
                BookValuePerShare,
                PriceToBook,
                DividendsPerShare,
                DividendYield,
            ],
        }
    }
}

impl fmt::Display for RatioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a ratio's value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Stored as a fraction, shown ×100 with a `%` suffix
    Percent,
    Multiple,
    Days,
    /// Whole currency amounts
    Currency,
    /// Currency amounts per share, shown with decimals
    PerShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ratio {
    GrossMargin,
    EbitMargin,
    NetProfitMargin,
    ReturnOnAssets,
    ReturnOnEquity,
    AssetTurnover,
    CurrentRatio,
    QuickRatio,
    CashRatio,
    WorkingCapital,
    DebtToAssets,
    DebtToEquity,
    InterestCoverage,
    InventoryTurnover,
    ReceivablesTurnover,
    PayablesTurnover,
    DaysInventoryOutstanding,
    DaysSalesOutstanding,
    DaysPayablesOutstanding,
    CashConversionCycle,
    Price,
    MarketCap,
    EarningsPerShare,
    PriceToEarnings,
    BookValuePerShare,
    PriceToBook,
    DividendsPerShare,
    DividendYield,
}

impl Ratio {
    pub fn label(&self) -> &'static str {
        match self {
            Ratio::GrossMargin => "Gross Margin",
            Ratio::EbitMargin => "EBIT Margin",
            Ratio::NetProfitMargin => "Net Profit Margin",
            Ratio::ReturnOnAssets => "ROA",
            Ratio::ReturnOnEquity => "ROE",
            Ratio::AssetTurnover => "Asset Turnover",
            Ratio::CurrentRatio => "Current Ratio",
            Ratio::QuickRatio => "Quick Ratio",
            Ratio::CashRatio => "Cash Ratio",
            Ratio::WorkingCapital => "Working Capital",
            Ratio::DebtToAssets => "Debt to Assets",
            Ratio::DebtToEquity => "Debt to Equity",
            Ratio::InterestCoverage => "Interest Coverage",
            Ratio::InventoryTurnover => "Inventory Turnover",
            Ratio::ReceivablesTurnover => "Receivables Turnover",
            Ratio::PayablesTurnover => "Payables Turnover",
            Ratio::DaysInventoryOutstanding => "Days Inventory Outstanding",
            Ratio::DaysSalesOutstanding => "Days Sales Outstanding",
            Ratio::DaysPayablesOutstanding => "Days Payables Outstanding",
            Ratio::CashConversionCycle => "Cash Conversion Cycle",
            Ratio::Price => "Price",
            Ratio::MarketCap => "Market Cap",
            Ratio::EarningsPerShare => "EPS",
            Ratio::PriceToEarnings => "P/E",
            Ratio::BookValuePerShare => "Book Value per Share",
            Ratio::PriceToBook => "P/B",
            Ratio::DividendsPerShare => "Dividends per Share",
            Ratio::DividendYield => "Dividend Yield",
        }
    }

    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim();
        RatioCategory::ALL
            .iter()
            .flat_map(|c| c.ratios().iter())
            .find(|r| r.label() == label)
            .copied()
            .ok_or_else(|| RatioAnalysisError::UnknownRatio(label.to_string()))
    }

    pub fn category(&self) -> RatioCategory {
        RatioCategory::ALL
            .into_iter()
            .find(|c| c.ratios().contains(self))
            .unwrap_or(RatioCategory::Market)
    }

    pub fn unit(&self) -> Unit {
        match self {
            Ratio::GrossMargin
            | Ratio::EbitMargin
            | Ratio::NetProfitMargin
            | Ratio::ReturnOnAssets
            | Ratio::ReturnOnEquity
            | Ratio::DividendYield => Unit::Percent,
            Ratio::DaysInventoryOutstanding
            | Ratio::DaysSalesOutstanding
            | Ratio::DaysPayablesOutstanding
            | Ratio::CashConversionCycle => Unit::Days,
            Ratio::WorkingCapital | Ratio::MarketCap => Unit::Currency,
            Ratio::Price
            | Ratio::EarningsPerShare
            | Ratio::BookValuePerShare
            | Ratio::DividendsPerShare => Unit::PerShare,
            _ => Unit::Multiple,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRow {
    pub ratio: Ratio,
    /// One entry per table year; `None` where the ratio could not be computed
    pub values: BTreeMap<FiscalYear, Option<f64>>,
}

impl RatioRow {
    pub fn from_fn(ratio: Ratio, years: &[FiscalYear], f: impl Fn(FiscalYear) -> Option<f64>) -> Self {
        Self {
            ratio,
            values: years.iter().map(|&y| (y, f(y))).collect(),
        }
    }

    pub fn value(&self, year: FiscalYear) -> Option<f64> {
        self.values.get(&year).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSection {
    pub category: RatioCategory,
    pub rows: Vec<RatioRow>,
}

/// Ratio sections aligned to one set of fiscal years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioTable {
    years: Vec<FiscalYear>,
    sections: Vec<RatioSection>,
}

impl RatioTable {
    pub fn new(mut years: Vec<FiscalYear>) -> Self {
        years.sort_unstable();
        years.dedup();
        Self {
            years,
            sections: Vec::new(),
        }
    }

    pub fn years(&self) -> &[FiscalYear] {
        &self.years
    }

    pub fn latest_year(&self) -> Option<FiscalYear> {
        self.years.last().copied()
    }

    /// No fiscal years: the provider had nothing usable.
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn sections(&self) -> &[RatioSection] {
        &self.sections
    }

    /// Adds or replaces the section for `section.category`, keeping
    /// sections in category order.
    pub fn insert_section(&mut self, section: RatioSection) {
        self.sections.retain(|s| s.category != section.category);
        self.sections.push(section);
        self.sections.sort_by_key(|s| s.category);
    }

    pub fn section(&self, category: RatioCategory) -> Option<&RatioSection> {
        self.sections.iter().find(|s| s.category == category)
    }

    pub fn row(&self, ratio: Ratio) -> Option<&RatioRow> {
        self.section(ratio.category())?
            .rows
            .iter()
            .find(|r| r.ratio == ratio)
    }

    pub fn value(&self, ratio: Ratio, year: FiscalYear) -> Option<f64> {
        self.row(ratio)?.value(year)
    }

    /// Trend series for a ratio across every table year.
    pub fn series(&self, ratio: Ratio) -> Vec<(FiscalYear, Option<f64>)> {
        self.years
            .iter()
            .map(|&year| (year, self.value(ratio, year)))
            .collect()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_ratio_has_one_category() {
        let mut seen = Vec::new();
        for category in RatioCategory::ALL {
            for ratio in category.ratios() {
                assert_eq!(ratio.category(), category);
                assert!(!seen.contains(ratio), "{} listed twice", ratio);
                seen.push(*ratio);
            }
        }
        assert_eq!(seen.len(), 28);
    }

    #[test]
    fn test_label_round_trip() {
        for category in RatioCategory::ALL {
            for ratio in category.ratios() {
                assert_eq!(Ratio::from_label(ratio.label()).unwrap(), *ratio);
            }
        }
        assert!(matches!(
            Ratio::from_label("Altman Z"),
            Err(RatioAnalysisError::UnknownRatio(_))
        ));
    }

    #[test]
    fn test_units() {
        assert_eq!(Ratio::ReturnOnEquity.unit(), Unit::Percent);
        assert_eq!(Ratio::DividendYield.unit(), Unit::Percent);
        assert_eq!(Ratio::AssetTurnover.unit(), Unit::Multiple);
        assert_eq!(Ratio::CashConversionCycle.unit(), Unit::Days);
        assert_eq!(Ratio::WorkingCapital.unit(), Unit::Currency);
        assert_eq!(Ratio::EarningsPerShare.unit(), Unit::PerShare);
    }

    #[test]
    fn test_sections_stay_in_category_order() {
        let mut table = RatioTable::new(vec![2023, 2022, 2023]);
        assert_eq!(table.years(), &[2022, 2023]);

        table.insert_section(RatioSection {
            category: RatioCategory::Leverage,
            rows: vec![],
        });
        table.insert_section(RatioSection {
            category: RatioCategory::Profitability,
            rows: vec![RatioRow::from_fn(Ratio::GrossMargin, &[2022, 2023], |y| {
                (y == 2023).then_some(0.4)
            })],
        });

        let order: Vec<_> = table.sections().iter().map(|s| s.category).collect();
        assert_eq!(order, vec![RatioCategory::Profitability, RatioCategory::Leverage]);
        assert_eq!(table.value(Ratio::GrossMargin, 2023), Some(0.4));
        assert_eq!(table.value(Ratio::GrossMargin, 2022), None);
        assert_eq!(
            table.series(Ratio::GrossMargin),
            vec![(2022, None), (2023, Some(0.4))]
        );
        assert_eq!(table.value(Ratio::DebtToAssets, 2023), None);
    }
}
