//! Provider line-item names each ratio input is read from.
//!
//! Each input lists aliases in preference order; the first alias with any
//! data in the statement is used for every year.

use crate::normalizer::CanonicalStatement;
use crate::schema::StatementKind;
use crate::utils::checked_add;
use crate::YearSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineItem {
    Revenue,
    GrossProfit,
    Ebit,
    NetIncome,
    InterestExpense,
    CostOfRevenue,
    Eps,
    CurrentAssets,
    CurrentLiabilities,
    CashAndShortTermInvestments,
    Inventory,
    Receivables,
    Payables,
    TotalAssets,
    TotalDebt,
    Equity,
    SharesOutstanding,
}

const CASH_AND_EQUIVALENTS: &str = "Cash And Cash Equivalents";
const SHORT_TERM_INVESTMENTS: &str = "Other Short Term Investments";

impl LineItem {
    pub fn statement(&self) -> StatementKind {
        match self {
            LineItem::Revenue
            | LineItem::GrossProfit
            | LineItem::Ebit
            | LineItem::NetIncome
            | LineItem::InterestExpense
            | LineItem::CostOfRevenue
            | LineItem::Eps => StatementKind::Income,
            _ => StatementKind::BalanceSheet,
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            LineItem::Revenue => &["Total Revenue", "Operating Revenue"],
            LineItem::GrossProfit => &["Gross Profit"],
            LineItem::Ebit => &["EBIT"],
            LineItem::NetIncome => &["Net Income", "Net Income Common Stockholders"],
            LineItem::InterestExpense => &["Interest Expense"],
            LineItem::CostOfRevenue => &["Cost Of Revenue", "Reconciled Cost Of Revenue"],
            LineItem::Eps => &["Basic EPS", "Diluted EPS"],
            LineItem::CurrentAssets => &["Current Assets"],
            LineItem::CurrentLiabilities => &["Current Liabilities"],
            LineItem::CashAndShortTermInvestments => {
                &["Cash Cash Equivalents And Short Term Investments"]
            }
            LineItem::Inventory => &["Inventory"],
            LineItem::Receivables => &["Accounts Receivable", "Net Receivables"],
            LineItem::Payables => &["Accounts Payable"],
            LineItem::TotalAssets => &["Total Assets"],
            LineItem::TotalDebt => &["Total Debt"],
            LineItem::Equity => &[
                "Total Equity Gross Minority Interest",
                "Total Equity",
                "Total Stockholder Equity",
                "Stockholders Equity",
            ],
            LineItem::SharesOutstanding => &["Share Issued", "Ordinary Shares Number"],
        }
    }

    /// Reads this input's series from `statement`. Returns an empty series
    /// when no alias has data.
    pub fn resolve(&self, statement: &CanonicalStatement) -> YearSeries {
        if let Some(series) = statement.first_series(self.aliases()) {
            return series.clone();
        }

        match self {
            LineItem::CashAndShortTermInvestments => cash_plus_short_term(statement),
            _ => YearSeries::new(),
        }
    }
}

/// Sums cash and short-term investments when the provider does not report
/// the combined line. Years missing either part stay undefined.
fn cash_plus_short_term(statement: &CanonicalStatement) -> YearSeries {
    let (Some(cash), Some(investments)) = (
        statement.series(CASH_AND_EQUIVALENTS),
        statement.series(SHORT_TERM_INVESTMENTS),
    ) else {
        return YearSeries::new();
    };

    let years: BTreeSet<_> = cash.keys().chain(investments.keys()).copied().collect();
    years
        .into_iter()
        .filter_map(|year| {
            checked_add(cash.get(&year).copied(), investments.get(&year).copied())
                .map(|total| (year, total))
        })
        .collect()
}
