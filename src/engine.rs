use crate::line_items::LineItem;
use crate::normalizer::{CanonicalStatement, NormalizedStatements};
use crate::ratios::{Ratio, RatioCategory, RatioRow, RatioSection, RatioTable};
use crate::utils::{average_over_period_with, checked_add, checked_sub, safe_divide, AveragingPolicy};
use crate::{FiscalYear, YearSeries};
use log::debug;
use std::collections::BTreeSet;

const DAYS_PER_YEAR: f64 = 365.0;

/// Statement inputs resolved once per computation.
struct Inputs {
    revenue: YearSeries,
    gross_profit: YearSeries,
    ebit: YearSeries,
    net_income: YearSeries,
    interest_expense: YearSeries,
    cogs: YearSeries,
    current_assets: YearSeries,
    current_liabilities: YearSeries,
    cash_and_sti: YearSeries,
    inventory: YearSeries,
    receivables: YearSeries,
    payables: YearSeries,
    total_assets: YearSeries,
    total_debt: YearSeries,
    equity: YearSeries,
}

impl Inputs {
    fn resolve(income: &CanonicalStatement, balance: &CanonicalStatement) -> Self {
        Self {
            revenue: LineItem::Revenue.resolve(income),
            gross_profit: LineItem::GrossProfit.resolve(income),
            ebit: LineItem::Ebit.resolve(income),
            net_income: LineItem::NetIncome.resolve(income),
            interest_expense: LineItem::InterestExpense.resolve(income),
            cogs: LineItem::CostOfRevenue.resolve(income),
            current_assets: LineItem::CurrentAssets.resolve(balance),
            current_liabilities: LineItem::CurrentLiabilities.resolve(balance),
            cash_and_sti: LineItem::CashAndShortTermInvestments.resolve(balance),
            inventory: LineItem::Inventory.resolve(balance),
            receivables: LineItem::Receivables.resolve(balance),
            payables: LineItem::Payables.resolve(balance),
            total_assets: LineItem::TotalAssets.resolve(balance),
            total_debt: LineItem::TotalDebt.resolve(balance),
            equity: LineItem::Equity.resolve(balance),
        }
    }
}

fn at(series: &YearSeries, year: FiscalYear) -> Option<f64> {
    series.get(&year).copied()
}

/// Computes the statement-based ratio sections.
///
/// Every cell is independent: a missing line item or a failed division
/// leaves that cell `None` and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioEngine {
    averaging: AveragingPolicy,
}

impl RatioEngine {
    pub fn new(averaging: AveragingPolicy) -> Self {
        Self { averaging }
    }

    pub fn averaging(&self) -> AveragingPolicy {
        self.averaging
    }

    /// Fiscal years covered by the income statement or the balance sheet.
    pub fn years(income: &CanonicalStatement, balance: &CanonicalStatement) -> Vec<FiscalYear> {
        let years: BTreeSet<FiscalYear> = income
            .years()
            .into_iter()
            .chain(balance.years())
            .collect();
        years.into_iter().collect()
    }

    pub fn compute(&self, statements: &NormalizedStatements) -> RatioTable {
        self.compute_from(&statements.income, &statements.balance_sheet)
    }

    pub fn compute_from(&self, income: &CanonicalStatement, balance: &CanonicalStatement) -> RatioTable {
        let years = Self::years(income, balance);
        let inputs = Inputs::resolve(income, balance);

        debug!("Computing ratios for fiscal years {:?}", years);

        let mut table = RatioTable::new(years.clone());
        for category in [
            RatioCategory::Profitability,
            RatioCategory::Liquidity,
            RatioCategory::Leverage,
            RatioCategory::Efficiency,
        ] {
            let rows = category
                .ratios()
                .iter()
                .map(|&ratio| RatioRow::from_fn(ratio, &years, |year| self.cell(&inputs, ratio, year)))
                .collect();
            table.insert_section(RatioSection { category, rows });
        }
        table
    }

    fn average(&self, series: &YearSeries, year: FiscalYear) -> Option<f64> {
        average_over_period_with(series, year, self.averaging)
    }

    fn inventory_turnover(&self, i: &Inputs, year: FiscalYear) -> Option<f64> {
        safe_divide(at(&i.cogs, year), self.average(&i.inventory, year))
    }

    fn receivables_turnover(&self, i: &Inputs, year: FiscalYear) -> Option<f64> {
        safe_divide(at(&i.revenue, year), self.average(&i.receivables, year))
    }

    fn payables_turnover(&self, i: &Inputs, year: FiscalYear) -> Option<f64> {
        safe_divide(at(&i.cogs, year), self.average(&i.payables, year))
    }

    fn days(turnover: Option<f64>) -> Option<f64> {
        safe_divide(Some(DAYS_PER_YEAR), turnover)
    }

    fn cell(&self, i: &Inputs, ratio: Ratio, year: FiscalYear) -> Option<f64> {
        match ratio {
            Ratio::GrossMargin => safe_divide(at(&i.gross_profit, year), at(&i.revenue, year)),
            Ratio::EbitMargin => safe_divide(at(&i.ebit, year), at(&i.revenue, year)),
            Ratio::NetProfitMargin => safe_divide(at(&i.net_income, year), at(&i.revenue, year)),
            Ratio::ReturnOnAssets => {
                safe_divide(at(&i.net_income, year), self.average(&i.total_assets, year))
            }
            Ratio::ReturnOnEquity => safe_divide(at(&i.net_income, year), self.average(&i.equity, year)),
            Ratio::AssetTurnover => safe_divide(at(&i.revenue, year), self.average(&i.total_assets, year)),

            Ratio::CurrentRatio => {
                safe_divide(at(&i.current_assets, year), at(&i.current_liabilities, year))
            }
            Ratio::QuickRatio => safe_divide(
                checked_sub(at(&i.current_assets, year), at(&i.inventory, year)),
                at(&i.current_liabilities, year),
            ),
            Ratio::CashRatio => safe_divide(at(&i.cash_and_sti, year), at(&i.current_liabilities, year)),
            Ratio::WorkingCapital => {
                checked_sub(at(&i.current_assets, year), at(&i.current_liabilities, year))
            }

            Ratio::DebtToAssets => safe_divide(at(&i.total_debt, year), at(&i.total_assets, year)),
            Ratio::DebtToEquity => safe_divide(at(&i.total_debt, year), at(&i.equity, year)),
            Ratio::InterestCoverage => safe_divide(
                at(&i.ebit, year),
                at(&i.interest_expense, year).map(f64::abs),
            ),

            Ratio::InventoryTurnover => self.inventory_turnover(i, year),
            Ratio::ReceivablesTurnover => self.receivables_turnover(i, year),
            Ratio::PayablesTurnover => self.payables_turnover(i, year),
            Ratio::DaysInventoryOutstanding => Self::days(self.inventory_turnover(i, year)),
            Ratio::DaysSalesOutstanding => Self::days(self.receivables_turnover(i, year)),
            Ratio::DaysPayablesOutstanding => Self::days(self.payables_turnover(i, year)),
            Ratio::CashConversionCycle => checked_sub(
                checked_add(
                    Self::days(self.inventory_turnover(i, year)),
                    Self::days(self.receivables_turnover(i, year)),
                ),
                Self::days(self.payables_turnover(i, year)),
            ),

            // Market ratios need a quote; see `market`
            Ratio::Price
            | Ratio::MarketCap
            | Ratio::EarningsPerShare
            | Ratio::PriceToEarnings
            | Ratio::BookValuePerShare
            | Ratio::PriceToBook
            | Ratio::DividendsPerShare
            | Ratio::DividendYield => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_statement;
    use crate::schema::{RawStatement, StatementKind};

    fn statement(kind: StatementKind, cells: Vec<(&str, &str, f64)>) -> CanonicalStatement {
        normalize_statement(kind, &RawStatement::from_cells(cells)).unwrap()
    }

    fn close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be defined");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_gross_margin_scenario() {
        let income = statement(
            StatementKind::Income,
            vec![
                ("Total Revenue", "2022-12-31", 1000.0),
                ("Total Revenue", "2023-12-31", 1100.0),
                ("Gross Profit", "2022-12-31", 400.0),
                ("Gross Profit", "2023-12-31", 450.0),
            ],
        );
        let balance = CanonicalStatement::empty(StatementKind::BalanceSheet);

        let table = RatioEngine::default().compute_from(&income, &balance);
        assert_eq!(table.years(), &[2022, 2023]);
        close(table.value(Ratio::GrossMargin, 2022), 0.4);
        close(table.value(Ratio::GrossMargin, 2023), 450.0 / 1100.0);
        assert_eq!(table.value(Ratio::EbitMargin, 2023), None);
    }

    #[test]
    fn test_roa_uses_average_assets() {
        let income = statement(
            StatementKind::Income,
            vec![
                ("Net Income", "2022-12-31", 200.0),
                ("Net Income", "2023-12-31", 260.0),
            ],
        );
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![
                ("Total Assets", "2021-12-31", 2000.0),
                ("Total Assets", "2022-12-31", 2200.0),
                ("Total Assets", "2023-12-31", 2400.0),
            ],
        );

        let table = RatioEngine::default().compute_from(&income, &balance);
        assert_eq!(table.years(), &[2021, 2022, 2023]);
        close(table.value(Ratio::ReturnOnAssets, 2023), 260.0 / 2300.0);
        close(table.value(Ratio::ReturnOnAssets, 2022), 200.0 / 2100.0);
        assert_eq!(table.value(Ratio::ReturnOnAssets, 2021), None);
    }

    #[test]
    fn test_earliest_year_averaging_policy() {
        let income = statement(
            StatementKind::Income,
            vec![("Net Income", "2021-12-31", 100.0)],
        );
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![("Total Equity", "2021-12-31", 1000.0)],
        );

        let fallback = RatioEngine::new(AveragingPolicy::FallbackToCurrent).compute_from(&income, &balance);
        close(fallback.value(Ratio::ReturnOnEquity, 2021), 0.1);

        let strict = RatioEngine::new(AveragingPolicy::RequirePriorYear).compute_from(&income, &balance);
        assert_eq!(strict.value(Ratio::ReturnOnEquity, 2021), None);
    }

    #[test]
    fn test_zero_current_liabilities_isolated() {
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![
                ("Current Assets", "2023-12-31", 500.0),
                ("Current Liabilities", "2023-12-31", 0.0),
                ("Inventory", "2023-12-31", 100.0),
                ("Cash Cash Equivalents And Short Term Investments", "2023-12-31", 50.0),
                ("Total Assets", "2023-12-31", 1000.0),
                ("Total Debt", "2023-12-31", 300.0),
            ],
        );
        let income = CanonicalStatement::empty(StatementKind::Income);

        let table = RatioEngine::default().compute_from(&income, &balance);
        assert_eq!(table.value(Ratio::CurrentRatio, 2023), None);
        assert_eq!(table.value(Ratio::QuickRatio, 2023), None);
        assert_eq!(table.value(Ratio::CashRatio, 2023), None);
        close(table.value(Ratio::WorkingCapital, 2023), 500.0);
        close(table.value(Ratio::DebtToAssets, 2023), 0.3);
    }

    #[test]
    fn test_liquidity_and_leverage() {
        let income = statement(
            StatementKind::Income,
            vec![
                ("EBIT", "2023-12-31", 120.0),
                ("Interest Expense", "2023-12-31", -30.0),
            ],
        );
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![
                ("Current Assets", "2023-12-31", 600.0),
                ("Current Liabilities", "2023-12-31", 400.0),
                ("Inventory", "2023-12-31", 200.0),
                ("Cash Cash Equivalents And Short Term Investments", "2023-12-31", 100.0),
                ("Total Debt", "2023-12-31", 500.0),
                ("Total Equity Gross Minority Interest", "2023-12-31", 1000.0),
            ],
        );

        let table = RatioEngine::default().compute_from(&income, &balance);
        close(table.value(Ratio::CurrentRatio, 2023), 1.5);
        close(table.value(Ratio::QuickRatio, 2023), 1.0);
        close(table.value(Ratio::CashRatio, 2023), 0.25);
        close(table.value(Ratio::WorkingCapital, 2023), 200.0);
        close(table.value(Ratio::DebtToEquity, 2023), 0.5);
        // Interest expense sign does not matter
        close(table.value(Ratio::InterestCoverage, 2023), 4.0);
        // Total assets missing
        assert_eq!(table.value(Ratio::DebtToAssets, 2023), None);
    }

    #[test]
    fn test_efficiency_days_and_cash_conversion_cycle() {
        let income = statement(
            StatementKind::Income,
            vec![
                ("Total Revenue", "2022-12-31", 3650.0),
                ("Total Revenue", "2023-12-31", 7300.0),
                ("Cost Of Revenue", "2022-12-31", 1825.0),
                ("Cost Of Revenue", "2023-12-31", 3650.0),
            ],
        );
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![
                ("Inventory", "2022-12-31", 100.0),
                ("Inventory", "2023-12-31", 300.0),
                ("Accounts Receivable", "2022-12-31", 500.0),
                ("Accounts Receivable", "2023-12-31", 500.0),
                ("Accounts Payable", "2022-12-31", 250.0),
                ("Accounts Payable", "2023-12-31", 250.0),
            ],
        );

        let table = RatioEngine::default().compute_from(&income, &balance);

        // 2023: avg inventory 200, avg receivables 500, avg payables 250
        close(table.value(Ratio::InventoryTurnover, 2023), 3650.0 / 200.0);
        close(table.value(Ratio::ReceivablesTurnover, 2023), 7300.0 / 500.0);
        close(table.value(Ratio::PayablesTurnover, 2023), 3650.0 / 250.0);
        close(table.value(Ratio::DaysInventoryOutstanding, 2023), 20.0);
        close(table.value(Ratio::DaysSalesOutstanding, 2023), 25.0);
        close(table.value(Ratio::DaysPayablesOutstanding, 2023), 25.0);

        for year in table.years() {
            let dio = table.value(Ratio::DaysInventoryOutstanding, *year).unwrap();
            let dso = table.value(Ratio::DaysSalesOutstanding, *year).unwrap();
            let dpo = table.value(Ratio::DaysPayablesOutstanding, *year).unwrap();
            close(table.value(Ratio::CashConversionCycle, *year), dio + dso - dpo);
        }
    }

    #[test]
    fn test_cash_conversion_cycle_undefined_with_missing_addend() {
        let income = statement(
            StatementKind::Income,
            vec![
                ("Total Revenue", "2023-12-31", 1000.0),
                ("Cost Of Revenue", "2023-12-31", 600.0),
            ],
        );
        let balance = statement(
            StatementKind::BalanceSheet,
            vec![
                ("Inventory", "2023-12-31", 100.0),
                ("Accounts Receivable", "2023-12-31", 200.0),
            ],
        );

        let table = RatioEngine::default().compute_from(&income, &balance);
        assert!(table.value(Ratio::DaysInventoryOutstanding, 2023).is_some());
        assert!(table.value(Ratio::DaysSalesOutstanding, 2023).is_some());
        assert_eq!(table.value(Ratio::DaysPayablesOutstanding, 2023), None);
        assert_eq!(table.value(Ratio::CashConversionCycle, 2023), None);
    }

    #[test]
    fn test_empty_statements_give_empty_table() {
        let table = RatioEngine::default().compute(&NormalizedStatements::empty());
        assert!(table.is_empty());
        assert_eq!(table.sections().len(), 4);
        assert!(table.sections().iter().all(|s| s.rows.iter().all(|r| r.values.is_empty())));
    }

    #[test]
    fn test_market_section_not_computed_here() {
        let table = RatioEngine::default().compute(&NormalizedStatements::empty());
        assert!(table.section(RatioCategory::Market).is_none());
    }
}
