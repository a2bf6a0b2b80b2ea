use crate::error::{RatioAnalysisError, Result};
use crate::provider::StatementProvider;
use crate::schema::{Quote, RawStatement, StatementBundle};
use crate::yahoo::types::*;
use chrono::{TimeZone, Utc};
use log::{debug, info};
use reqwest::blocking::Client;
use std::time::Duration;

const TIMESERIES_BASE_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trailing dividends are the sum of this many most recent payments.
const TRAILING_DIVIDEND_COUNT: usize = 4;

/// Yahoo series keys (without the `annual` prefix) and the line-item names
/// they are stored under.
pub const INCOME_SERIES: &[(&str, &str)] = &[
    ("TotalRevenue", "Total Revenue"),
    ("OperatingRevenue", "Operating Revenue"),
    ("CostOfRevenue", "Cost Of Revenue"),
    ("ReconciledCostOfRevenue", "Reconciled Cost Of Revenue"),
    ("GrossProfit", "Gross Profit"),
    ("EBIT", "EBIT"),
    ("InterestExpense", "Interest Expense"),
    ("NetIncome", "Net Income"),
    ("NetIncomeCommonStockholders", "Net Income Common Stockholders"),
    ("BasicEPS", "Basic EPS"),
    ("DilutedEPS", "Diluted EPS"),
];

pub const BALANCE_SHEET_SERIES: &[(&str, &str)] = &[
    ("CurrentAssets", "Current Assets"),
    ("CurrentLiabilities", "Current Liabilities"),
    (
        "CashCashEquivalentsAndShortTermInvestments",
        "Cash Cash Equivalents And Short Term Investments",
    ),
    ("CashAndCashEquivalents", "Cash And Cash Equivalents"),
    ("OtherShortTermInvestments", "Other Short Term Investments"),
    ("Inventory", "Inventory"),
    ("AccountsReceivable", "Accounts Receivable"),
    ("Receivables", "Net Receivables"),
    ("AccountsPayable", "Accounts Payable"),
    ("TotalAssets", "Total Assets"),
    ("TotalDebt", "Total Debt"),
    ("TotalEquityGrossMinorityInterest", "Total Equity Gross Minority Interest"),
    ("StockholdersEquity", "Stockholders Equity"),
    ("ShareIssued", "Share Issued"),
    ("OrdinarySharesNumber", "Ordinary Shares Number"),
];

pub const CASH_FLOW_SERIES: &[(&str, &str)] = &[
    ("OperatingCashFlow", "Operating Cash Flow"),
    ("CapitalExpenditure", "Capital Expenditure"),
    ("FreeCashFlow", "Free Cash Flow"),
    ("CashDividendsPaid", "Cash Dividends Paid"),
];

const SERIES_PREFIX: &str = "annual";

/// Earliest statement date requested.
const HISTORY_START_YEAR: i32 = 2010;

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    timeseries_url: String,
    chart_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_urls(TIMESERIES_BASE_URL, CHART_BASE_URL)
    }

    pub fn with_base_urls(timeseries_url: impl Into<String>, chart_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            timeseries_url: timeseries_url.into(),
            chart_url: chart_url.into(),
        })
    }

    fn get_text(&self, ticker: &str, url: &str) -> Result<String> {
        let res = self.client.get(url).send()?;
        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().unwrap_or_default();
            return Err(RatioAnalysisError::FetchFailed {
                ticker: ticker.to_string(),
                reason: format!("Yahoo request failed (status {}): {}", status, error_text),
            });
        }
        Ok(res.text()?)
    }

    fn fetch_series(&self, ticker: &str, series: &[(&str, &str)]) -> Result<RawStatement> {
        let period1 = Utc
            .with_ymd_and_hms(HISTORY_START_YEAR, 1, 1, 0, 0, 0)
            .single()
            .map(|dt| dt.timestamp())
            .unwrap_or(0);
        let period2 = Utc::now().timestamp();

        let url = timeseries_url(&self.timeseries_url, ticker, series, period1, period2);
        debug!("Requesting {} Yahoo series for {}", series.len(), ticker);

        let body = self.get_text(ticker, &url)?;
        parse_timeseries(&body, series)
    }
}

/// Fundamentals-timeseries request URL. The ticker is percent-encoded in
/// both the path and the query.
pub fn timeseries_url(base: &str, ticker: &str, series: &[(&str, &str)], period1: i64, period2: i64) -> String {
    let types: Vec<String> = series
        .iter()
        .map(|(key, _)| format!("{}{}", SERIES_PREFIX, key))
        .collect();
    let symbol = urlencoding::encode(ticker);

    format!(
        "{}/{}?symbol={}&type={}&period1={}&period2={}",
        base,
        symbol,
        symbol,
        types.join(","),
        period1,
        period2
    )
}

pub fn chart_url(base: &str, ticker: &str) -> String {
    format!(
        "{}/{}?range=1y&interval=1d&events=div",
        base,
        urlencoding::encode(ticker)
    )
}

/// Converts a fundamentals-timeseries response into a raw statement.
pub fn parse_timeseries(body: &str, series: &[(&str, &str)]) -> Result<RawStatement> {
    let response: TimeseriesResponse = serde_json::from_str(body)?;
    let mut statement = RawStatement::new();

    for result in &response.timeseries.result {
        for series_type in &result.meta.types {
            let Some(key) = series_type.strip_prefix(SERIES_PREFIX) else {
                continue;
            };
            let Some((_, line_item)) = series.iter().find(|(k, _)| *k == key) else {
                continue;
            };
            let Some(values) = result.series.get(series_type) else {
                continue;
            };

            let points: Vec<Option<TimeseriesPoint>> = serde_json::from_value(values.clone())?;
            for point in points.into_iter().flatten() {
                if let Some(raw) = point.reported_value.and_then(|v| v.raw) {
                    statement.insert(*line_item, point.as_of_date, raw);
                }
            }
        }
    }

    Ok(statement)
}

/// Extracts price and trailing dividends from a chart response.
pub fn parse_chart(ticker: &str, body: &str) -> Result<Quote> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        return Err(RatioAnalysisError::FetchFailed {
            ticker: ticker.to_string(),
            reason: error
                .description
                .or(error.code)
                .unwrap_or_else(|| "chart error".to_string()),
        });
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| RatioAnalysisError::FetchFailed {
            ticker: ticker.to_string(),
            reason: "empty chart result".to_string(),
        })?;

    let price = result
        .meta
        .regular_market_price
        .or(result.meta.chart_previous_close)
        .or(result.meta.previous_close);

    let mut dividends: Vec<DividendEvent> = result
        .events
        .map(|e| e.dividends.into_values().collect())
        .unwrap_or_default();
    dividends.sort_by_key(|d| d.date);

    let dividend_per_share = if dividends.is_empty() {
        None
    } else {
        Some(
            dividends
                .iter()
                .rev()
                .take(TRAILING_DIVIDEND_COUNT)
                .map(|d| d.amount)
                .sum(),
        )
    };

    Ok(Quote {
        price,
        dividend_per_share,
        ..Quote::default()
    })
}

impl StatementProvider for YahooClient {
    fn fetch_statements(&self, ticker: &str) -> Result<StatementBundle> {
        let bundle = StatementBundle {
            income: self.fetch_series(ticker, INCOME_SERIES)?,
            balance_sheet: self.fetch_series(ticker, BALANCE_SHEET_SERIES)?,
            cash_flow: self.fetch_series(ticker, CASH_FLOW_SERIES)?,
        };
        info!(
            "Fetched Yahoo statements for {}: {} income, {} balance sheet, {} cash flow report dates",
            ticker,
            bundle.income.report_dates.len(),
            bundle.balance_sheet.report_dates.len(),
            bundle.cash_flow.report_dates.len()
        );
        Ok(bundle)
    }

    fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
        let url = chart_url(&self.chart_url, ticker);
        let body = self.get_text(ticker, &url)?;
        parse_chart(ticker, &body)
    }
}
