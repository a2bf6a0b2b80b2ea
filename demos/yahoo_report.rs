use anyhow::Result;
use financial_ratio_analyzer::yahoo::YahooClient;
use financial_ratio_analyzer::*;

fn main() -> Result<()> {
    let ticker = std::env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());

    let processor = FinancialRatioProcessor::default();
    let loader = StatementLoader::new(YahooClient::new()?, processor.config().statement_cache());

    let table = processor.analyze_ticker(&loader, &ticker)?;
    if table.is_empty() {
        println!("No statements found for {}", ticker);
        return Ok(());
    }

    let report = assemble(&table, &ReportOptions::default())?;
    println!("{}", report.to_csv()?);

    Ok(())
}
