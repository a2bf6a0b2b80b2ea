use anyhow::Result;
use financial_ratio_analyzer::*;

fn sample_bundle() -> StatementBundle {
    StatementBundle {
        income: RawStatement::from_cells(vec![
            ("Total Revenue", "2021-12-31", 900_000.0),
            ("Total Revenue", "2022-12-31", 1_000_000.0),
            ("Total Revenue", "2023-12-31", 1_150_000.0),
            ("Cost Of Revenue", "2021-12-31", 560_000.0),
            ("Cost Of Revenue", "2022-12-31", 610_000.0),
            ("Cost Of Revenue", "2023-12-31", 690_000.0),
            ("Gross Profit", "2021-12-31", 340_000.0),
            ("Gross Profit", "2022-12-31", 390_000.0),
            ("Gross Profit", "2023-12-31", 460_000.0),
            ("EBIT", "2021-12-31", 110_000.0),
            ("EBIT", "2022-12-31", 135_000.0),
            ("EBIT", "2023-12-31", 170_000.0),
            ("Interest Expense", "2022-12-31", 18_000.0),
            ("Interest Expense", "2023-12-31", 20_000.0),
            ("Net Income", "2021-12-31", 70_000.0),
            ("Net Income", "2022-12-31", 88_000.0),
            ("Net Income", "2023-12-31", 112_000.0),
            ("Basic EPS", "2023-12-31", 1.12),
        ]),
        balance_sheet: RawStatement::from_cells(vec![
            ("Total Assets", "2021-12-31", 1_500_000.0),
            ("Total Assets", "2022-12-31", 1_620_000.0),
            ("Total Assets", "2023-12-31", 1_750_000.0),
            ("Current Assets", "2022-12-31", 600_000.0),
            ("Current Assets", "2023-12-31", 680_000.0),
            ("Current Liabilities", "2022-12-31", 310_000.0),
            ("Current Liabilities", "2023-12-31", 330_000.0),
            ("Cash And Cash Equivalents", "2022-12-31", 120_000.0),
            ("Cash And Cash Equivalents", "2023-12-31", 150_000.0),
            ("Other Short Term Investments", "2022-12-31", 30_000.0),
            ("Other Short Term Investments", "2023-12-31", 25_000.0),
            ("Inventory", "2022-12-31", 210_000.0),
            ("Inventory", "2023-12-31", 235_000.0),
            ("Accounts Receivable", "2022-12-31", 95_000.0),
            ("Accounts Receivable", "2023-12-31", 105_000.0),
            ("Accounts Payable", "2022-12-31", 70_000.0),
            ("Accounts Payable", "2023-12-31", 82_000.0),
            ("Total Debt", "2022-12-31", 400_000.0),
            ("Total Debt", "2023-12-31", 380_000.0),
            ("Stockholders Equity", "2021-12-31", 820_000.0),
            ("Stockholders Equity", "2022-12-31", 900_000.0),
            ("Stockholders Equity", "2023-12-31", 990_000.0),
            ("Ordinary Shares Number", "2023-12-31", 100_000.0),
        ]),
        cash_flow: RawStatement::new(),
    }
}

fn main() -> Result<()> {
    // Optional path to a statements JSON file; falls back to built-in sample data
    let bundle = match std::env::args().nth(1) {
        Some(path) => StatementBundle::from_json_file(path)?,
        None => sample_bundle(),
    };

    let quote = Quote {
        price: Some(16.50),
        dividend_per_share: Some(0.40),
        ..Quote::default()
    };

    let processor = FinancialRatioProcessor::default();
    let statements = processor.normalize(&bundle)?;
    let table = processor.analyze(&statements, Some(&quote));

    if table.is_empty() {
        println!("No fiscal years available.");
        return Ok(());
    }

    let (start, end) = default_year_range(table.years()).unwrap_or((0, 0));
    let options = ReportOptions::default().with_year_range(start, end);
    let report = assemble(&table, &options)?;

    println!("=== Ratio Report ({}-{}) ===\n", start, end);
    for category in RatioCategory::ALL {
        let rows: Vec<&FlatRow> = report.rows_in(category).collect();
        if rows.is_empty() {
            continue;
        }
        println!("{}", category.label());
        for row in rows {
            let cells: Vec<String> = row.cells.iter().map(|c| format!("{:>14}", c)).collect();
            println!("  {:<28}{}", row.ratio, cells.join(""));
        }
        println!();
    }

    std::fs::write("ratio_report.csv", report.to_csv()?)?;
    println!("Wrote ratio_report.csv");

    Ok(())
}
