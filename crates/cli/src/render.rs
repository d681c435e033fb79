use comfy_table::{presets::ASCII_FULL, CellAlignment, Table};
use robo_core::results::{format_thousands, AllocationRow, Projection, ResultsView, Slice};
use std::fmt::Write;

pub fn results(view: &ResultsView) -> String {
    let mut out = String::new();
    let s = &view.summary;

    let _ = writeln!(out, "== Portfolio Overview ==");
    let _ = writeln!(out, "Risk Level:               {}", s.risk_level);
    let _ = writeln!(out, "Expected Annual Return:   {}", s.expected_annual_return);
    let _ = writeln!(out, "Max Expected Yearly Loss: {}", s.max_expected_yearly_loss);
    let _ = writeln!(out, "Investment Horizon:       {}", s.investment_horizon);
    let _ = writeln!(out, "Risk badge:               {}", view.risk_badge.color);

    let _ = writeln!(out, "\n== Portfolio Commentary ==\n{}", view.commentary);

    let _ = writeln!(out, "\n== Asset Allocation ==");
    out.push_str(&table(&view.allocation_table));

    let _ = writeln!(out, "\n== Asset Details ==");
    for detail in &view.asset_details {
        let _ = writeln!(out, "{}\n  {}", detail.title, detail.description);
        if let Some(link) = &detail.link {
            let _ = writeln!(out, "  More information: {link}");
        }
    }

    let _ = writeln!(out, "\n== Allocation by Asset Class ==");
    out.push_str(&slices(&view.by_asset_class));
    let _ = writeln!(out, "\n== Allocation by Currency ==");
    out.push_str(&slices(&view.by_currency));

    let _ = writeln!(out, "\n== Portfolio Value Projection ({}) ==", view.currency);
    let _ = writeln!(out, "{}", projection(&view.projection));
    out
}

fn table(rows: &[AllocationRow]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL).set_header(AllocationRow::HEADERS);
    for row in rows {
        table.add_row(row.cells());
    }
    format!("{table}\n")
}

fn slices(slices: &[Slice]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL).set_header(["Label", "Share"]);
    for slice in slices {
        table.add_row([slice.label.clone(), format!("{:.2}%", slice.value)]);
    }
    align_right(&mut table, &[1]);
    format!("{table}\n")
}

fn projection(p: &Projection) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_header(["Year", "Lower", "Expected", "Upper"]);
    for (i, year) in p.years.iter().enumerate() {
        table.add_row([
            year.to_string(),
            format_thousands(p.lower_values[i]),
            format_thousands(p.base_values[i]),
            format_thousands(p.upper_values[i]),
        ]);
    }
    align_right(&mut table, &[0, 1, 2, 3]);
    table
}

fn align_right(table: &mut Table, columns: &[usize]) {
    for &idx in columns {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robo_core::domain::inputs::{Currency, RiskProfile, UserInputs};
    use robo_core::domain::portfolio::{AssetAllocation, PortfolioRecord, Recommendation};

    fn view() -> ResultsView {
        let rec = Recommendation {
            inputs: UserInputs::try_new(50_000.0, RiskProfile::Medium, 15.0, 2, Currency::Usd)
                .unwrap(),
            record: PortfolioRecord {
                portfolio: vec![AssetAllocation {
                    asset_name: "Vanguard Total Bond Market".to_string(),
                    ticker: "BND".to_string(),
                    allocation_percentage: 100.0,
                    investment_amount: 50_000.0,
                    asset_class: "Bond".to_string(),
                    currency: "USD".to_string(),
                    description: "US investment grade bonds.".to_string(),
                    link: Some("https://investor.vanguard.com".to_string()),
                    buying_strategy: "Buy monthly".to_string(),
                }],
                portfolio_commentary: Some("Low volatility core.".to_string()),
                expected_annual_return: Some(4.0),
                risk_level: Some("Medium".to_string()),
                max_expected_yearly_loss: Some(6.0),
            },
            generated_at: chrono::Utc::now(),
        };
        ResultsView::build(&rec)
    }

    #[test]
    fn renders_every_section() {
        let text = results(&view());
        assert!(text.contains("Risk Level:               Medium"));
        assert!(text.contains("Expected Annual Return:   4.00%"));
        assert!(text.contains("BND"));
        assert!(text.contains("USD 50,000.00"));
        assert!(text.contains("More information: https://investor.vanguard.com"));
        assert!(text.contains("Bond"));
        assert!(text.contains("54,080.00"));
    }

    #[test]
    fn table_columns_align() {
        let text = table(&view().allocation_table);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.iter().any(|l| l.contains("Asset Name") && l.contains("Ticker")));
        assert!(lines.iter().any(|l| l.contains("BND")));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn projection_lists_every_year() {
        let text = results(&view());
        let section = text.split("== Portfolio Value Projection (USD) ==").nth(1).unwrap();
        let rows: Vec<&str> = section.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[3].contains("52,020.00"));
        assert!(rows[3].contains("54,080.00"));
        assert!(rows[3].contains("56,180.00"));
    }
}
