// src/output.rs
use std::fs::File;
use std::io::{self, Write};

/// One row of a pricing report
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub method: String,
    pub kind: String,
    pub price: f64,
    /// `None` for analytic methods
    pub standard_error: Option<f64>,
    pub time_ms: f64,
}

pub fn write_price_table_to_csv(filename: &str, rows: &[PriceRow]) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "method,kind,price,standard_error,time_ms")?;
    for row in rows {
        let se = row
            .standard_error
            .map(|se| format!("{:.8}", se))
            .unwrap_or_default();
        writeln!(
            file,
            "{},{},{:.8},{},{:.3}",
            row.method, row.kind, row.price, se, row.time_ms
        )?;
    }
    Ok(())
}

pub fn write_summary_to_csv(filename: &str, summary_data: &[(&str, &str)]) -> io::Result<()> {
    let mut file = File::create(filename)?;
    for (key, value) in summary_data {
        writeln!(file, "{},{}", key, value)?;
    }
    Ok(())
}
