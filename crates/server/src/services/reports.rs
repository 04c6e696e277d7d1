//! Excel report generation.
//!
//! Each report is a single worksheet named "Report": a header row, one row
//! per record, a blank row, and a totals row. Rows are built as plain
//! [`Cell`] tables first so their content can be checked without parsing
//! XLSX.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use stockroom_core::{CustomerIdentity, Money};

use crate::models::{Product, SaleSummary};

/// Worksheet name used by every report.
pub const SHEET_NAME: &str = "Report";
/// Download name of the sales value report.
pub const SALES_REPORT_FILE: &str = "sales_value_report.xlsx";
/// Download name of the stock report.
pub const STOCK_REPORT_FILE: &str = "stock_report.xlsx";
/// Content type of XLSX downloads.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors from building a workbook.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    fn money(m: Money) -> Self {
        Self::Number(m.to_f64())
    }

    fn amount(d: Decimal) -> Self {
        Self::Number(d.to_f64().unwrap_or_default())
    }
}

/// A report as headers plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

/// Download name of a customer's purchase report.
#[must_use]
pub fn customer_report_file(customer: &CustomerIdentity) -> String {
    format!("customer_purchases_{}.xlsx", customer.file_stem())
}

fn date_cell(sale: &SaleSummary) -> Cell {
    Cell::text(sale.created_at.format("%Y-%m-%d").to_string())
}

/// Every sale plus the grand total.
#[must_use]
pub fn sales_value_table(sales: &[SaleSummary]) -> Table {
    let mut rows: Vec<Vec<Cell>> = sales
        .iter()
        .map(|sale| {
            vec![
                Cell::text(sale.id.to_string()),
                Cell::text(sale.customer.name()),
                Cell::text(sale.customer.id()),
                date_cell(sale),
                Cell::money(sale.total),
            ]
        })
        .collect();

    let total: Decimal = sales.iter().map(|s| s.total.amount()).sum();
    rows.push(vec![]);
    rows.push(vec![
        Cell::Blank,
        Cell::text("TOTAL SALES VALUE"),
        Cell::Blank,
        Cell::Blank,
        Cell::amount(total),
    ]);

    Table {
        headers: &["Sale ID", "Customer", "Customer ID", "Date", "Total"],
        rows,
    }
}

/// Every product with its inventory value, plus total units.
#[must_use]
pub fn stock_table(products: &[Product]) -> Table {
    let mut rows: Vec<Vec<Cell>> = products
        .iter()
        .map(|p| {
            vec![
                Cell::text(&p.name),
                Cell::money(p.price),
                Cell::Number(f64::from(p.stock)),
                // At most 10^10 × 2^32, well inside `Decimal`.
                Cell::amount(p.price.amount() * Decimal::from(p.stock)),
            ]
        })
        .collect();

    let units: u64 = products.iter().map(|p| u64::from(p.stock)).sum();
    rows.push(vec![]);
    #[allow(clippy::cast_precision_loss)] // unit counts stay far below 2^53
    rows.push(vec![
        Cell::text("TOTAL UNITS IN STOCK"),
        Cell::Blank,
        Cell::Number(units as f64),
        Cell::Blank,
    ]);

    Table {
        headers: &["Product", "Unit Price", "Current Stock", "Inventory Value"],
        rows,
    }
}

/// One customer's sales plus what they spent in total.
#[must_use]
pub fn customer_purchases_table(sales: &[SaleSummary]) -> Table {
    let mut rows: Vec<Vec<Cell>> = sales
        .iter()
        .map(|sale| {
            vec![
                Cell::text(sale.id.to_string()),
                date_cell(sale),
                Cell::money(sale.total),
            ]
        })
        .collect();

    let spent: Decimal = sales.iter().map(|s| s.total.amount()).sum();
    rows.push(vec![]);
    rows.push(vec![
        Cell::Blank,
        Cell::text("TOTAL SPENT BY CUSTOMER"),
        Cell::amount(spent),
    ]);

    Table {
        headers: &["Sale ID", "Date", "Sale Total"],
        rows,
    }
}

/// Render a table to XLSX bytes.
///
/// # Errors
///
/// Returns `ReportError::Xlsx` if the workbook cannot be written.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in (0u16..).zip(table.headers) {
        sheet.write_string_with_format(0, col, *header, &bold)?;
    }

    for (row, cells) in (1u32..).zip(&table.rows) {
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(row, col, s)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row, col, *n)?;
                }
                Cell::Blank => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
