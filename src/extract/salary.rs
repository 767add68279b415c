//! Regional average salary tables.
//!
//! The source table carries no month headers per cell: each row block holds
//! three consecutive months for a region, and a region's rows follow each
//! other quarter by quarter. Month identity is therefore inferred from how
//! many months the region already has ([`MonthMap::assign_next`]) and from
//! where the row's quarter ends.

use crate::config::toml_config::SalaryConfig;
use crate::domain::model::SalaryYearRecord;
use crate::extract::locate::{compile_selector, locate, parse_document, Cell, Fragment, Row};
use crate::extract::parse_grouped_number;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOutcome {
    pub assigned: usize,
    pub skipped: usize,
}

/// Result of one salary page: the year record plus rows that had to be
/// abandoned, with their index among all rows of the page.
#[derive(Debug, Default)]
pub struct SalaryExtraction {
    pub record: SalaryYearRecord,
    pub row_failures: Vec<(usize, EtlError)>,
    pub skipped_cells: usize,
}

/// Folds one row into `record`.
///
/// `current_region` carries the region of the last label cell across rows, so
/// continuation rows without a label keep filling the same region. A label
/// cell without text aborts the row and clears the current region.
pub fn assign_row(
    record: &mut SalaryYearRecord,
    current_region: &mut Option<String>,
    row: &Row,
) -> Result<RowOutcome> {
    let mut outcome = RowOutcome::default();
    let mut finished = false;

    for cell in &row.cells {
        match cell {
            Cell::Label(label) => {
                let Some(name) = label else {
                    *current_region = None;
                    return Err(EtlError::structural(
                        "salary label cell",
                        "label cell carries no region name",
                    ));
                };
                if !record.contains_region(name) {
                    tracing::trace!("new region '{}'", name);
                    record.region_mut(name);
                }
                *current_region = Some(name.clone());
                finished = false;
            }
            Cell::Value(raw) => {
                if finished {
                    continue;
                }
                let Some(region) = current_region.as_deref() else {
                    outcome.skipped += 1;
                    continue;
                };
                let Some(value) = parse_grouped_number(raw) else {
                    tracing::trace!("skipping non-numeric cell '{}' for '{}'", raw, region);
                    outcome.skipped += 1;
                    continue;
                };
                match record.region_mut(region).assign_next(value) {
                    Some(month) => {
                        outcome.assigned += 1;
                        // quarter block complete, the rest of the row is another grouping
                        finished = month.closes_quarter();
                    }
                    None => finished = true,
                }
            }
        }
    }

    Ok(outcome)
}

/// Runs every row of every fragment through [`assign_row`], in document order.
pub fn extract_salary_table(fragments: &[Fragment<'_>], label_class: &str) -> SalaryExtraction {
    let mut extraction = SalaryExtraction::default();
    let mut current_region = None;

    let rows = fragments.iter().flat_map(|f| f.rows(Some(label_class)));
    for (index, row) in rows.enumerate() {
        match assign_row(&mut extraction.record, &mut current_region, &row) {
            Ok(outcome) => extraction.skipped_cells += outcome.skipped,
            Err(e) => extraction.row_failures.push((index, e)),
        }
    }

    extraction
}

pub fn extract_salary_document(html: &str, config: &SalaryConfig) -> Result<SalaryExtraction> {
    let selector = compile_selector(&config.table_selector)?;
    let document = parse_document(html);
    let fragments = locate(&document, &selector);
    if fragments.is_empty() {
        return Err(EtlError::structural(
            "salary table",
            format!("selector '{}' matched nothing", config.table_selector),
        ));
    }

    let extraction = extract_salary_table(&fragments, &config.label_class);
    tracing::debug!(
        "salary page: {} regions, {} skipped cells, {} failed rows",
        extraction.record.len(),
        extraction.skipped_cells,
        extraction.row_failures.len()
    );
    Ok(extraction)
}
