use crate::config::toml_config::UnemploymentConfig;
use crate::domain::model::UnemploymentSeries;
use crate::extract::locate::{compile_selector, locate, parse_document, Fragment};
use crate::extract::parse_decimal_comma;
use crate::utils::error::{EtlError, Result};

/// Reads every value element of the configured table in document order. The
/// first value that does not parse fails the whole page: the list has no
/// labels, so a gap would shift every later year.
pub fn extract_series(fragments: &[Fragment<'_>], config: &UnemploymentConfig) -> Result<Vec<f64>> {
    let table = fragments.get(config.table_index).ok_or_else(|| {
        EtlError::structural(
            "unemployment table",
            format!(
                "selector '{}' matched {} tables, table #{} expected",
                config.table_selector,
                fragments.len(),
                config.table_index + 1
            ),
        )
    })?;

    let value_selector = compile_selector(&config.value_selector)?;
    table
        .select_text(&value_selector)
        .into_iter()
        .map(|raw| {
            parse_decimal_comma(&raw)
                .ok_or_else(|| EtlError::value_parse(raw.as_str(), "unemployment rate"))
        })
        .collect()
}

/// The Nth value belongs to `base_year + N`, whatever the page says.
pub fn series_from_values(base_year: i32, values: &[f64]) -> UnemploymentSeries {
    let mut series = UnemploymentSeries::new();
    for (year, rate) in (base_year..).zip(values) {
        series.merge_year(year, *rate);
    }
    series
}

pub fn extract_series_document(html: &str, config: &UnemploymentConfig) -> Result<Vec<f64>> {
    let selector = compile_selector(&config.table_selector)?;
    let document = parse_document(html);
    let fragments = locate(&document, &selector);
    extract_series(&fragments, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(values: &[&str]) -> String {
        let cells: String = values
            .iter()
            .map(|v| format!("<tr><td>рік</td><td><big>{}</big></td></tr>", v))
            .collect();
        format!(
            r#"<html><body><div id="idx-wrapper">
                 <table><tr><td><big>header</big></td></tr></table>
                 <table>{}</table>
               </div></body></html>"#,
            cells
        )
    }

    #[test]
    fn test_values_keyed_from_base_year() {
        let html = page(&["11,6", "10,9", "9,6"]);
        let values = extract_series_document(&html, &UnemploymentConfig::default()).unwrap();
        assert_eq!(values, vec![11.6, 10.9, 9.6]);

        let series = series_from_values(2000, &values);
        assert_eq!(series.years().collect::<Vec<_>>(), vec![2000, 2001, 2002]);
        assert_eq!(series.get(2002), Some(&9.6));
    }

    #[test]
    fn test_bad_value_fails_whole_page() {
        let html = page(&["11,6", "н/д", "9,6"]);
        let err = extract_series_document(&html, &UnemploymentConfig::default()).unwrap_err();
        assert!(matches!(err, EtlError::ValueParse { .. }));
    }

    #[test]
    fn test_missing_second_table_is_structural() {
        let html = r#"<div id="idx-wrapper"><table><tr><td><big>1,0</big></td></tr></table></div>"#;
        let err = extract_series_document(html, &UnemploymentConfig::default()).unwrap_err();
        assert!(matches!(err, EtlError::Structural { .. }));
    }

    #[test]
    fn test_empty_list_gives_empty_series() {
        let html = page(&[]);
        let values = extract_series_document(&html, &UnemploymentConfig::default()).unwrap();
        assert!(values.is_empty());
        assert!(series_from_values(2000, &values).is_empty());
    }
}
