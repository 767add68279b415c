use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};

pub fn parse_document(text: &str) -> Html {
    Html::parse_document(text)
}

pub fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

/// All fragments matching `selector`, in document order. Empty when nothing
/// matches; deciding whether that is an error is up to the caller.
pub fn locate<'a>(document: &'a Html, selector: &Selector) -> Vec<Fragment<'a>> {
    document.select(selector).map(Fragment::new).collect()
}

/// A located table (or any sub-tree) of a parsed page.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    element: ElementRef<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Region label cell; holds its first non-blank text node, if any.
    Label(Option<String>),
    Value(String),
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Label(text) => text.as_deref().unwrap_or(""),
            Cell::Value(text) => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn cell_text(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(Cell::text)
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.cells.iter().any(|c| c.text().contains(needle))
    }
}

impl<'a> Fragment<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Every `<tr>` below the fragment with its `<td>` cells, in document
    /// order. Cells carrying `label_class` become [`Cell::Label`].
    pub fn rows(&self, label_class: Option<&str>) -> Vec<Row> {
        descendants_named(self.element, "tr")
            .map(|tr| Row {
                cells: descendants_named(tr, "td")
                    .map(|td| classify_cell(td, label_class))
                    .collect(),
            })
            .collect()
    }

    pub fn caption_text(&self) -> Option<String> {
        descendants_named(self.element, "caption")
            .next()
            .map(element_text)
    }

    /// Trimmed text of every element under the fragment matching `selector`.
    pub fn select_text(&self, selector: &Selector) -> Vec<String> {
        self.element.select(selector).map(element_text).collect()
    }
}

fn descendants_named<'a>(
    root: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn classify_cell(td: ElementRef<'_>, label_class: Option<&str>) -> Cell {
    let is_label = label_class.is_some_and(|class| td.value().classes().any(|c| c == class));
    if is_label {
        let label = td
            .text()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(str::to_string);
        Cell::Label(label)
    } else {
        Cell::Value(element_text(td))
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
