//! Column-definition-driven table engine.
//!
//! A [`Table`] owns column descriptors and the active sort; rows are passed in
//! on every call, so the same table can render successive snapshots of a
//! query. Clicks resolve to an action value of type `A` chosen by the caller.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Value produced by a column accessor
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// The field is absent for this row
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Default ordering: numbers numerically, text lexicographically, numbers
    /// before text. `Empty` is placed by the caller.
    fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Text(_), _) => Ordering::Greater,
            (_, CellValue::Text(_)) => Ordering::Less,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }

    fn render(&self, precision: Option<usize>) -> String {
        match (self, precision) {
            (CellValue::Float(v), Some(p)) => format!("{:.*}", p, v),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Horizontal alignment hint for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

/// The single active sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column is not sortable: {0}")]
    NotSortable(String),
}

pub type Derive<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;
pub type Action<R, A> = Arc<dyn Fn(&R) -> A + Send + Sync>;
pub type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// How a column obtains its value and whether its cells are clickable
pub enum ColumnKind<R, A> {
    /// Reads a field of the row
    Plain(fn(&R) -> CellValue),
    /// Computes a value, e.g. from a sparse map keyed by a catalog id
    Derived(Derive<R>),
    /// Computed value whose cell click yields its own action instead of the row's
    Actionable { value: Derive<R>, action: Action<R, A> },
}

impl<R, A> Clone for ColumnKind<R, A> {
    fn clone(&self) -> Self {
        match self {
            ColumnKind::Plain(f) => ColumnKind::Plain(*f),
            ColumnKind::Derived(f) => ColumnKind::Derived(Arc::clone(f)),
            ColumnKind::Actionable { value, action } => ColumnKind::Actionable {
                value: Arc::clone(value),
                action: Arc::clone(action),
            },
        }
    }
}

/// Descriptor of one table column
pub struct ColumnDef<R, A = ()> {
    id: String,
    header: String,
    kind: ColumnKind<R, A>,
    align: Align,
    sortable: bool,
    precision: Option<usize>,
    max_width: Option<usize>,
    comparator: Option<Comparator<R>>,
}

impl<R, A> Clone for ColumnDef<R, A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            header: self.header.clone(),
            kind: self.kind.clone(),
            align: self.align,
            sortable: self.sortable,
            precision: self.precision,
            max_width: self.max_width,
            comparator: self.comparator.clone(),
        }
    }
}

impl<R, A> fmt::Debug for ColumnDef<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ColumnKind::Plain(_) => "plain",
            ColumnKind::Derived(_) => "derived",
            ColumnKind::Actionable { .. } => "actionable",
        };
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("kind", &kind)
            .field("sortable", &self.sortable)
            .finish()
    }
}

impl<R, A> ColumnDef<R, A> {
    fn with_kind(id: impl Into<String>, header: impl Into<String>, kind: ColumnKind<R, A>) -> Self {
        Self {
            id: id.into(),
            header: header.into(),
            kind,
            align: Align::Left,
            sortable: true,
            precision: None,
            max_width: None,
            comparator: None,
        }
    }

    pub fn plain(id: impl Into<String>, header: impl Into<String>, field: fn(&R) -> CellValue) -> Self {
        Self::with_kind(id, header, ColumnKind::Plain(field))
    }

    pub fn derived<F>(id: impl Into<String>, header: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&R) -> CellValue + Send + Sync + 'static,
    {
        Self::with_kind(id, header, ColumnKind::Derived(Arc::new(derive)))
    }

    pub fn actionable<F, G>(id: impl Into<String>, header: impl Into<String>, value: F, action: G) -> Self
    where
        F: Fn(&R) -> CellValue + Send + Sync + 'static,
        G: Fn(&R) -> A + Send + Sync + 'static,
    {
        Self::with_kind(
            id,
            header,
            ColumnKind::Actionable {
                value: Arc::new(value),
                action: Arc::new(action),
            },
        )
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Fixed number of decimals for float cells
    pub fn precision(mut self, decimals: usize) -> Self {
        self.precision = Some(decimals);
        self
    }

    /// Truncate rendered cells wider than `width` columns
    pub fn max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Replace the value-based ordering
    pub fn comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(compare));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self.kind, ColumnKind::Actionable { .. })
    }

    pub fn value(&self, row: &R) -> CellValue {
        match &self.kind {
            ColumnKind::Plain(field) => field(row),
            ColumnKind::Derived(derive) => derive(row),
            ColumnKind::Actionable { value, .. } => value(row),
        }
    }

    fn ordering(&self, direction: SortDirection, a: &R, b: &R) -> Ordering {
        if let Some(compare) = &self.comparator {
            return direction.apply(compare(a, b));
        }

        let (a, b) = (self.value(a), self.value(b));
        match (a.is_empty(), b.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => direction.apply(a.compare(&b)),
        }
    }

    fn render_cell(&self, row: &R) -> String {
        let text = self.value(row).render(self.precision).replace(['\n', '\r'], " ");
        match self.max_width {
            Some(width) => truncate(&text, width),
            None => text,
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Header cell as rendered
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub id: String,
    pub label: String,
    pub align: Align,
    pub sorted: Option<SortDirection>,
}

impl HeaderCell {
    /// Label followed by the sort indicator, if any
    pub fn text(&self) -> String {
        match self.sorted {
            Some(direction) => format!("{} {}", self.label, direction.indicator()),
            None => self.label.clone(),
        }
    }
}

/// Output of [`Table::render`]: headers plus one row of strings per input row,
/// in display order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<String>>,
}

impl RenderedTable {
    /// Plain-text grid with columns aligned by display width
    pub fn to_text(&self) -> String {
        let headers: Vec<String> = self.headers.iter().map(HeaderCell::text).collect();
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&self.headers)
                .zip(&widths)
                .map(|((cell, header), width)| pad(cell, *width, header.align))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&headers));
        out.push('\n');
        let total: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

/// Table over rows of type `R` whose clicks produce actions of type `A`
pub struct Table<R, A = ()> {
    columns: Vec<ColumnDef<R, A>>,
    sort: Option<SortSpec>,
    on_row_click: Option<Action<R, A>>,
}

impl<R, A> Table<R, A> {
    pub fn new(columns: Vec<ColumnDef<R, A>>) -> Self {
        Self {
            columns,
            sort: None,
            on_row_click: None,
        }
    }

    /// Start with the given sort. Unknown columns are ignored.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        if self.column(&sort.column).is_some() {
            self.sort = Some(sort);
        }
        self
    }

    pub fn on_row_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&R) -> A + Send + Sync + 'static,
    {
        self.on_row_click = Some(Arc::new(handler));
        self
    }

    pub fn columns(&self) -> &[ColumnDef<R, A>] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&ColumnDef<R, A>> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Look a column up by id, falling back to a case-insensitive header match
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef<R, A>> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|c| c.header.eq_ignore_ascii_case(name)))
    }

    /// Swap in regenerated column descriptors. The sort survives only if its
    /// column still exists.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef<R, A>>) {
        self.columns = columns;
        if let Some(sort) = &self.sort {
            if self.column(&sort.column).is_none() {
                self.sort = None;
            }
        }
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Header click: flip the direction of the sorted column, or sort a new
    /// column ascending. The sort is never cleared.
    pub fn toggle_sort(&mut self, column_id: &str) -> Result<&SortSpec, TableError> {
        let column = self
            .column(column_id)
            .ok_or_else(|| TableError::UnknownColumn(column_id.to_string()))?;
        if !column.sortable {
            return Err(TableError::NotSortable(column_id.to_string()));
        }

        let next = match self.sort.take() {
            Some(current) if current.column == column_id => SortSpec {
                direction: current.direction.flipped(),
                ..current
            },
            _ => SortSpec::ascending(column_id),
        };
        Ok(self.sort.insert(next))
    }

    /// Replace the sort outright, e.g. from a command line option
    pub fn set_sort(&mut self, sort: SortSpec) -> Result<(), TableError> {
        let column = self
            .column(&sort.column)
            .ok_or_else(|| TableError::UnknownColumn(sort.column.clone()))?;
        if !column.sortable {
            return Err(TableError::NotSortable(sort.column));
        }
        self.sort = Some(sort);
        Ok(())
    }

    /// Rows in display order. Stable: ties keep their input order.
    pub fn sorted_rows<'a>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let mut sorted: Vec<&R> = rows.iter().collect();
        let Some(sort) = &self.sort else {
            return sorted;
        };
        if let Some(column) = self.column(&sort.column) {
            sorted.sort_by(|a, b| column.ordering(sort.direction, a, b));
        }
        sorted
    }

    pub fn render(&self, rows: &[R]) -> RenderedTable {
        let headers = self
            .columns
            .iter()
            .map(|column| HeaderCell {
                id: column.id.clone(),
                label: column.header.clone(),
                align: column.align,
                sorted: self
                    .sort
                    .as_ref()
                    .filter(|s| s.column == column.id)
                    .map(|s| s.direction),
            })
            .collect();

        let rows = self
            .sorted_rows(rows)
            .into_iter()
            .map(|row| self.columns.iter().map(|c| c.render_cell(row)).collect())
            .collect();

        RenderedTable { headers, rows }
    }

    /// Click on the row at display position `index`
    pub fn click_row(&self, rows: &[R], index: usize) -> Option<A> {
        let row = *self.sorted_rows(rows).get(index)?;
        self.on_row_click.as_ref().map(|handler| handler(row))
    }

    /// Click on one cell. Actionable cells yield their own action and do not
    /// reach the row handler; other cells behave like a row click.
    pub fn click_cell(&self, rows: &[R], index: usize, column_id: &str) -> Option<A> {
        let row = *self.sorted_rows(rows).get(index)?;
        match self.column(column_id).map(|c| &c.kind) {
            Some(ColumnKind::Actionable { action, .. }) => Some(action(row)),
            Some(_) => self.on_row_click.as_ref().map(|handler| handler(row)),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        rank: i64,
        name: &'static str,
        score: f64,
        extra: HashMap<&'static str, f64>,
    }

    fn entry(rank: i64, name: &'static str, score: f64) -> Entry {
        Entry {
            rank,
            name,
            score,
            extra: HashMap::new(),
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Click {
        Row(i64),
        Cell(i64, &'static str),
    }

    fn columns() -> Vec<ColumnDef<Entry, Click>> {
        vec![
            ColumnDef::plain("rank", "Rank", |e: &Entry| e.rank.into()),
            ColumnDef::plain("name", "Model", |e: &Entry| e.name.into()).align(Align::Right),
            ColumnDef::plain("score", "Score", |e: &Entry| e.score.into()),
            ColumnDef::actionable(
                "math",
                "Math",
                |e: &Entry| e.extra.get("math").copied().into(),
                |e: &Entry| Click::Cell(e.rank, "math"),
            ),
        ]
    }

    fn table() -> Table<Entry, Click> {
        Table::new(columns()).on_row_click(|e: &Entry| Click::Row(e.rank))
    }

    fn ranks(rows: Vec<&Entry>) -> Vec<i64> {
        rows.into_iter().map(|e| e.rank).collect()
    }

    #[test]
    fn test_sort_descending_by_score() {
        let rows = vec![entry(2, "b", 80.0), entry(1, "a", 95.0)];
        let table = table().with_sort(SortSpec::descending("score"));

        assert_eq!(ranks(table.sorted_rows(&rows)), vec![1, 2]);
    }

    #[test]
    fn test_toggle_same_column_reverses() {
        let rows = vec![entry(2, "b", 80.0), entry(1, "a", 95.0)];
        let mut table = table().with_sort(SortSpec::descending("score"));

        let spec = table.toggle_sort("score").unwrap();
        assert_eq!(spec.direction, SortDirection::Ascending);
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![2, 1]);

        // Two-state: toggling again goes back to descending, never cleared.
        let spec = table.toggle_sort("score").unwrap();
        assert_eq!(spec.direction, SortDirection::Descending);
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![1, 2]);
    }

    #[test]
    fn test_toggle_new_column_replaces_sort_ascending() {
        let mut table = table().with_sort(SortSpec::descending("score"));
        let spec = table.toggle_sort("name").unwrap().clone();
        assert_eq!(spec, SortSpec::ascending("name"));
        assert_eq!(table.sort_spec(), Some(&spec));
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let rows = vec![
            entry(1, "first", 80.0),
            entry(2, "second", 90.0),
            entry(3, "third", 80.0),
            entry(4, "fourth", 80.0),
        ];
        let mut table = table().with_sort(SortSpec::descending("score"));
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![2, 1, 3, 4]);

        table.toggle_sort("score").unwrap();
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_empty_values_sort_last_in_both_directions() {
        let mut with_math = entry(1, "a", 0.0);
        with_math.extra.insert("math", 0.2);
        let mut higher_math = entry(3, "c", 0.0);
        higher_math.extra.insert("math", 0.9);
        let rows = vec![with_math, entry(2, "b", 0.0), higher_math];

        let mut table = table();
        table.toggle_sort("math").unwrap();
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![1, 3, 2]);

        table.toggle_sort("math").unwrap();
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![3, 1, 2]);
    }

    #[test]
    fn test_text_sorts_lexicographically() {
        let rows = vec![entry(1, "zeta", 0.0), entry(2, "alpha", 0.0), entry(3, "mu", 0.0)];
        let mut table = table();
        table.toggle_sort("name").unwrap();
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![2, 3, 1]);
    }

    #[test]
    fn test_custom_comparator() {
        let rows = vec![entry(1, "aaa", 0.0), entry(2, "b", 0.0), entry(3, "cc", 0.0)];
        let columns = vec![
            ColumnDef::<Entry, Click>::plain("name", "Model", |e: &Entry| e.name.into())
                .comparator(|a: &Entry, b: &Entry| a.name.len().cmp(&b.name.len())),
        ];
        let table = Table::new(columns).with_sort(SortSpec::ascending("name"));
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![2, 3, 1]);
    }

    #[test]
    fn test_toggle_errors() {
        let columns = vec![
            ColumnDef::<Entry, Click>::plain("name", "Model", |e: &Entry| e.name.into()).sortable(false),
        ];
        let mut table = Table::new(columns);
        assert_eq!(
            table.toggle_sort("name").unwrap_err(),
            TableError::NotSortable("name".to_string())
        );
        assert_eq!(
            table.toggle_sort("missing").unwrap_err(),
            TableError::UnknownColumn("missing".to_string())
        );
        assert!(table.sort_spec().is_none());
    }

    #[test]
    fn test_missing_derived_value_renders_empty_cell() {
        let mut scored = entry(1, "a", 1.0);
        scored.extra.insert("math", 0.5);
        let rows = vec![scored, entry(2, "b", 2.0)];

        let rendered = table().render(&rows);
        assert_eq!(rendered.rows[0][3], "0.5");
        assert_eq!(rendered.rows[1][3], "");
        assert!(!rendered.to_text().contains("undefined"));
    }

    #[test]
    fn test_empty_rows_render_headers_only() {
        let rendered = table().with_sort(SortSpec::descending("score")).render(&[]);
        assert!(rendered.rows.is_empty());
        assert_eq!(rendered.headers.len(), 4);
        assert_eq!(rendered.headers[2].text(), "Score ↓");

        let text = rendered.to_text();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Rank | Model | Score ↓ | Math"));
    }

    #[test]
    fn test_row_click_resolves_sorted_row() {
        let rows = vec![entry(2, "b", 80.0), entry(1, "a", 95.0)];
        let table = table().with_sort(SortSpec::descending("score"));

        assert_eq!(table.click_row(&rows, 0), Some(Click::Row(1)));
        assert_eq!(table.click_row(&rows, 1), Some(Click::Row(2)));
        assert_eq!(table.click_row(&rows, 2), None);
    }

    #[test]
    fn test_actionable_cell_click_does_not_reach_row_handler() {
        let rows = vec![entry(7, "a", 1.0)];
        let table = table();

        assert_eq!(table.click_cell(&rows, 0, "math"), Some(Click::Cell(7, "math")));
        assert_eq!(table.click_cell(&rows, 0, "name"), Some(Click::Row(7)));
        assert_eq!(table.click_cell(&rows, 0, "nope"), None);
    }

    #[test]
    fn test_row_click_without_handler() {
        let rows = vec![entry(1, "a", 1.0)];
        let table = Table::new(columns());
        assert_eq!(table.click_row(&rows, 0), None);
        assert_eq!(table.click_cell(&rows, 0, "math"), Some(Click::Cell(1, "math")));
    }

    #[test]
    fn test_set_columns_drops_sort_on_removed_column() {
        let mut table = table().with_sort(SortSpec::descending("math"));
        table.set_columns(columns().into_iter().take(3).collect());
        assert!(table.sort_spec().is_none());

        let mut table = table.with_sort(SortSpec::ascending("rank"));
        table.set_columns(columns());
        assert_eq!(table.sort_spec(), Some(&SortSpec::ascending("rank")));
    }

    #[test]
    fn test_set_sort_validates_column() {
        let rows = vec![entry(1, "a", 95.0), entry(2, "b", 80.0)];
        let mut table = table();

        table.set_sort(SortSpec::ascending("score")).unwrap();
        assert_eq!(ranks(table.sorted_rows(&rows)), vec![2, 1]);

        assert_eq!(
            table.set_sort(SortSpec::ascending("nope")),
            Err(TableError::UnknownColumn("nope".to_string()))
        );
        assert_eq!(table.sort_spec(), Some(&SortSpec::ascending("score")));
    }

    #[test]
    fn test_find_column_by_header() {
        let table = table();
        assert_eq!(table.find_column("score").map(|c| c.id()), Some("score"));
        assert_eq!(table.find_column("MODEL").map(|c| c.id()), Some("name"));
        assert!(table.find_column("nothing").is_none());
    }

    #[test]
    fn test_with_sort_ignores_unknown_column() {
        let table = table().with_sort(SortSpec::ascending("nope"));
        assert!(table.sort_spec().is_none());
    }

    #[test]
    fn test_text_alignment_and_truncation() {
        let columns = vec![
            ColumnDef::<Entry, Click>::plain("name", "Model", |e: &Entry| e.name.into())
                .align(Align::Right),
            ColumnDef::plain("score", "Score", |e: &Entry| e.score.into()).precision(2),
            ColumnDef::plain("long", "Q", |_: &Entry| "a very long\nquestion".into()).max_width(6),
        ];
        let rows = vec![entry(1, "ab", 1.0), entry(2, "abcdefg", 0.333)];
        let rendered = Table::new(columns).render(&rows);

        assert_eq!(rendered.rows[0], vec!["ab", "1.00", "a ver…"]);
        let text = rendered.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "  Model | Score | Q");
        assert_eq!(lines[2], "     ab | 1.00  | a ver…");
        assert_eq!(lines[3], "abcdefg | 0.33  | a ver…");
    }

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(Some(3_i64)), CellValue::Int(3));
        assert_eq!(CellValue::from(None::<f64>), CellValue::Empty);
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Float(95.0).to_string(), "95");
        assert_eq!(CellValue::Int(2).compare(&CellValue::Float(2.5)), Ordering::Less);
    }
}
