//! `FilterOptions` → `Predicate` compiler.
//!
//! Pure function of its inputs: the filter set, an allow-list of filterable fields
//! and the entity's global-search configuration. Nothing from the request reaches
//! the predicate unless its column id resolves through the allow-list.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::FilterError;
use crate::filter::{
    DateFilter, FilterOptions, FilterType, FilterValue, NumberFilter, Scalar, TextOp, TypedFilter,
};
use crate::predicate::{merge_conditions, Bound, CompareOp, LikeMode, Predicate};

/// A filterable field: its canonical path and the filter type it accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedField {
    pub path: String,
    pub kind: FilterType,
}

/// Allow-list lookup from a client column id to a field.
pub trait FieldResolver {
    fn resolve(&self, column_id: &str) -> Option<ResolvedField>;
}

/// In-memory allow-list. Column ids are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct FieldTable {
    entries: HashMap<String, ResolvedField>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field addressed by its own path.
    pub fn field(self, path: impl Into<String>, kind: FilterType) -> Self {
        let path = path.into();
        self.alias(path.clone(), path, kind)
    }

    /// Register a column id that maps to a different field path.
    pub fn alias(
        mut self,
        column_id: impl Into<String>,
        path: impl Into<String>,
        kind: FilterType,
    ) -> Self {
        self.entries.insert(
            column_id.into().to_lowercase(),
            ResolvedField {
                path: path.into(),
                kind,
            },
        );
        self
    }
}

impl FieldResolver for FieldTable {
    fn resolve(&self, column_id: &str) -> Option<ResolvedField> {
        self.entries.get(&column_id.to_lowercase()).cloned()
    }
}

/// Fields matched by the free-text global search, OR-ed together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchConfig {
    fields: Vec<String>,
}

impl SearchConfig {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Column filters AND (search OR ...); `All([])` when nothing applies.
    pub predicate: Predicate,
    /// Trimmed global search text, if any was supplied.
    pub search: Option<String>,
}

/// Compile a filter set. Bad or unknown column filters are dropped, never fatal.
pub fn build_predicate<R>(filter: &FilterOptions, fields: &R, search: &SearchConfig) -> CompiledFilter
where
    R: FieldResolver + ?Sized,
{
    let mut conditions = Vec::new();

    for (column_id, raw) in filter.active_columns() {
        let Some(field) = fields.resolve(column_id) else {
            debug!(column = %column_id, "dropping filter on unknown column");
            continue;
        };
        match compile_column(&field, raw) {
            Ok(p) => conditions.push(p),
            Err(e) => {
                warn!(
                    column = %column_id,
                    operator = %raw.operator,
                    error = %e,
                    "skipping invalid column filter"
                );
            }
        }
    }

    let mut clauses = merge_conditions(conditions);

    let text = filter.search_text().map(str::to_string);
    if let Some(needle) = text.as_deref() {
        if let Some(clause) = search_clause(needle, fields, search) {
            clauses.push(clause);
        }
    }

    CompiledFilter {
        predicate: Predicate::All(clauses),
        search: text,
    }
}

/// Compile one column filter against its resolved field.
pub fn compile_column(field: &ResolvedField, raw: &FilterValue) -> Result<Predicate, FilterError> {
    let typed = TypedFilter::parse(field.kind, raw)?;
    Ok(typed_to_predicate(field.path.clone(), typed))
}

fn typed_to_predicate(field: String, typed: TypedFilter) -> Predicate {
    let range = |field: String, lower: Option<Bound>, upper: Option<Bound>| Predicate::Range {
        field,
        lower,
        upper,
    };
    let at = Scalar::DateTime;

    match typed {
        TypedFilter::Text { op, value } => match op {
            TextOp::Contains => like(field, value, LikeMode::Contains),
            TextOp::StartsWith => like(field, value, LikeMode::StartsWith),
            TextOp::EndsWith => like(field, value, LikeMode::EndsWith),
            TextOp::Equals => compare(field, CompareOp::Eq, Scalar::Text(value)),
            TextOp::NotEquals => compare(field, CompareOp::Ne, Scalar::Text(value)),
        },
        TypedFilter::Number(n) => match n {
            NumberFilter::Equals(v) => compare(field, CompareOp::Eq, Scalar::Number(v)),
            NumberFilter::NotEquals(v) => compare(field, CompareOp::Ne, Scalar::Number(v)),
            NumberFilter::Gt(v) => range(field, Some(Bound::exclusive(Scalar::Number(v))), None),
            NumberFilter::Gte(v) => range(field, Some(Bound::inclusive(Scalar::Number(v))), None),
            NumberFilter::Lt(v) => range(field, None, Some(Bound::exclusive(Scalar::Number(v)))),
            NumberFilter::Lte(v) => range(field, None, Some(Bound::inclusive(Scalar::Number(v)))),
            NumberFilter::Between(lo, hi) => range(
                field,
                Some(Bound::inclusive(Scalar::Number(lo))),
                Some(Bound::inclusive(Scalar::Number(hi))),
            ),
        },
        TypedFilter::Date(d) => match d {
            DateFilter::On(day) => range(
                field,
                Some(Bound::inclusive(at(day.start))),
                Some(Bound::inclusive(at(day.end))),
            ),
            DateFilter::NotOn(day) => Predicate::Not(Box::new(range(
                field,
                Some(Bound::inclusive(at(day.start))),
                Some(Bound::inclusive(at(day.end))),
            ))),
            DateFilter::After(day) => range(field, Some(Bound::exclusive(at(day.end))), None),
            DateFilter::Before(day) => range(field, None, Some(Bound::exclusive(at(day.start)))),
            DateFilter::OnOrAfter(day) => range(field, Some(Bound::inclusive(at(day.start))), None),
            DateFilter::OnOrBefore(day) => range(field, None, Some(Bound::inclusive(at(day.end)))),
            DateFilter::Between(from, to) => range(
                field,
                Some(Bound::inclusive(at(from.start))),
                Some(Bound::inclusive(at(to.end))),
            ),
        },
        TypedFilter::Lookup { negate, values } => Predicate::In {
            field,
            values,
            negate,
        },
        TypedFilter::Boolean(b) => compare(field, CompareOp::Eq, Scalar::Bool(b)),
    }
}

fn like(field: String, needle: String, mode: LikeMode) -> Predicate {
    Predicate::Like {
        field,
        needle,
        mode,
    }
}

fn compare(field: String, op: CompareOp, value: Scalar) -> Predicate {
    Predicate::Compare { field, op, value }
}

fn search_clause<R>(needle: &str, fields: &R, search: &SearchConfig) -> Option<Predicate>
where
    R: FieldResolver + ?Sized,
{
    if search.is_empty() {
        return None;
    }
    let any: Vec<Predicate> = search
        .fields()
        .iter()
        .filter_map(|name| match fields.resolve(name) {
            Some(f) => Some(like(f.path, needle.to_string(), LikeMode::Contains)),
            None => {
                warn!(field = %name, "search field is not in the field table");
                None
            }
        })
        .collect();
    (!any.is_empty()).then_some(Predicate::Any(any))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;
    use bigdecimal::BigDecimal;
    use serde_json::json;

    fn posts_table() -> FieldTable {
        FieldTable::new()
            .field("title", FilterType::Text)
            .field("createdAt", FilterType::Date)
            .field("price", FilterType::Number)
            .field("published", FilterType::Boolean)
            .field("author.displayName", FilterType::Text)
            .alias("authorId", "author.id", FilterType::Lookup)
    }

    fn search() -> SearchConfig {
        SearchConfig::new(["title", "author.displayName"])
    }

    #[test]
    fn empty_filter_is_unconstrained() {
        let out = build_predicate(&FilterOptions::new(), &posts_table(), &search());
        assert!(out.predicate.is_unconstrained());
        assert_eq!(out.search, None);

        let blank = FilterOptions::new().with_global_search("");
        let out = build_predicate(&blank, &posts_table(), &search());
        assert!(out.predicate.is_unconstrained());
    }

    #[test]
    fn unknown_column_is_dropped() {
        let f = FilterOptions::new()
            .with_column("password", FilterValue::new(FilterOperator::Equals, "x"))
            .with_column("title", FilterValue::new(FilterOperator::Contains, "cat"));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        let fields: Vec<_> = out.predicate.fields().into_iter().collect();
        assert_eq!(fields, vec!["title"]);
    }

    #[test]
    fn alias_maps_to_nested_path() {
        let f = FilterOptions::new()
            .with_column("authorId", FilterValue::new(FilterOperator::In, json!(["u1"])));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        assert_eq!(
            out.predicate,
            Predicate::All(vec![Predicate::In {
                field: "author.id".into(),
                values: vec![Scalar::Text("u1".into())],
                negate: false,
            }])
        );
    }

    #[test]
    fn between_compiles_to_single_range() {
        let f = FilterOptions::new().with_column("price", FilterValue::between(10, 50));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        assert_eq!(
            out.predicate,
            Predicate::All(vec![Predicate::Range {
                field: "price".into(),
                lower: Some(Bound::inclusive(Scalar::Number(BigDecimal::from(10)))),
                upper: Some(Bound::inclusive(Scalar::Number(BigDecimal::from(50)))),
            }])
        );
    }

    #[test]
    fn date_equals_covers_whole_day() {
        let f = FilterOptions::new()
            .with_column("createdAt", FilterValue::new(FilterOperator::Equals, "2024-03-15"));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        let Predicate::All(items) = out.predicate else {
            panic!("expected conjunction");
        };
        let Predicate::Range { lower, upper, .. } = &items[0] else {
            panic!("expected range");
        };
        let lo = lower.as_ref().unwrap();
        let hi = upper.as_ref().unwrap();
        assert!(lo.inclusive && hi.inclusive);
        assert_eq!(
            lo.value,
            Scalar::DateTime("2024-03-15T00:00:00Z".parse().unwrap())
        );
        assert_eq!(
            hi.value,
            Scalar::DateTime("2024-03-15T23:59:59.999Z".parse().unwrap())
        );
    }

    #[test]
    fn date_comparisons_use_day_edges() {
        let table = posts_table();
        let compile = |op| {
            compile_column(
                &table.resolve("createdAt").unwrap(),
                &FilterValue::new(op, "2024-03-15"),
            )
            .unwrap()
        };
        let start = Scalar::DateTime("2024-03-15T00:00:00Z".parse().unwrap());
        let end = Scalar::DateTime("2024-03-15T23:59:59.999Z".parse().unwrap());

        assert_eq!(
            compile(FilterOperator::Gt),
            Predicate::Range {
                field: "createdAt".into(),
                lower: Some(Bound::exclusive(end.clone())),
                upper: None
            }
        );
        assert_eq!(compile(FilterOperator::After), compile(FilterOperator::Gt));
        assert_eq!(
            compile(FilterOperator::Before),
            Predicate::Range {
                field: "createdAt".into(),
                lower: None,
                upper: Some(Bound::exclusive(start.clone()))
            }
        );
        assert_eq!(
            compile(FilterOperator::Gte),
            Predicate::Range {
                field: "createdAt".into(),
                lower: Some(Bound::inclusive(start)),
                upper: None
            }
        );
        assert_eq!(
            compile(FilterOperator::Lte),
            Predicate::Range {
                field: "createdAt".into(),
                lower: None,
                upper: Some(Bound::inclusive(end))
            }
        );
        assert!(matches!(compile(FilterOperator::NotEquals), Predicate::Not(_)));
    }

    #[test]
    fn date_between_spans_first_start_to_last_end() {
        let p = compile_column(
            &posts_table().resolve("createdAt").unwrap(),
            &FilterValue::between("2024-03-01", "2024-03-31"),
        )
        .unwrap();
        assert_eq!(
            p,
            Predicate::Range {
                field: "createdAt".into(),
                lower: Some(Bound::inclusive(Scalar::DateTime(
                    "2024-03-01T00:00:00Z".parse().unwrap()
                ))),
                upper: Some(Bound::inclusive(Scalar::DateTime(
                    "2024-03-31T23:59:59.999Z".parse().unwrap()
                ))),
            }
        );
    }

    #[test]
    fn global_search_is_or_across_fields_and_anded() {
        let f = FilterOptions::new()
            .with_global_search("  cat ")
            .with_column("published", FilterValue::new(FilterOperator::Equals, true));
        let out = build_predicate(&f, &posts_table(), &search());
        assert_eq!(out.search.as_deref(), Some("cat"));
        assert_eq!(
            out.predicate,
            Predicate::All(vec![
                Predicate::Compare {
                    field: "published".into(),
                    op: CompareOp::Eq,
                    value: Scalar::Bool(true),
                },
                Predicate::Any(vec![
                    Predicate::Like {
                        field: "title".into(),
                        needle: "cat".into(),
                        mode: LikeMode::Contains,
                    },
                    Predicate::Like {
                        field: "author.displayName".into(),
                        needle: "cat".into(),
                        mode: LikeMode::Contains,
                    },
                ]),
            ])
        );
    }

    #[test]
    fn search_without_config_only_reports_text() {
        let f = FilterOptions::new().with_global_search("cat");
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        assert!(out.predicate.is_unconstrained());
        assert_eq!(out.search.as_deref(), Some("cat"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn bad_filter_is_skipped_with_warning() {
        let f = FilterOptions::new()
            .with_column("createdAt", FilterValue::new(FilterOperator::Equals, "yesterday-ish"))
            .with_column("title", FilterValue::new(FilterOperator::Contains, "cat"));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        let fields: Vec<_> = out.predicate.fields().into_iter().collect();
        assert_eq!(fields, vec!["title"]);
        assert!(logs_contain("skipping invalid column filter"));
        assert!(logs_contain("createdAt"));
    }

    #[test]
    fn wrong_operator_for_type_is_skipped() {
        let f = FilterOptions::new()
            .with_column("published", FilterValue::new(FilterOperator::Contains, "tru"));
        let out = build_predicate(&f, &posts_table(), &SearchConfig::none());
        assert!(out.predicate.is_unconstrained());
    }
}
