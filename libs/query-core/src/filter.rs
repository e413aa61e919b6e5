//! Column filter vocabulary: the loose wire form (`FilterValue`) and the closed,
//! type-checked form (`TypedFilter`) the predicate builder works with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::date::{parse_date_value, DayBounds};
use crate::error::FilterError;

/// Determines the legal operator set and the shape of a filter's operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Text,
    Number,
    Date,
    Lookup,
    Boolean,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
    Before,
    After,
    In,
    NotIn,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Between => "between",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "contains" => FilterOperator::Contains,
            "startsWith" => FilterOperator::StartsWith,
            "endsWith" => FilterOperator::EndsWith,
            "equals" => FilterOperator::Equals,
            "notEquals" => FilterOperator::NotEquals,
            "gt" => FilterOperator::Gt,
            "lt" => FilterOperator::Lt,
            "gte" => FilterOperator::Gte,
            "lte" => FilterOperator::Lte,
            "between" => FilterOperator::Between,
            "before" => FilterOperator::Before,
            "after" => FilterOperator::After,
            "in" => FilterOperator::In,
            "notIn" => FilterOperator::NotIn,
            _ => return Err(()),
        })
    }
}

impl FilterType {
    /// Operators a filter UI offers for this type by default.
    pub fn default_operators(self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            FilterType::Text => &[Contains, StartsWith, EndsWith, Equals, NotEquals],
            FilterType::Number => &[Equals, NotEquals, Gt, Lt, Gte, Lte, Between],
            FilterType::Date => &[Equals, Before, After, Between],
            FilterType::Lookup => &[In, NotIn],
            FilterType::Boolean => &[Equals],
        }
    }

    /// Every operator the server compiles for this type. Dates additionally accept
    /// the numeric comparison spellings with day-boundary semantics.
    pub fn operators(self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self {
            FilterType::Date => &[
                Equals, NotEquals, Before, After, Gt, Lt, Gte, Lte, Between,
            ],
            other => other.default_operators(),
        }
    }

    pub fn supports(self, op: FilterOperator) -> bool {
        self.operators().contains(&op)
    }
}

/// One column's filter as it travels on the wire: `{ operator, value, value2? }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterValue {
    pub operator: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
}

impl FilterValue {
    pub fn new(operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            operator: operator.as_str().to_string(),
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self {
            operator: FilterOperator::Between.as_str().to_string(),
            value: lower.into(),
            value2: Some(upper.into()),
        }
    }

    /// An empty value means "no filter" for the column.
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.value)
    }

    pub fn parsed_operator(&self) -> Option<FilterOperator> {
        self.operator.parse().ok()
    }
}

pub(crate) fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// A request's complete filter set: optional global search plus per-column filters.
/// Column keys may be dotted relation paths such as `author.displayName`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(
        rename = "globalSearch",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub global_search: Option<String>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, FilterValue>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_search(mut self, text: impl Into<String>) -> Self {
        self.global_search = Some(text.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>, filter: FilterValue) -> Self {
        self.columns.insert(column.into(), filter);
        self
    }

    /// Trimmed global search text, `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.global_search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Column filters that carry a value.
    pub fn active_columns(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.columns.iter().filter(|(_, f)| !f.is_empty())
    }

    /// True when nothing in this set constrains a query.
    pub fn is_unconstrained(&self) -> bool {
        self.search_text().is_none() && self.active_columns().next().is_none()
    }
}

/// A comparison operand after coercion from JSON.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scalar {
    Text(String),
    Number(BigDecimal),
    Bool(bool),
    DateTime(chrono::DateTime<chrono::Utc>),
}

impl Scalar {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Text(_) => "text",
            Scalar::Number(_) => "number",
            Scalar::Bool(_) => "bool",
            Scalar::DateTime(_) => "datetime",
        }
    }

    /// Ordering between two scalars of the same kind.
    pub fn cmp_same_kind(&self, other: &Scalar) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => Some(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::DateTime(a), Scalar::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "'{s}'"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NumberFilter {
    Equals(BigDecimal),
    NotEquals(BigDecimal),
    Gt(BigDecimal),
    Lt(BigDecimal),
    Gte(BigDecimal),
    Lte(BigDecimal),
    Between(BigDecimal, BigDecimal),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DateFilter {
    /// Anywhere within the day.
    On(DayBounds),
    NotOn(DayBounds),
    /// Strictly after the day ends (`after`, `gt`).
    After(DayBounds),
    /// Strictly before the day starts (`before`, `lt`).
    Before(DayBounds),
    /// From the day's start (`gte`).
    OnOrAfter(DayBounds),
    /// Through the day's end (`lte`).
    OnOrBefore(DayBounds),
    /// From the first day's start through the second day's end.
    Between(DayBounds, DayBounds),
}

/// A column filter whose operands have been checked against its type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedFilter {
    Text { op: TextOp, value: String },
    Number(NumberFilter),
    Date(DateFilter),
    Lookup { negate: bool, values: Vec<Scalar> },
    Boolean(bool),
}

impl TypedFilter {
    /// Check a wire filter against the column's type.
    pub fn parse(kind: FilterType, raw: &FilterValue) -> Result<Self, FilterError> {
        let op = raw
            .parsed_operator()
            .filter(|op| kind.supports(*op))
            .ok_or_else(|| FilterError::UnsupportedOperator {
                kind,
                operator: raw.operator.clone(),
            })?;

        match kind {
            FilterType::Text => {
                let value = text_operand(&raw.value)?;
                let op = match op {
                    FilterOperator::Contains => TextOp::Contains,
                    FilterOperator::StartsWith => TextOp::StartsWith,
                    FilterOperator::EndsWith => TextOp::EndsWith,
                    FilterOperator::Equals => TextOp::Equals,
                    _ => TextOp::NotEquals,
                };
                Ok(TypedFilter::Text { op, value })
            }
            FilterType::Number => {
                let n = number_operand(&raw.value)?;
                Ok(TypedFilter::Number(match op {
                    FilterOperator::Equals => NumberFilter::Equals(n),
                    FilterOperator::NotEquals => NumberFilter::NotEquals(n),
                    FilterOperator::Gt => NumberFilter::Gt(n),
                    FilterOperator::Lt => NumberFilter::Lt(n),
                    FilterOperator::Gte => NumberFilter::Gte(n),
                    FilterOperator::Lte => NumberFilter::Lte(n),
                    _ => NumberFilter::Between(n, number_operand(second(raw, op)?)?),
                }))
            }
            FilterType::Date => {
                let d = parse_date_value(&raw.value)?;
                Ok(TypedFilter::Date(match op {
                    FilterOperator::Equals => DateFilter::On(d),
                    FilterOperator::NotEquals => DateFilter::NotOn(d),
                    FilterOperator::After | FilterOperator::Gt => DateFilter::After(d),
                    FilterOperator::Before | FilterOperator::Lt => DateFilter::Before(d),
                    FilterOperator::Gte => DateFilter::OnOrAfter(d),
                    FilterOperator::Lte => DateFilter::OnOrBefore(d),
                    _ => DateFilter::Between(d, parse_date_value(second(raw, op)?)?),
                }))
            }
            FilterType::Lookup => {
                let values = match &raw.value {
                    Value::Array(items) => items.iter().map(lookup_operand).collect(),
                    single => lookup_operand(single).map(|v| vec![v]),
                }?;
                Ok(TypedFilter::Lookup {
                    negate: op == FilterOperator::NotIn,
                    values,
                })
            }
            FilterType::Boolean => Ok(TypedFilter::Boolean(bool_operand(&raw.value)?)),
        }
    }
}

fn second(raw: &FilterValue, op: FilterOperator) -> Result<&Value, FilterError> {
    raw.value2
        .as_ref()
        .filter(|v| !is_empty_value(v))
        .ok_or(FilterError::MissingSecondValue(op))
}

fn text_operand(v: &Value) -> Result<String, FilterError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FilterError::type_mismatch("string", other)),
    }
}

fn number_operand(v: &Value) -> Result<BigDecimal, FilterError> {
    let s = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(FilterError::type_mismatch("number", other)),
    };
    BigDecimal::from_str(&s).map_err(|_| FilterError::InvalidNumber(s))
}

fn lookup_operand(v: &Value) -> Result<Scalar, FilterError> {
    match v {
        Value::String(s) => Ok(Scalar::Text(s.clone())),
        Value::Number(n) => BigDecimal::from_str(&n.to_string())
            .map(Scalar::Number)
            .map_err(|_| FilterError::InvalidNumber(n.to_string())),
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        other => Err(FilterError::type_mismatch("scalar", other)),
    }
}

fn bool_operand(v: &Value) -> Result<bool, FilterError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(FilterError::type_mismatch("bool", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_sets_follow_type() {
        assert!(FilterType::Text.supports(FilterOperator::Contains));
        assert!(!FilterType::Text.supports(FilterOperator::Gt));
        assert!(FilterType::Number.supports(FilterOperator::Between));
        assert!(!FilterType::Lookup.supports(FilterOperator::Equals));
        assert!(FilterType::Date.supports(FilterOperator::Gte));
        assert!(!FilterType::Date.default_operators().contains(&FilterOperator::Gte));
        assert_eq!(FilterType::Boolean.operators(), &[FilterOperator::Equals]);
    }

    #[test]
    fn operator_names_round_trip_through_str() {
        for op in FilterType::Date.operators() {
            assert_eq!(op.as_str().parse::<FilterOperator>(), Ok(*op));
        }
        assert!("like".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn emptiness() {
        assert!(FilterValue::new(FilterOperator::Contains, "").is_empty());
        assert!(FilterValue::new(FilterOperator::Contains, "   ").is_empty());
        assert!(FilterValue::new(FilterOperator::In, json!([])).is_empty());
        assert!(FilterValue::new(FilterOperator::Equals, Value::Null).is_empty());
        assert!(!FilterValue::new(FilterOperator::Equals, json!(0)).is_empty());
        assert!(!FilterValue::new(FilterOperator::Equals, json!(false)).is_empty());
    }

    #[test]
    fn filter_options_wire_shape() {
        let raw = json!({
            "globalSearch": "cat",
            "title": { "operator": "contains", "value": "dog" },
            "author.displayName": { "operator": "startsWith", "value": "Al" }
        });
        let opts: FilterOptions = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(opts.search_text(), Some("cat"));
        assert_eq!(opts.columns.len(), 2);
        assert_eq!(opts.columns["author.displayName"].operator, "startsWith");
        assert_eq!(serde_json::to_value(&opts).unwrap(), raw);
    }

    #[test]
    fn filter_options_reject_malformed_column() {
        let raw = json!({ "title": "cat" });
        assert!(serde_json::from_value::<FilterOptions>(raw).is_err());
    }

    #[test]
    fn blank_search_is_unconstrained() {
        let opts = FilterOptions::new().with_global_search("  ");
        assert!(opts.is_unconstrained());
        let opts = opts.with_column("title", FilterValue::new(FilterOperator::Contains, ""));
        assert!(opts.is_unconstrained());
    }

    #[test]
    fn parse_rejects_operator_outside_type() {
        let raw = FilterValue::new(FilterOperator::Gt, "abc");
        let err = TypedFilter::parse(FilterType::Text, &raw).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));

        let raw = FilterValue {
            operator: "regex".into(),
            value: json!("a.*"),
            value2: None,
        };
        assert!(TypedFilter::parse(FilterType::Text, &raw).is_err());
    }

    #[test]
    fn between_requires_both_bounds() {
        let raw = FilterValue::new(FilterOperator::Between, 10);
        assert_eq!(
            TypedFilter::parse(FilterType::Number, &raw),
            Err(FilterError::MissingSecondValue(FilterOperator::Between))
        );
        let raw = FilterValue::between(10, "50");
        assert_eq!(
            TypedFilter::parse(FilterType::Number, &raw),
            Ok(TypedFilter::Number(NumberFilter::Between(
                BigDecimal::from(10),
                BigDecimal::from(50)
            )))
        );
    }

    #[test]
    fn lookup_coerces_single_value_to_list() {
        let raw = FilterValue::new(FilterOperator::NotIn, "u1");
        assert_eq!(
            TypedFilter::parse(FilterType::Lookup, &raw),
            Ok(TypedFilter::Lookup {
                negate: true,
                values: vec![Scalar::Text("u1".into())]
            })
        );
    }

    #[test]
    fn date_operator_aliases() {
        let raw = FilterValue::new(FilterOperator::Gt, "2024-03-15");
        let parsed = TypedFilter::parse(FilterType::Date, &raw).unwrap();
        assert!(matches!(parsed, TypedFilter::Date(DateFilter::After(_))));

        let raw = FilterValue::new(FilterOperator::Lte, "2024-03-15");
        let parsed = TypedFilter::parse(FilterType::Date, &raw).unwrap();
        assert!(matches!(parsed, TypedFilter::Date(DateFilter::OnOrBefore(_))));
    }

    #[test]
    fn boolean_accepts_string_spelling() {
        let raw = FilterValue::new(FilterOperator::Equals, "TRUE");
        assert_eq!(
            TypedFilter::parse(FilterType::Boolean, &raw),
            Ok(TypedFilter::Boolean(true))
        );
        let raw = FilterValue::new(FilterOperator::Equals, "yes");
        assert!(TypedFilter::parse(FilterType::Boolean, &raw).is_err());
    }
}
