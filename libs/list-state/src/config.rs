use query_core::{FilterOperator, FilterType, FilterValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A selectable value for lookup filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupOption {
    pub value: Value,
    pub label: String,
}

impl LookupOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Declarative description of one filterable column of a list view.
///
/// `immutable` locks the column to `default_value`: the filter is always sent and
/// neither editing nor "clear all" can remove it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFilterConfig {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<FilterOperator>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lookup_options: Vec<LookupOption>,
    #[serde(default)]
    pub lookup_searchable: bool,
    /// Lookup options are loaded on demand by the view instead of `lookup_options`.
    #[serde(default)]
    pub use_dynamic_lookup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FilterValue>,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ColumnFilterConfig {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            operators: None,
            lookup_options: Vec::new(),
            lookup_searchable: false,
            use_dynamic_lookup: false,
            placeholder: None,
            default_value: None,
            immutable: false,
            label: None,
        }
    }

    pub fn text() -> Self {
        Self::new(FilterType::Text)
    }

    pub fn number() -> Self {
        Self::new(FilterType::Number)
    }

    pub fn date() -> Self {
        Self::new(FilterType::Date)
    }

    pub fn lookup(options: impl IntoIterator<Item = LookupOption>) -> Self {
        Self {
            lookup_options: options.into_iter().collect(),
            ..Self::new(FilterType::Lookup)
        }
    }

    pub fn boolean() -> Self {
        Self::new(FilterType::Boolean)
    }

    /// Restrict the offered operators. Operators the type does not support are discarded.
    pub fn with_operators(mut self, ops: impl IntoIterator<Item = FilterOperator>) -> Self {
        let ty = self.filter_type;
        self.operators = Some(ops.into_iter().filter(|op| ty.supports(*op)).collect());
        self
    }

    pub fn with_default(mut self, value: FilterValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Lock the column to `value`.
    pub fn locked(mut self, value: FilterValue) -> Self {
        self.default_value = Some(value);
        self.immutable = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn searchable(mut self) -> Self {
        self.lookup_searchable = true;
        self
    }

    pub fn dynamic_lookup(mut self) -> Self {
        self.use_dynamic_lookup = true;
        self
    }

    /// Operators a filter control offers for this column.
    pub fn allowed_operators(&self) -> Vec<FilterOperator> {
        match &self.operators {
            Some(ops) if !ops.is_empty() => ops.clone(),
            _ => self.filter_type.default_operators().to_vec(),
        }
    }

    pub fn allows(&self, op: FilterOperator) -> bool {
        self.allowed_operators().contains(&op)
    }
}
