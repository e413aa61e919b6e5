//! Per-entity allow-list of filterable/sortable fields.
//!
//! Public field paths (`title`, `author.displayName`) map to table-qualified
//! columns. Fields on a to-one relation carry the join that makes the column
//! reachable from the entity's own select.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use query_core::{FieldResolver, FilterType, ResolvedField};
use sea_orm::sea_query::{ColumnRef, IntoColumnRef, SimpleExpr};
use sea_orm::{EntityTrait, RelationDef};

/// Storage kind of a column, used to coerce predicate operands into `sea_orm::Value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
}

impl FieldKind {
    /// Filter type offered for a column of this kind unless overridden.
    pub fn default_filter_type(self) -> FilterType {
        match self {
            FieldKind::String => FilterType::Text,
            FieldKind::I64 | FieldKind::F64 => FilterType::Number,
            FieldKind::Bool => FilterType::Boolean,
            FieldKind::Uuid => FilterType::Lookup,
            FieldKind::DateTimeUtc | FieldKind::Date => FilterType::Date,
        }
    }
}

/// A LEFT JOIN needed to reach a related column. Joins are de-duplicated by name.
#[derive(Clone, Copy)]
pub struct Join {
    pub name: &'static str,
    pub relation: fn() -> RelationDef,
}

impl Join {
    pub const fn new(name: &'static str, relation: fn() -> RelationDef) -> Self {
        Self { name, relation }
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Join").field(&self.name).finish()
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub path: String,
    pub column: ColumnRef,
    pub kind: FieldKind,
    pub filter_type: FilterType,
    pub join: Option<Join>,
}

impl Field {
    pub fn expr(&self) -> SimpleExpr {
        SimpleExpr::Column(self.column.clone())
    }
}

#[derive(Clone)]
pub struct FieldMap<E: EntityTrait> {
    fields: HashMap<String, Field>,
    aliases: HashMap<String, String>,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
            aliases: HashMap::new(),
            _entity: PhantomData,
        }
    }

    pub fn insert(self, path: impl Into<String>, col: E::Column, kind: FieldKind) -> Self {
        self.insert_as(path, col, kind, kind.default_filter_type())
    }

    pub fn insert_as(
        self,
        path: impl Into<String>,
        col: E::Column,
        kind: FieldKind,
        filter_type: FilterType,
    ) -> Self {
        let column = (E::default(), col).into_column_ref();
        self.put(path.into(), column, kind, filter_type, None)
    }

    /// Register a column of a to-one related entity, reached through `join`.
    pub fn insert_related<R: EntityTrait>(
        self,
        path: impl Into<String>,
        join: Join,
        col: R::Column,
        kind: FieldKind,
    ) -> Self {
        let column = (R::default(), col).into_column_ref();
        self.put(path.into(), column, kind, kind.default_filter_type(), Some(join))
    }

    /// Accept `column_id` as another name for `path`.
    pub fn alias(mut self, column_id: impl Into<String>, path: impl Into<String>) -> Self {
        self.aliases
            .insert(column_id.into().to_lowercase(), path.into().to_lowercase());
        self
    }

    fn put(
        mut self,
        path: String,
        column: ColumnRef,
        kind: FieldKind,
        filter_type: FilterType,
        join: Option<Join>,
    ) -> Self {
        self.fields.insert(
            path.to_lowercase(),
            Field {
                path,
                column,
                kind,
                filter_type,
                join,
            },
        );
        self
    }

    /// Look up a field by path or alias (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Field> {
        let key = name.to_lowercase();
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E: EntityTrait> FieldResolver for FieldMap<E> {
    fn resolve(&self, column_id: &str) -> Option<ResolvedField> {
        self.get(column_id).map(|f| ResolvedField {
            path: f.path.clone(),
            kind: f.filter_type,
        })
    }
}

/// Joins needed to reach `fields`, without duplicates, in first-seen order.
pub fn joins_for<'a, E, I>(fmap: &'a FieldMap<E>, fields: I) -> Vec<Join>
where
    E: EntityTrait,
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<Join> = Vec::new();
    for name in fields {
        if let Some(join) = fmap.get(name).and_then(|f| f.join) {
            if !out.iter().any(|j| j.name == join.name) {
                out.push(join);
            }
        }
    }
    out
}
