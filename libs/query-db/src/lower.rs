//! `query_core::Predicate` → `sea_orm::Condition` lowering.
//!
//! The predicate arrives already compiled from client filters; this layer only
//! resolves field paths through the entity's `FieldMap` and coerces operands into
//! column-typed values.

use bigdecimal::{BigDecimal, ToPrimitive};
use query_core::{Bound, CompareOp, LikeMode, Predicate, Scalar};
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{Condition, DbBackend, EntityTrait};
use thiserror::Error;
use tracing::warn;

use crate::field_map::{joins_for, Field, FieldKind, FieldMap, Join};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LowerError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("type mismatch: expected {expected:?}, got {got}")]
    TypeMismatch {
        expected: FieldKind,
        got: &'static str,
    },

    #[error("invalid {kind:?} value: {value}")]
    InvalidValue { kind: FieldKind, value: String },

    #[error("text match on non-text field: {0}")]
    NotText(String),
}

pub type LowerResult<T> = Result<T, LowerError>;

/* ---------- coercion ---------- */

fn number_value(kind: FieldKind, n: &BigDecimal) -> LowerResult<sea_orm::Value> {
    let invalid = || LowerError::InvalidValue {
        kind,
        value: n.to_string(),
    };
    match kind {
        FieldKind::I64 if n.is_integer() => {
            Ok(sea_orm::Value::BigInt(Some(n.to_i64().ok_or_else(invalid)?)))
        }
        // fractional operand against an integer column compares as a double
        FieldKind::I64 | FieldKind::F64 => {
            Ok(sea_orm::Value::Double(Some(n.to_f64().ok_or_else(invalid)?)))
        }
        expected => Err(LowerError::TypeMismatch {
            expected,
            got: "number",
        }),
    }
}

pub fn coerce(kind: FieldKind, v: &Scalar) -> LowerResult<sea_orm::Value> {
    Ok(match (kind, v) {
        (FieldKind::String, Scalar::Text(s)) => sea_orm::Value::String(Some(Box::new(s.clone()))),
        (FieldKind::String, Scalar::Number(n)) => sea_orm::Value::String(Some(Box::new(n.to_string()))),
        (FieldKind::I64 | FieldKind::F64, Scalar::Number(n)) => number_value(kind, n)?,
        // lookup options from selects usually arrive as strings
        (FieldKind::I64 | FieldKind::F64, Scalar::Text(s)) => {
            let n = s
                .trim()
                .parse::<BigDecimal>()
                .map_err(|_| LowerError::InvalidValue {
                    kind,
                    value: s.clone(),
                })?;
            number_value(kind, &n)?
        }
        (FieldKind::Bool, Scalar::Bool(b)) => sea_orm::Value::Bool(Some(*b)),
        (FieldKind::Uuid, Scalar::Text(s)) => {
            let u = s
                .trim()
                .parse::<uuid::Uuid>()
                .map_err(|_| LowerError::InvalidValue {
                    kind,
                    value: s.clone(),
                })?;
            sea_orm::Value::Uuid(Some(Box::new(u)))
        }
        (FieldKind::DateTimeUtc, Scalar::DateTime(dt)) => {
            sea_orm::Value::ChronoDateTimeUtc(Some(Box::new(*dt)))
        }
        (FieldKind::Date, Scalar::DateTime(dt)) => {
            sea_orm::Value::ChronoDate(Some(Box::new(dt.date_naive())))
        }
        (expected, other) => {
            return Err(LowerError::TypeMismatch {
                expected,
                got: other.kind_name(),
            })
        }
    })
}

fn coerce_many(kind: FieldKind, items: &[Scalar]) -> LowerResult<Vec<sea_orm::Value>> {
    items.iter().map(|v| coerce(kind, v)).collect()
}

/* ---------- LIKE helpers ---------- */

/// Escape character for LIKE patterns.
const LIKE_ESCAPE: char = '!';

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | LIKE_ESCAPE => {
                out.push(LIKE_ESCAPE);
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// How a backend's `lower()` folds text. The needle is folded the same way so
/// that it can match what `lower(column)` produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseFold {
    /// SQLite: only `A-Z` are folded, other letters compare as stored.
    Ascii,
    Unicode,
}

impl CaseFold {
    pub fn for_backend(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Sqlite => CaseFold::Ascii,
            _ => CaseFold::Unicode,
        }
    }

    pub fn apply(self, s: &str) -> String {
        match self {
            CaseFold::Ascii => s.to_ascii_lowercase(),
            CaseFold::Unicode => s.to_lowercase(),
        }
    }
}

/// Case-folded, escaped LIKE pattern matched against `lower(column)`.
pub fn like_pattern(needle: &str, mode: LikeMode, fold: CaseFold) -> String {
    let s = like_escape(&fold.apply(needle));
    match mode {
        LikeMode::Contains => format!("%{s}%"),
        LikeMode::StartsWith => format!("{s}%"),
        LikeMode::EndsWith => format!("%{s}"),
    }
}

fn never() -> SimpleExpr {
    Expr::cust("1=0")
}

/* ---------- Predicate -> Condition ---------- */

fn field<'a, E: EntityTrait>(fmap: &'a FieldMap<E>, name: &str) -> LowerResult<&'a Field> {
    fmap.get(name)
        .ok_or_else(|| LowerError::UnknownField(name.to_string()))
}

fn bound_expr(f: &Field, b: &Bound, lower: bool) -> LowerResult<SimpleExpr> {
    let v = coerce(f.kind, &b.value)?;
    let col = Expr::col(f.column.clone());
    Ok(match (lower, b.inclusive) {
        (true, true) => col.gte(v),
        (true, false) => col.gt(v),
        (false, true) => col.lte(v),
        (false, false) => col.lt(v),
    })
}

/// Strict lowering: any unresolvable or mistyped leaf fails the whole subtree.
pub fn predicate_to_condition<E: EntityTrait>(
    p: &Predicate,
    fmap: &FieldMap<E>,
    fold: CaseFold,
) -> LowerResult<Condition> {
    Ok(match p {
        Predicate::All(items) => {
            let mut c = Condition::all();
            for item in items {
                c = c.add(predicate_to_condition(item, fmap, fold)?);
            }
            c
        }
        Predicate::Any(items) => {
            if items.is_empty() {
                return Ok(Condition::all().add(never()));
            }
            let mut c = Condition::any();
            for item in items {
                c = c.add(predicate_to_condition(item, fmap, fold)?);
            }
            c
        }
        Predicate::Not(inner) => Condition::all()
            .add(predicate_to_condition(inner, fmap, fold)?)
            .not(),
        Predicate::Compare {
            field: name,
            op,
            value,
        } => {
            let f = field(fmap, name)?;
            let v = coerce(f.kind, value)?;
            let col = Expr::col(f.column.clone());
            Condition::all().add(match op {
                CompareOp::Eq => col.eq(v),
                CompareOp::Ne => col.ne(v),
            })
        }
        Predicate::Range {
            field: name,
            lower,
            upper,
        } => {
            let f = field(fmap, name)?;
            let mut c = Condition::all();
            if let Some(b) = lower {
                c = c.add(bound_expr(f, b, true)?);
            }
            if let Some(b) = upper {
                c = c.add(bound_expr(f, b, false)?);
            }
            c
        }
        Predicate::Like {
            field: name,
            needle,
            mode,
        } => {
            let f = field(fmap, name)?;
            if f.kind != FieldKind::String {
                return Err(LowerError::NotText(name.clone()));
            }
            let pattern = LikeExpr::new(like_pattern(needle, *mode, fold)).escape(LIKE_ESCAPE);
            Condition::all().add(Expr::expr(Func::lower(Expr::col(f.column.clone()))).like(pattern))
        }
        Predicate::In {
            field: name,
            values,
            negate,
        } => {
            let f = field(fmap, name)?;
            let vals = coerce_many(f.kind, values)?;
            let col = Expr::col(f.column.clone());
            match (vals.is_empty(), negate) {
                (true, false) => Condition::all().add(never()),
                (true, true) => Condition::all(),
                (false, false) => Condition::all().add(col.is_in(vals)),
                (false, true) => Condition::all().add(col.is_not_in(vals)),
            }
        }
    })
}

/// A lowered filter plus the joins its columns need.
#[derive(Clone, Debug)]
pub struct LoweredFilter {
    pub condition: Condition,
    pub joins: Vec<Join>,
}

/// Lower a compiled filter, isolating failures per top-level conjunct: a conjunct
/// that does not fit its column is dropped with a warning and the rest still apply.
pub fn lower_filter<E: EntityTrait>(
    p: &Predicate,
    fmap: &FieldMap<E>,
    fold: CaseFold,
) -> LoweredFilter {
    let conjuncts: Vec<&Predicate> = match p {
        Predicate::All(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut condition = Condition::all();
    let mut kept = Vec::new();
    for c in conjuncts {
        match predicate_to_condition(c, fmap, fold) {
            Ok(cond) => {
                condition = condition.add(cond);
                kept.push(c);
            }
            Err(e) => {
                warn!(field = c.field().unwrap_or("<group>"), error = %e, "dropping filter condition");
            }
        }
    }

    let joins = joins_for(fmap, kept.iter().flat_map(|c| c.fields()));
    LoweredFilter { condition, joins }
}
