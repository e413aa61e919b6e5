//! Backend-neutral predicate tree produced by the builder and lowered by storage adapters.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::filter::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Where the needle must occur. Matching is always case-insensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeMode {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bound {
    pub value: Scalar,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: Scalar) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Scalar) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Conjunction; empty means "match everything".
    All(Vec<Predicate>),
    /// Disjunction; empty means "match nothing".
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        field: String,
        op: CompareOp,
        value: Scalar,
    },
    Range {
        field: String,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    Like {
        field: String,
        needle: String,
        mode: LikeMode,
    },
    In {
        field: String,
        values: Vec<Scalar>,
        negate: bool,
    },
}

impl Predicate {
    pub fn always() -> Self {
        Predicate::All(Vec::new())
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Predicate::All(items) if items.iter().all(Predicate::is_unconstrained))
    }

    /// Field path a leaf predicate targets.
    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::Range { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::In { field, .. } => Some(field),
            Predicate::Not(inner) => inner.field(),
            Predicate::All(_) | Predicate::Any(_) => None,
        }
    }

    /// Every field path referenced anywhere in the tree.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::All(items) | Predicate::Any(items) => {
                for p in items {
                    p.collect_fields(out);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(out),
            leaf => {
                if let Some(f) = leaf.field() {
                    out.insert(f);
                }
            }
        }
    }
}

/// Group per-field conditions and fold ranges on the same field into one.
///
/// The result does not depend on input order: fields come out sorted by path,
/// ranges intersect (tightest bounds win), everything else is kept as a conjunct.
pub fn merge_conditions(conditions: Vec<Predicate>) -> Vec<Predicate> {
    let mut by_field: BTreeMap<String, Vec<Predicate>> = BTreeMap::new();
    let mut unscoped = Vec::new();

    for c in conditions {
        match c.field() {
            Some(f) => by_field.entry(f.to_string()).or_default().push(c),
            None => unscoped.push(c),
        }
    }

    let mut out = Vec::new();
    for (_, group) in by_field {
        out.extend(merge_field_group(group));
    }
    out.extend(unscoped);
    out
}

fn merge_field_group(group: Vec<Predicate>) -> Vec<Predicate> {
    let mut range: Option<Predicate> = None;
    let mut rest = Vec::new();

    for p in group {
        match p {
            Predicate::Range {
                field,
                lower,
                upper,
            } => {
                range = Some(match range.take() {
                    None => Predicate::Range {
                        field,
                        lower,
                        upper,
                    },
                    Some(Predicate::Range {
                        field,
                        lower: l0,
                        upper: u0,
                    }) => match (
                        tighter(l0.clone(), lower.clone(), Ordering::Greater),
                        tighter(u0.clone(), upper.clone(), Ordering::Less),
                    ) {
                        (Some(l), Some(u)) => Predicate::Range {
                            field,
                            lower: l,
                            upper: u,
                        },
                        // Incomparable operands: keep both as separate conjuncts.
                        _ => {
                            rest.push(Predicate::Range {
                                field: field.clone(),
                                lower,
                                upper,
                            });
                            Predicate::Range {
                                field,
                                lower: l0,
                                upper: u0,
                            }
                        }
                    },
                    Some(other) => other,
                });
            }
            other => rest.push(other),
        }
    }

    let mut out: Vec<Predicate> = range.into_iter().collect();
    rest.sort_by_key(|p| format!("{p:?}"));
    out.extend(rest);
    out
}

/// Pick the tighter of two optional bounds. `prefer` is the ordering that makes a
/// bound tighter (`Greater` for lower bounds, `Less` for upper bounds).
/// Returns `None` when both are present but not comparable.
fn tighter(a: Option<Bound>, b: Option<Bound>, prefer: Ordering) -> Option<Option<Bound>> {
    match (a, b) {
        (None, x) | (x, None) => Some(x),
        (Some(a), Some(b)) => {
            let ord = a.value.cmp_same_kind(&b.value)?;
            Some(Some(if ord == prefer {
                a
            } else if ord == prefer.reverse() {
                b
            } else {
                // equal values: exclusive is stricter
                Bound {
                    value: a.value,
                    inclusive: a.inclusive && b.inclusive,
                }
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn num(n: i64) -> Scalar {
        Scalar::Number(BigDecimal::from(n))
    }

    fn lower(field: &str, b: Bound) -> Predicate {
        Predicate::Range {
            field: field.into(),
            lower: Some(b),
            upper: None,
        }
    }

    fn upper(field: &str, b: Bound) -> Predicate {
        Predicate::Range {
            field: field.into(),
            lower: None,
            upper: Some(b),
        }
    }

    #[test]
    fn separate_bounds_fold_into_one_range() {
        let merged = merge_conditions(vec![
            lower("price", Bound::inclusive(num(10))),
            upper("price", Bound::inclusive(num(50))),
        ]);
        assert_eq!(
            merged,
            vec![Predicate::Range {
                field: "price".into(),
                lower: Some(Bound::inclusive(num(10))),
                upper: Some(Bound::inclusive(num(50))),
            }]
        );
    }

    #[test]
    fn merge_is_order_independent() {
        let a = lower("price", Bound::inclusive(num(10)));
        let b = lower("price", Bound::exclusive(num(20)));
        let c = upper("price", Bound::inclusive(num(50)));
        let d = Predicate::Like {
            field: "title".into(),
            needle: "cat".into(),
            mode: LikeMode::Contains,
        };

        let forward = merge_conditions(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
        let backward = merge_conditions(vec![d, c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(
            forward[0],
            Predicate::Range {
                field: "price".into(),
                lower: Some(Bound::exclusive(num(20))),
                upper: Some(Bound::inclusive(num(50))),
            }
        );
    }

    #[test]
    fn equal_bounds_keep_the_exclusive_one() {
        let merged = merge_conditions(vec![
            lower("n", Bound::inclusive(num(5))),
            lower("n", Bound::exclusive(num(5))),
        ]);
        assert_eq!(merged, vec![lower("n", Bound::exclusive(num(5)))]);
    }

    #[test]
    fn incomparable_ranges_stay_separate() {
        let merged = merge_conditions(vec![
            lower("n", Bound::inclusive(num(5))),
            lower("n", Bound::inclusive(Scalar::Text("x".into()))),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn unconstrained_detection_and_fields() {
        assert!(Predicate::always().is_unconstrained());
        assert!(Predicate::All(vec![Predicate::always()]).is_unconstrained());
        assert!(!Predicate::Any(vec![]).is_unconstrained());

        let p = Predicate::All(vec![
            Predicate::Not(Box::new(lower("createdAt", Bound::inclusive(num(1))))),
            Predicate::Any(vec![Predicate::Like {
                field: "author.displayName".into(),
                needle: "a".into(),
                mode: LikeMode::Contains,
            }]),
        ]);
        let fields: Vec<_> = p.fields().into_iter().collect();
        assert_eq!(fields, vec!["author.displayName", "createdAt"]);
    }
}
