//! # Rich Queries
//!
//! A small evaluator for Mango-style selector documents, the query dialect
//! of the platform's document state database:
//!
//! ```json
//! {"selector": {"objectType": "asset", "size": {"$gt": 5}}, "limit": 10}
//! ```
//!
//! Supported: implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`,
//! `$in`, `$exists`, and `$and` / `$or` over sub-selectors. Dotted field
//! names address nested objects. Values that are not JSON documents never
//! match, which keeps composite-key records out of every result set.
//!
//! Queries are evaluated against committed state with no phantom
//! protection; see [`crate::transaction::TxContext`] for the read-only rule.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::error::{LedgerError, LedgerResult};

/// Top-level fields accepted (and ignored) for compatibility with index
/// hints written for the platform's state database.
const IGNORED_TOP_LEVEL: [&str; 2] = ["use_index", "fields"];

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Exists(bool),
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Field { path: Vec<String>, condition: Condition },
}

/// A parsed rich query.
#[derive(Debug, Clone, PartialEq)]
pub struct RichQuery {
    selector: Selector,
    limit: Option<usize>,
}

fn invalid(msg: impl Into<String>) -> LedgerError {
    LedgerError::InvalidQuery(msg.into())
}

impl RichQuery {
    /// Parse a query string. The string is the substrate dialect and is
    /// taken verbatim from the caller.
    pub fn parse(query: &str) -> LedgerResult<Self> {
        let doc: Value = serde_json::from_str(query).map_err(|e| invalid(e.to_string()))?;
        let obj = doc
            .as_object()
            .ok_or_else(|| invalid("query must be a JSON object"))?;

        let mut selector = None;
        let mut limit = None;
        for (key, value) in obj {
            match key.as_str() {
                "selector" => {
                    let sel = value
                        .as_object()
                        .ok_or_else(|| invalid("selector must be an object"))?;
                    selector = Some(parse_selector(sel)?);
                }
                "limit" => {
                    let n = value
                        .as_u64()
                        .ok_or_else(|| invalid("limit must be a non-negative integer"))?;
                    limit = Some(n as usize);
                }
                k if IGNORED_TOP_LEVEL.contains(&k) => {}
                other => return Err(invalid(format!("unsupported query field {other:?}"))),
            }
        }

        Ok(Self {
            selector: selector.ok_or_else(|| invalid("query has no selector"))?,
            limit,
        })
    }

    /// Maximum number of results requested by the query, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Evaluate against raw stored bytes.
    pub fn matches_bytes(&self, bytes: &[u8]) -> bool {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(doc @ Value::Object(_)) => self.matches(&doc),
            _ => false,
        }
    }

    /// Evaluate against a decoded document.
    pub fn matches(&self, doc: &Value) -> bool {
        eval(&self.selector, doc)
    }
}

fn parse_selector(obj: &Map<String, Value>) -> LedgerResult<Selector> {
    let mut clauses = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        match key.as_str() {
            "$and" | "$or" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid(format!("{key} expects an array")))?;
                let subs = items
                    .iter()
                    .map(|item| {
                        item.as_object()
                            .ok_or_else(|| invalid(format!("{key} members must be objects")))
                            .and_then(parse_selector)
                    })
                    .collect::<LedgerResult<Vec<_>>>()?;
                clauses.push(if key == "$and" {
                    Selector::And(subs)
                } else {
                    Selector::Or(subs)
                });
            }
            k if k.starts_with('$') => {
                return Err(invalid(format!("unsupported combination operator {k}")));
            }
            field => {
                let path: Vec<String> = field.split('.').map(str::to_string).collect();
                for condition in parse_conditions(value)? {
                    clauses.push(Selector::Field {
                        path: path.clone(),
                        condition,
                    });
                }
            }
        }
    }
    Ok(match clauses.len() {
        1 => clauses.remove(0),
        _ => Selector::And(clauses),
    })
}

fn parse_conditions(value: &Value) -> LedgerResult<Vec<Condition>> {
    let ops = match value.as_object() {
        Some(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
        _ => return Ok(vec![Condition::Eq(value.clone())]),
    };

    ops.iter()
        .map(|(op, arg)| {
            Ok(match op.as_str() {
                "$eq" => Condition::Eq(arg.clone()),
                "$ne" => Condition::Ne(arg.clone()),
                "$gt" => Condition::Gt(arg.clone()),
                "$gte" => Condition::Gte(arg.clone()),
                "$lt" => Condition::Lt(arg.clone()),
                "$lte" => Condition::Lte(arg.clone()),
                "$in" => Condition::In(
                    arg.as_array()
                        .cloned()
                        .ok_or_else(|| invalid("$in expects an array"))?,
                ),
                "$exists" => Condition::Exists(
                    arg.as_bool()
                        .ok_or_else(|| invalid("$exists expects a boolean"))?,
                ),
                other => return Err(invalid(format!("unsupported operator {other}"))),
            })
        })
        .collect()
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |cur, seg| cur.as_object()?.get(seg))
}

/// Ordering between two JSON scalars of the same kind. Mixed kinds are
/// incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

fn eval(selector: &Selector, doc: &Value) -> bool {
    match selector {
        Selector::And(subs) => subs.iter().all(|s| eval(s, doc)),
        Selector::Or(subs) => subs.iter().any(|s| eval(s, doc)),
        Selector::Field { path, condition } => {
            let field = lookup(doc, path);
            match condition {
                Condition::Exists(want) => field.is_some() == *want,
                Condition::Eq(v) => field.is_some_and(|f| json_eq(f, v)),
                Condition::Ne(v) => field.is_some_and(|f| !json_eq(f, v)),
                Condition::In(vs) => field.is_some_and(|f| vs.iter().any(|v| json_eq(f, v))),
                Condition::Gt(v) => field.and_then(|f| compare(f, v)) == Some(Ordering::Greater),
                Condition::Gte(v) => matches!(
                    field.and_then(|f| compare(f, v)),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                Condition::Lt(v) => field.and_then(|f| compare(f, v)) == Some(Ordering::Less),
                Condition::Lte(v) => matches!(
                    field.and_then(|f| compare(f, v)),
                    Some(Ordering::Less | Ordering::Equal)
                ),
            }
        }
    }
}
