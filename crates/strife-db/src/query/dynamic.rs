//! Dynamically named operations.
//!
//! A name such as `whereUsername` or `incrementScore` is split into a verb
//! prefix and a lower-cased field name, then handed to the named operation
//! it stands for. Names of built-in operations never decompose.

use crate::error::{DbError, Result};
use crate::value::SqlValue;

/// Verb recognised at the start of a dynamic operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicVerb {
    /// `where<Field>(value)` or `where<Field>(op, value)`
    Where,
    /// `orWhere<Field>(value)` or `orWhere<Field>(op, value)`
    OrWhere,
    /// `increment<Field>(amount?)`
    Increment,
    /// `decrement<Field>(amount?)`
    Decrement,
    /// `pull<Field>()`
    Pull,
    /// `orderBy<Field>(direction?)`
    OrderBy,
}

// `orwhere` precedes `where` so the longer prefix wins.
const PREFIXES: &[(&str, DynamicVerb)] = &[
    ("orwhere", DynamicVerb::OrWhere),
    ("where", DynamicVerb::Where),
    ("increment", DynamicVerb::Increment),
    ("decrement", DynamicVerb::Decrement),
    ("pull", DynamicVerb::Pull),
    ("orderby", DynamicVerb::OrderBy),
];

// Built-in names that would otherwise match a verb prefix, lower-cased.
const BUILT_INS: &[&str] = &[
    "where",
    "orwhere",
    "wherein",
    "wherebetween",
    "orwherebetween",
    "orderby",
    "increment",
    "decrement",
    "pull",
];

/// A parsed dynamic call: verb, target field and raw arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicCall {
    /// The operation to delegate to.
    pub verb: DynamicVerb,
    /// Lower-cased field name taken from the rest of the name.
    pub field: String,
    /// Arguments passed with the call.
    pub args: Vec<SqlValue>,
}

impl DynamicCall {
    /// Parses `name` by prefix.
    ///
    /// Prefix matching ignores letter case. The field must be a plain
    /// identifier. Built-in names such as `whereIn` are rejected.
    pub fn parse(name: &str, args: Vec<SqlValue>) -> Result<Self> {
        let lowered = name.to_ascii_lowercase();
        if BUILT_INS.contains(&lowered.as_str()) {
            return Err(DbError::UnknownOperation(name.to_owned()));
        }
        let (verb, field) = PREFIXES
            .iter()
            .find_map(|(prefix, verb)| lowered.strip_prefix(prefix).map(|rest| (*verb, rest)))
            .ok_or_else(|| DbError::UnknownOperation(name.to_owned()))?;

        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DbError::UnknownOperation(name.to_owned()));
        }

        Ok(Self {
            verb,
            field: field.to_owned(),
            args,
        })
    }

    /// Operator and value of a where-style call.
    ///
    /// One argument means equality; two arguments are `(op, value)`.
    pub fn condition(&self) -> Result<(&str, SqlValue)> {
        match self.args.as_slice() {
            [value] => Ok(("=", value.clone())),
            [op, value] => {
                let op = op
                    .as_str()
                    .ok_or_else(|| DbError::invalid("where", "operator must be text"))?;
                Ok((op, value.clone()))
            }
            args => Err(DbError::invalid(
                "where",
                format!("expected 1 or 2 arguments, got {}", args.len()),
            )),
        }
    }

    /// Step of an increment/decrement call, 1 when omitted.
    pub fn step(&self) -> Result<i64> {
        match self.args.first() {
            None => Ok(1),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| DbError::invalid("increment", "amount must be an integer")),
        }
    }

    /// Direction of an orderBy call, `ASC` when omitted.
    pub fn direction(&self) -> Result<&str> {
        match self.args.first() {
            None => Ok("ASC"),
            Some(value) => value
                .as_str()
                .ok_or_else(|| DbError::invalid("order_by", "direction must be text")),
        }
    }
}
