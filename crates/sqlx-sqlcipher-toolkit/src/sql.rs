//! Statement builders for the table helpers.
//!
//! Every function here is pure: it validates its arguments and returns a
//! [`Statement`] without touching the database. Identifiers are checked
//! against an allow-list and double-quoted; values are always bound as
//! numbered parameters (`?1`, `?2`, ...).
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use sqlx_sqlcipher_toolkit::sql;
//!
//! let stmt = sql::select_where("t", &["name"], &["id"], &["="], vec![json!("1")]).unwrap();
//! assert_eq!(stmt.query, r#"SELECT "name" FROM "t" WHERE "id" = ?1"#);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::statement::Statement;
use crate::{Error, Result};

/// Comparison operators accepted by [`select_where`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
   Eq,
   NotEq,
   Lt,
   LtEq,
   Gt,
   GtEq,
   Like,
   NotLike,
   Glob,
   Is,
   IsNot,
}

impl Comparison {
   /// SQL spelling of the operator
   pub fn as_sql(self) -> &'static str {
      match self {
         Comparison::Eq => "=",
         Comparison::NotEq => "<>",
         Comparison::Lt => "<",
         Comparison::LtEq => "<=",
         Comparison::Gt => ">",
         Comparison::GtEq => ">=",
         Comparison::Like => "LIKE",
         Comparison::NotLike => "NOT LIKE",
         Comparison::Glob => "GLOB",
         Comparison::Is => "IS",
         Comparison::IsNot => "IS NOT",
      }
   }
}

impl FromStr for Comparison {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
      match normalized.as_str() {
         "=" | "==" => Ok(Comparison::Eq),
         "!=" | "<>" => Ok(Comparison::NotEq),
         "<" => Ok(Comparison::Lt),
         "<=" => Ok(Comparison::LtEq),
         ">" => Ok(Comparison::Gt),
         ">=" => Ok(Comparison::GtEq),
         "LIKE" => Ok(Comparison::Like),
         "NOT LIKE" => Ok(Comparison::NotLike),
         "GLOB" => Ok(Comparison::Glob),
         "IS" => Ok(Comparison::Is),
         "IS NOT" => Ok(Comparison::IsNot),
         _ => Err(Error::InvalidOperator(s.to_string())),
      }
   }
}

impl fmt::Display for Comparison {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_sql())
   }
}

/// `SELECT * FROM table`
pub fn select_all(table: &str) -> Result<Statement> {
   Ok(Statement::new(format!("SELECT * FROM {}", quote_name(table)?)))
}

/// `SELECT * FROM table WHERE id = ?1`
pub fn select_by_id(table: &str, id: i64) -> Result<Statement> {
   Ok(Statement::new(format!("SELECT * FROM {} WHERE \"id\" = ?1", quote_name(table)?)).bind(id))
}

/// `SELECT items FROM table WHERE c1 op1 ?1 AND c2 op2 ?2 ...`
///
/// `items` may be `["*"]` to select every column.
pub fn select_where(
   table: &str,
   items: &[&str],
   cols: &[&str],
   ops: &[&str],
   values: Vec<JsonValue>,
) -> Result<Statement> {
   require_non_empty("items", items)?;
   require_non_empty("columns", cols)?;
   require_same_len("columns", cols.len(), "operations", ops.len())?;
   require_same_len("operations", ops.len(), "values", values.len())?;

   let select_list = if items == ["*"] {
      "*".to_string()
   } else {
      quote_list(items)?.join(", ")
   };

   let mut conditions = Vec::with_capacity(cols.len());
   for (i, (col, op)) in cols.iter().zip(ops).enumerate() {
      let op: Comparison = op.parse()?;
      conditions.push(format!("{} {} ?{}", quote_name(col)?, op, i + 1));
   }

   let query = format!(
      "SELECT {} FROM {} WHERE {}",
      select_list,
      quote_name(table)?,
      conditions.join(" AND ")
   );
   Ok(Statement::new(query).with_values(values))
}

/// `INSERT INTO table VALUES (?1, ?2, ...)`
pub fn insert(table: &str, values: Vec<JsonValue>) -> Result<Statement> {
   require_non_empty("values", &values)?;

   let query = format!(
      "INSERT INTO {} VALUES ({})",
      quote_name(table)?,
      placeholders(1, values.len())
   );
   Ok(Statement::new(query).with_values(values))
}

/// `INSERT INTO table (c1, c2, ...) VALUES (?1, ?2, ...)`
pub fn insert_columns(table: &str, cols: &[&str], values: Vec<JsonValue>) -> Result<Statement> {
   require_non_empty("columns", cols)?;
   require_same_len("columns", cols.len(), "values", values.len())?;

   let query = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      quote_name(table)?,
      quote_list(cols)?.join(", "),
      placeholders(1, values.len())
   );
   Ok(Statement::new(query).with_values(values))
}

/// `UPDATE table SET c1 = ?1, c2 = ?2 ... WHERE key = ?N`
pub fn update(
   table: &str,
   cols: &[&str],
   values: Vec<JsonValue>,
   key: &str,
   key_value: JsonValue,
) -> Result<Statement> {
   require_non_empty("columns", cols)?;
   require_same_len("columns", cols.len(), "values", values.len())?;

   let assignments = quote_list(cols)?
      .into_iter()
      .enumerate()
      .map(|(i, col)| format!("{} = ?{}", col, i + 1))
      .collect::<Vec<_>>()
      .join(", ");

   let query = format!(
      "UPDATE {} SET {} WHERE {} = ?{}",
      quote_name(table)?,
      assignments,
      quote_name(key)?,
      cols.len() + 1
   );
   Ok(Statement::new(query).with_values(values).bind(key_value))
}

/// `DELETE FROM table WHERE c1 = ?1 OR c2 = ?2 ...`
///
/// Conditions are OR-joined: a row matching any pair is deleted.
pub fn delete_where(table: &str, cols: &[&str], values: Vec<JsonValue>) -> Result<Statement> {
   require_non_empty("columns", cols)?;
   require_same_len("columns", cols.len(), "values", values.len())?;

   let conditions = quote_list(cols)?
      .into_iter()
      .enumerate()
      .map(|(i, col)| format!("{} = ?{}", col, i + 1))
      .collect::<Vec<_>>()
      .join(" OR ");

   let query = format!("DELETE FROM {} WHERE {}", quote_name(table)?, conditions);
   Ok(Statement::new(query).with_values(values))
}

/// `DELETE FROM table`
pub fn delete_all(table: &str) -> Result<Statement> {
   Ok(Statement::new(format!("DELETE FROM {}", quote_name(table)?)))
}

/// `CREATE TABLE table (c1 type1, c2 type2, ...)`
pub fn create_table(table: &str, cols: &[&str], types: &[&str]) -> Result<Statement> {
   require_non_empty("columns", cols)?;
   require_same_len("columns", cols.len(), "column types", types.len())?;

   let mut definitions = Vec::with_capacity(cols.len());
   for (col, ty) in cols.iter().zip(types) {
      validate_column_type(ty)?;
      definitions.push(format!("{} {}", quote_name(col)?, ty.trim()));
   }

   let query = format!("CREATE TABLE {} ({})", quote_name(table)?, definitions.join(", "));
   Ok(Statement::new(query))
}

/// Validate and quote a possibly schema-qualified name.
///
/// `main.users` becomes `"main"."users"`.
pub fn quote_name(name: &str) -> Result<String> {
   let parts = name.split('.').collect::<Vec<_>>();
   if parts.iter().any(|part| !identifier_pattern().is_match(part)) {
      return Err(Error::InvalidIdentifier {
         name: name.to_string(),
      });
   }

   Ok(parts.into_iter().map(quote_identifier).collect::<Vec<_>>().join("."))
}

/// Quote an identifier with double quotes.
///
/// Any embedded double quotes are doubled per SQL standard (`"` → `""`).
fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[&str]) -> Result<Vec<String>> {
   names.iter().map(|name| quote_name(name)).collect()
}

fn identifier_pattern() -> &'static Regex {
   static RE: OnceLock<Regex> = OnceLock::new();
   RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid regex"))
}

/// Column types are spliced into DDL, so only letters, digits, spaces,
/// underscores and balanced parentheses/commas are let through.
fn validate_column_type(declaration: &str) -> Result<()> {
   static RE: OnceLock<Regex> = OnceLock::new();
   let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_ (),]*$").expect("invalid regex"));

   let invalid = || Error::InvalidColumnType {
      declaration: declaration.to_string(),
   };

   let trimmed = declaration.trim();
   if !re.is_match(trimmed) {
      return Err(invalid());
   }

   let mut depth = 0usize;
   for ch in trimmed.chars() {
      match ch {
         '(' => depth += 1,
         ')' => depth = depth.checked_sub(1).ok_or_else(invalid)?,
         ',' if depth == 0 => return Err(invalid()),
         _ => {}
      }
   }
   if depth != 0 {
      return Err(invalid());
   }

   Ok(())
}

/// `?start, ?start+1, ...` for `count` parameters
fn placeholders(start: usize, count: usize) -> String {
   (start..start + count)
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ")
}

fn require_non_empty<T>(what: &'static str, list: &[T]) -> Result<()> {
   if list.is_empty() {
      return Err(Error::EmptyColumns(what));
   }
   Ok(())
}

fn require_same_len(
   left: &'static str,
   left_len: usize,
   right: &'static str,
   right_len: usize,
) -> Result<()> {
   if left_len != right_len {
      return Err(Error::LengthMismatch {
         left,
         left_len,
         right,
         right_len,
      });
   }
   Ok(())
}
