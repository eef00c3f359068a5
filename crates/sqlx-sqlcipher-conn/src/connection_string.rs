//! Parsing of `key=value;key=value` connection strings.
//!
//! The helper is configured with a single string in the style ADO.NET
//! providers use for SQLite, e.g.
//!
//! ```text
//! Data Source=/var/lib/app/store.db;Password=hunter2;Foreign Keys=True
//! ```
//!
//! Keys are matched case-insensitively with whitespace removed, so
//! `Data Source`, `datasource` and `DATA SOURCE` are the same option. Values
//! may be wrapped in single or double quotes, which is the only way to put a
//! `;` inside a value. A string without any `=` is taken as a bare path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use zeroize::Zeroizing;

use crate::{Error, Result};

/// How the database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
   /// Open for reading and writing, creating the file if needed
   #[default]
   ReadWriteCreate,
   /// Open for reading and writing; the file must already exist
   ReadWrite,
   /// Open read-only; the file must already exist
   ReadOnly,
}

impl FromStr for OpenMode {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      match normalize_key(s).as_str() {
         "readwritecreate" => Ok(OpenMode::ReadWriteCreate),
         "readwrite" => Ok(OpenMode::ReadWrite),
         "readonly" => Ok(OpenMode::ReadOnly),
         _ => Err(Error::InvalidConnectionString(format!(
            "unknown mode '{s}' (expected ReadWriteCreate, ReadWrite or ReadOnly)"
         ))),
      }
   }
}

/// A parsed connection string.
///
/// The encryption key is held in a zeroizing buffer and is never printed by
/// the `Debug` or `Display` implementations.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
   data_source: PathBuf,
   key: Option<Zeroizing<String>>,
   mode: OpenMode,
   foreign_keys: Option<bool>,
   busy_timeout: Option<Duration>,
}

impl ConnectionString {
   /// Build a connection string for a plain path with every option left at
   /// its default.
   pub fn from_path(path: impl Into<PathBuf>) -> Self {
      Self {
         data_source: path.into(),
         key: None,
         mode: OpenMode::default(),
         foreign_keys: None,
         busy_timeout: None,
      }
   }

   /// Parse a connection string.
   pub fn parse(input: &str) -> Result<Self> {
      let trimmed = input.trim();
      if trimmed.is_empty() {
         return Err(Error::InvalidConnectionString(
            "connection string is empty".into(),
         ));
      }

      if !trimmed.contains('=') {
         return Ok(Self::from_path(strip_file_prefix(trimmed)));
      }

      let mut data_source = None;
      let mut key = None;
      let mut mode = OpenMode::default();
      let mut foreign_keys = None;
      let mut busy_timeout = None;

      for segment in split_segments(trimmed)? {
         let (name, value) = segment.split_once('=').ok_or_else(|| {
            Error::InvalidConnectionString(format!("'{}' is not a key=value pair", segment.trim()))
         })?;
         let value = unquote(value.trim());

         match normalize_key(name).as_str() {
            "datasource" | "filename" => data_source = Some(PathBuf::from(value)),
            "uri" => data_source = Some(PathBuf::from(strip_file_prefix(value))),
            "password" | "pwd" | "key" => {
               key = (!value.is_empty()).then(|| Zeroizing::new(value.to_string()));
            }
            "readonly" => {
               if parse_bool(name, value)? {
                  mode = OpenMode::ReadOnly;
               }
            }
            "mode" => mode = value.parse()?,
            "foreignkeys" => foreign_keys = Some(parse_bool(name, value)?),
            "defaulttimeout" | "busytimeout" => {
               let secs: u64 = value.parse().map_err(|_| {
                  Error::InvalidConnectionString(format!(
                     "'{}' must be a whole number of seconds, got '{value}'",
                     name.trim()
                  ))
               })?;
               busy_timeout = Some(Duration::from_secs(secs));
            }
            "version" => {
               if value != "3" {
                  return Err(Error::InvalidConnectionString(format!(
                     "unsupported SQLite version '{value}'"
                  )));
               }
            }
            _ => warn!(option = name.trim(), "ignoring unknown connection string option"),
         }
      }

      let data_source = data_source.filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
         Error::InvalidConnectionString("missing 'Data Source' (or 'URI') option".into())
      })?;

      Ok(Self {
         data_source,
         key,
         mode,
         foreign_keys,
         busy_timeout,
      })
   }

   /// Attach an encryption key, replacing any key parsed from the string.
   pub fn with_key(mut self, key: impl Into<String>) -> Self {
      self.key = Some(Zeroizing::new(key.into()));
      self
   }

   /// Set the open mode.
   pub fn with_mode(mut self, mode: OpenMode) -> Self {
      self.mode = mode;
      self
   }

   /// Path of the database file
   pub fn data_source(&self) -> &Path {
      &self.data_source
   }

   /// Encryption key, if one was configured
   pub fn key(&self) -> Option<&str> {
      self.key.as_ref().map(|k| k.as_str())
   }

   /// Whether the database is opened with an encryption key
   pub fn is_encrypted(&self) -> bool {
      self.key.is_some()
   }

   pub fn mode(&self) -> OpenMode {
      self.mode
   }

   pub fn foreign_keys(&self) -> Option<bool> {
      self.foreign_keys
   }

   pub fn busy_timeout(&self) -> Option<Duration> {
      self.busy_timeout
   }
}

impl FromStr for ConnectionString {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      Self::parse(s)
   }
}

impl fmt::Display for ConnectionString {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "Data Source={}", self.data_source.display())?;
      if self.key.is_some() {
         f.write_str(";Password=***")?;
      }
      match self.mode {
         OpenMode::ReadWriteCreate => {}
         OpenMode::ReadWrite => f.write_str(";Mode=ReadWrite")?,
         OpenMode::ReadOnly => f.write_str(";Mode=ReadOnly")?,
      }
      if let Some(fk) = self.foreign_keys {
         write!(f, ";Foreign Keys={fk}")?;
      }
      if let Some(timeout) = self.busy_timeout {
         write!(f, ";Default Timeout={}", timeout.as_secs())?;
      }
      Ok(())
   }
}

impl fmt::Debug for ConnectionString {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ConnectionString")
         .field("data_source", &self.data_source)
         .field("encrypted", &self.key.is_some())
         .field("mode", &self.mode)
         .field("foreign_keys", &self.foreign_keys)
         .field("busy_timeout", &self.busy_timeout)
         .finish()
   }
}

/// Lowercase and drop whitespace so `Data Source` matches `datasource`.
fn normalize_key(key: &str) -> String {
   key.chars()
      .filter(|c| !c.is_whitespace())
      .map(|c| c.to_ascii_lowercase())
      .collect()
}

fn strip_file_prefix(path: &str) -> &str {
   path.strip_prefix("file://")
      .or_else(|| path.strip_prefix("file:"))
      .unwrap_or(path)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
   match value.to_ascii_lowercase().as_str() {
      "true" | "yes" | "on" | "1" => Ok(true),
      "false" | "no" | "off" | "0" => Ok(false),
      _ => Err(Error::InvalidConnectionString(format!(
         "'{}' expects a boolean, got '{value}'",
         name.trim()
      ))),
   }
}

/// Remove one layer of matching quotes.
fn unquote(value: &str) -> &str {
   let bytes = value.as_bytes();
   if bytes.len() >= 2 {
      let first = bytes[0];
      if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
         return &value[1..value.len() - 1];
      }
   }
   value
}

/// Split on `;` outside of quoted values, skipping empty segments.
///
/// A quote only opens a quoted value when it is the first character after
/// `=`, so apostrophes inside plain paths are left alone.
fn split_segments(input: &str) -> Result<Vec<&str>> {
   let mut segments = Vec::new();
   let mut quote: Option<char> = None;
   let mut prev: Option<char> = None;
   let mut start = 0;

   for (i, ch) in input.char_indices() {
      match (quote, ch) {
         (None, '"' | '\'') if prev == Some('=') => quote = Some(ch),
         (Some(q), c) if c == q => quote = None,
         (None, ';') => {
            segments.push(&input[start..i]);
            start = i + 1;
         }
         _ => {}
      }
      if !ch.is_whitespace() {
         prev = Some(ch);
      }
   }

   if quote.is_some() {
      return Err(Error::InvalidConnectionString(
         "unterminated quoted value".into(),
      ));
   }
   segments.push(&input[start..]);

   Ok(segments.into_iter().filter(|s| !s.trim().is_empty()).collect())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_bare_path() {
      let cs = ConnectionString::parse("/tmp/app.db").unwrap();
      assert_eq!(cs.data_source(), Path::new("/tmp/app.db"));
      assert!(!cs.is_encrypted());
      assert_eq!(cs.mode(), OpenMode::ReadWriteCreate);
   }

   #[test]
   fn test_bare_file_uri() {
      let cs = ConnectionString::parse("file:/tmp/app.db").unwrap();
      assert_eq!(cs.data_source(), Path::new("/tmp/app.db"));
   }

   #[test]
   fn test_full_string() {
      let cs = ConnectionString::parse(
         "Data Source=/tmp/app.db; Password=secret ;Version=3;Foreign Keys=False;Default Timeout=2;",
      )
      .unwrap();
      assert_eq!(cs.data_source(), Path::new("/tmp/app.db"));
      assert_eq!(cs.key(), Some("secret"));
      assert_eq!(cs.foreign_keys(), Some(false));
      assert_eq!(cs.busy_timeout(), Some(Duration::from_secs(2)));
   }

   #[test]
   fn test_keys_are_case_and_space_insensitive() {
      let cs = ConnectionString::parse("DATASOURCE=a.db;pwd=k;read only=true").unwrap();
      assert_eq!(cs.data_source(), Path::new("a.db"));
      assert_eq!(cs.key(), Some("k"));
      assert_eq!(cs.mode(), OpenMode::ReadOnly);
   }

   #[test]
   fn test_uri_key_strips_file_prefix() {
      let cs = ConnectionString::parse("URI=file:data/app.db").unwrap();
      assert_eq!(cs.data_source(), Path::new("data/app.db"));
   }

   #[test]
   fn test_quoted_value_may_contain_separator() {
      let cs = ConnectionString::parse("Data Source=a.db;Password='pa;ss=word'").unwrap();
      assert_eq!(cs.key(), Some("pa;ss=word"));
   }

   #[test]
   fn test_mode_option() {
      let cs = ConnectionString::parse("Data Source=a.db;Mode=ReadWrite").unwrap();
      assert_eq!(cs.mode(), OpenMode::ReadWrite);

      let err = ConnectionString::parse("Data Source=a.db;Mode=Sideways").unwrap_err();
      assert!(err.to_string().contains("Sideways"));
   }

   #[test]
   fn test_empty_password_means_unencrypted() {
      let cs = ConnectionString::parse("Data Source=a.db;Password=").unwrap();
      assert!(!cs.is_encrypted());
   }

   #[test]
   fn test_unknown_option_is_ignored() {
      let cs = ConnectionString::parse("Data Source=a.db;Pooling=True").unwrap();
      assert_eq!(cs.data_source(), Path::new("a.db"));
   }

   #[test]
   fn test_errors() {
      assert!(ConnectionString::parse("   ").is_err());
      assert!(ConnectionString::parse("Password=x").is_err());
      assert!(ConnectionString::parse("Data Source=").is_err());
      assert!(ConnectionString::parse("Data Source=a.db;Version=2").is_err());
      assert!(ConnectionString::parse("Data Source=a.db;Foreign Keys=maybe").is_err());
      assert!(ConnectionString::parse("Data Source=a.db;Default Timeout=soon").is_err());
      assert!(ConnectionString::parse("Data Source=a.db;garbage").is_err());
      assert!(ConnectionString::parse("Data Source=a.db;Password='open").is_err());
   }

   #[test]
   fn test_display_and_debug_hide_key() {
      let cs = ConnectionString::parse("Data Source=a.db;Password=topsecret;Mode=ReadOnly").unwrap();
      let shown = cs.to_string();
      assert_eq!(shown, "Data Source=a.db;Password=***;Mode=ReadOnly");
      assert!(!format!("{cs:?}").contains("topsecret"));
   }

   #[test]
   fn test_apostrophe_in_plain_path() {
      let cs = ConnectionString::parse("Data Source=/data/o'brien.db").unwrap();
      assert_eq!(cs.data_source(), Path::new("/data/o'brien.db"));
   }
}
