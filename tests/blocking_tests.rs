use serde_json::json;
use sqlcipher_helper::{ConnectionConfig, Error, SqlCipherHelper, Statement};
use tempfile::TempDir;

fn create_helper() -> (SqlCipherHelper, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db_path = temp_dir.path().join("helper.db");
   let helper = SqlCipherHelper::new(&format!(
      "Data Source={};Password=blocking-key",
      db_path.display()
   ))
   .expect("Failed to configure helper");

   helper
      .create_table("people", &["id", "name"], &["INTEGER PRIMARY KEY", "TEXT NOT NULL"])
      .unwrap();

   (helper, temp_dir)
}

#[test]
fn test_insert_then_select_by_id() {
   let (helper, _temp) = create_helper();

   helper.insert("people", vec![json!(1), json!("Ada")]).unwrap();

   let rows = helper.select_by_id("people", 1).unwrap().collect_rows().unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["name"], json!("Ada"));
}

#[test]
fn test_cursor_iterates_rows() {
   let (helper, _temp) = create_helper();
   for (id, name) in [(1, "Ada"), (2, "Grace"), (3, "Edsger")] {
      helper.insert("people", vec![json!(id), json!(name)]).unwrap();
   }

   let names: Vec<String> = helper
      .execute_read("SELECT name FROM people ORDER BY id")
      .unwrap()
      .map(|row| row.unwrap()["name"].as_str().unwrap().to_string())
      .collect();

   assert_eq!(names, ["Ada", "Grace", "Edsger"]);
}

#[test]
fn test_select_where_and_update() {
   let (helper, _temp) = create_helper();
   helper.insert("people", vec![json!(1), json!("Ada")]).unwrap();
   helper.insert("people", vec![json!(2), json!("Grace")]).unwrap();

   let changed = helper
      .update("people", &["name"], vec![json!("Grace Hopper")], "id", json!(2))
      .unwrap();
   assert_eq!(changed.rows_affected, 1);

   let rows = helper
      .select_where("people", &["name"], &["name"], &["LIKE"], vec![json!("Grace%")])
      .unwrap()
      .collect_rows()
      .unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["name"], json!("Grace Hopper"));
}

#[test]
fn test_delete_helpers() {
   let (helper, _temp) = create_helper();
   helper
      .insert_columns("people", &["name"], vec![json!("Ada")])
      .unwrap();
   helper
      .insert_columns("people", &["name"], vec![json!("Grace")])
      .unwrap();

   let deleted = helper
      .delete_where("people", &["name"], vec![json!("Ada")])
      .unwrap();
   assert_eq!(deleted.rows_affected, 1);

   helper.delete_all("people").unwrap();
   assert!(helper.fetch_all("SELECT * FROM people").unwrap().is_empty());
}

#[test]
fn test_transaction_is_atomic() {
   let (helper, _temp) = create_helper();

   let err = helper
      .run_transaction(vec![
         Statement::new("INSERT INTO people (id, name) VALUES (?1, ?2)")
            .bind(1)
            .bind("Ada"),
         // NOT NULL violation
         Statement::new("INSERT INTO people (id, name) VALUES (?1, ?2)")
            .bind(2)
            .bind(serde_json::Value::Null),
      ])
      .unwrap_err();
   assert!(matches!(err, Error::StatementFailed { index: 1, .. }));
   assert!(helper.fetch_all("SELECT * FROM people").unwrap().is_empty());

   let results = helper
      .run_transaction(vec![
         Statement::new("INSERT INTO people (id, name) VALUES (?1, ?2)")
            .bind(1)
            .bind("Ada"),
         Statement::new("INSERT INTO people (id, name) VALUES (?1, ?2)")
            .bind(2)
            .bind("Grace"),
      ])
      .unwrap();
   assert_eq!(results.len(), 2);
   assert_eq!(helper.fetch_all("SELECT * FROM people").unwrap().len(), 2);
}

#[test]
fn test_fetch_one() {
   let (helper, _temp) = create_helper();
   helper.insert("people", vec![json!(1), json!("Ada")]).unwrap();

   let row = helper
      .fetch_one(Statement::new("SELECT name FROM people WHERE id = ?1").bind(1))
      .unwrap()
      .unwrap();
   assert_eq!(row["name"], json!("Ada"));
}

#[test]
fn test_length_mismatch_is_reported() {
   let (helper, _temp) = create_helper();

   let err = helper
      .delete_where("people", &["id", "name"], vec![json!(1)])
      .unwrap_err();
   assert!(matches!(err, Error::LengthMismatch { .. }));
}

#[test]
fn test_malformed_sql_is_an_error() {
   let (helper, _temp) = create_helper();

   let err = helper.execute_write("INSERT INTO nowhere VALUES (").unwrap_err();
   assert!(err.error_code().starts_with("SQLITE_"));
}

#[test]
fn test_dispose_releases_open_cursors() {
   let (helper, _temp) = create_helper();
   for id in 1..=100 {
      helper
         .insert("people", vec![json!(id), json!(format!("person {id}"))])
         .unwrap();
   }

   let mut cursor = helper.read_full_table("people").unwrap();
   assert!(cursor.next().is_some());
   assert_eq!(helper.open_cursors(), 1);

   helper.dispose();
   assert_eq!(helper.open_cursors(), 0);
   helper.dispose();

   cursor.close().unwrap();
   assert_eq!(helper.fetch_all("SELECT * FROM people").unwrap().len(), 100);
}

#[test]
fn test_dropping_half_read_cursor_releases_connection() {
   let (helper, _temp) = create_helper();
   for id in 1..=100 {
      helper
         .insert("people", vec![json!(id), json!(format!("person {id}"))])
         .unwrap();
   }

   let mut cursor = helper.read_full_table("people").unwrap();
   assert!(cursor.next().is_some());
   assert_eq!(helper.open_cursors(), 1);

   // No further helper call drives the runtime after this
   drop(cursor);
   assert_eq!(helper.open_cursors(), 0);
}

#[test]
fn test_exhausted_iterator_cursor_releases_connection() {
   let (helper, _temp) = create_helper();
   helper.insert("people", vec![json!(1), json!("Ada")]).unwrap();

   let count = helper.read_full_table("people").unwrap().count();
   assert_eq!(count, 1);
   assert_eq!(helper.open_cursors(), 0);
}

#[test]
fn test_drop_releases_cursors_and_file_can_be_removed() {
   let (helper, temp) = create_helper();
   let path = helper.database().path().to_path_buf();

   {
      let mut cursor = helper.read_full_table("people").unwrap();
      assert!(cursor.next().is_none());
   }
   drop(helper);

   std::fs::remove_file(&path).unwrap();
   assert!(!path.exists());
   drop(temp);
}

#[test]
fn test_with_config() {
   let temp_dir = TempDir::new().unwrap();
   let db_path = temp_dir.path().join("config.db");
   let config = ConnectionConfig {
      wal: false,
      ..Default::default()
   };

   let helper =
      SqlCipherHelper::with_config(&format!("Data Source={}", db_path.display()), config).unwrap();
   let row = helper
      .fetch_one("PRAGMA journal_mode")
      .unwrap()
      .unwrap();
   assert_eq!(row["journal_mode"], json!("delete"));
}
