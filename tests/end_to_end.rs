//! End-to-end ingestion against a real SQLite database and a local object store.

use sqlx::AnyConnection;
use sqlx::{Connection, Row};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use catalog_ingest::{
    config::{Config, DatabaseConfig, DatabaseDriver, IngestionConfig, StorageConfig},
    database::SqlConnectionFactory,
    errors::IngestError,
    models::{ObjectLocation, RejectionCause, RunStatus},
    sources::ObjectStoreSource,
    trigger::{handle_event, process_object, StorageEvent},
};

const BUCKET: &str = "catalog-drops";

const SCENARIO: &str = "name,gender,description,photo,cat,subcat,price
Shirt,M,Basic tee,img1.jpg,1,10,19.99
BadRow,M,Missing,fields
Pants,F,Slim fit,img2.jpg,2,20,39.99
";

struct Fixture {
    dir: TempDir,
    db_path: PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        std::fs::create_dir_all(dir.path().join("store").join(BUCKET)).unwrap();

        let mut conn = open(&db_path, true).await;
        sqlx::query(
            "CREATE TABLE product (
                product_id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL UNIQUE,
                gender TEXT,
                description TEXT,
                photo TEXT,
                cat_id INTEGER,
                subcat_id INTEGER,
                price REAL
            )",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();

        Self { dir, db_path }
    }

    fn config(&self) -> Config {
        Config {
            database: DatabaseConfig {
                driver: DatabaseDriver::Sqlite,
                url: format!("sqlite://{}", self.db_path.display()),
                username: None,
                password: None,
                table: "product".to_string(),
            },
            ingestion: IngestionConfig {
                delimiter: ',',
                expected_columns: 7,
                progress_interval: 1000,
            },
            storage: StorageConfig::Local {
                root: self.dir.path().join("store"),
            },
        }
    }

    fn put(&self, key: &str, contents: &str) {
        let path = self.dir.path().join("store").join(BUCKET).join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    async fn product_names(&self) -> Vec<String> {
        let mut conn = open(&self.db_path, false).await;
        let rows = sqlx::query("SELECT product_name FROM product ORDER BY product_id")
            .fetch_all(&mut conn)
            .await
            .unwrap();
        rows.iter().map(|row| row.get::<String, _>("product_name")).collect()
    }
}

async fn open(path: &Path, create: bool) -> AnyConnection {
    sqlx::any::install_default_drivers();
    let mode = if create { "?mode=rwc" } else { "" };
    AnyConnection::connect(&format!("sqlite://{}{}", path.display(), mode))
        .await
        .unwrap()
}

async fn ingest(fixture: &Fixture, key: &str) -> catalog_ingest::RunOutcome {
    let config = fixture.config();
    let source = ObjectStoreSource::from_config(config.storage.clone());
    process_object(
        &ObjectLocation::new(BUCKET, key),
        &config,
        &source,
        &SqlConnectionFactory,
    )
    .await
}

#[tokio::test]
async fn test_scenario_file_loads_two_rows() {
    let fixture = Fixture::new().await;
    fixture.put("products.csv", SCENARIO);

    let outcome = ingest(&fixture, "products.csv").await;

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.loaded, 2);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(fixture.product_names().await, vec!["Shirt", "Pants"]);
}

#[tokio::test]
async fn test_values_land_in_documented_column_order() {
    let fixture = Fixture::new().await;
    fixture.put("products.csv", SCENARIO);
    ingest(&fixture, "products.csv").await;

    let mut conn = open(&fixture.db_path, false).await;
    let row = sqlx::query(
        "SELECT product_name, gender, description, photo, cat_id, subcat_id, price
         FROM product WHERE product_name = ?",
    )
    .bind("Pants")
    .fetch_one(&mut conn)
    .await
    .unwrap();

    assert_eq!(row.get::<String, _>("gender"), "F");
    assert_eq!(row.get::<String, _>("description"), "Slim fit");
    assert_eq!(row.get::<String, _>("photo"), "img2.jpg");
    assert_eq!(row.get::<i64, _>("cat_id"), 2);
    assert_eq!(row.get::<i64, _>("subcat_id"), 20);
    assert!((row.get::<f64, _>("price") - 39.99).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_constraint_violation_rejects_only_that_row() {
    let fixture = Fixture::new().await;
    fixture.put(
        "dupes.csv",
        "header\nShirt,M,Basic tee,img1.jpg,1,10,19.99\nShirt,M,Again,img9.jpg,1,10,9.99\nHat,U,Wool,img3.jpg,3,30,15.00\n",
    );

    let outcome = ingest(&fixture, "dupes.csv").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.loaded, 2);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.rejections[0].line_index, 2);
    assert!(matches!(outcome.rejections[0].cause, RejectionCause::Load(_)));
    assert_eq!(fixture.product_names().await, vec!["Shirt", "Hat"]);
}

/// Common SQL injection payloads placed in field values
const SQL_INJECTION_PAYLOADS: &[&str] = &[
    "'); DROP TABLE product; --",
    "' OR '1'='1",
    "x'); INSERT INTO product (product_name) VALUES ('injected'); --",
    "'; DELETE FROM product; --",
];

#[tokio::test]
async fn test_field_values_cannot_alter_the_statement() {
    let fixture = Fixture::new().await;
    let mut contents = String::from("header\n");
    for (i, payload) in SQL_INJECTION_PAYLOADS.iter().enumerate() {
        contents.push_str(&format!("{payload},M,{payload},img.jpg,1,{i},1.00\n"));
    }
    fixture.put("hostile.csv", &contents);

    let outcome = ingest(&fixture, "hostile.csv").await;

    assert!(outcome.is_success());
    assert_eq!(outcome.loaded, SQL_INJECTION_PAYLOADS.len());
    let names = fixture.product_names().await;
    assert_eq!(names, SQL_INJECTION_PAYLOADS.to_vec());
    assert!(!names.iter().any(|n| n == "injected"));
}

#[tokio::test]
async fn test_unreachable_database_fails_without_inserts() {
    let fixture = Fixture::new().await;
    fixture.put("products.csv", SCENARIO);

    let mut config = fixture.config();
    config.database.url = format!(
        "sqlite://{}",
        fixture.dir.path().join("missing/catalog.db").display()
    );
    let source = ObjectStoreSource::from_config(config.storage.clone());
    let outcome = process_object(
        &ObjectLocation::new(BUCKET, "products.csv"),
        &config,
        &source,
        &SqlConnectionFactory,
    )
    .await;

    assert_eq!(outcome.status, RunStatus::Failure);
    assert!(matches!(outcome.failure, Some(IngestError::Connection(_))));
    assert_eq!(outcome.attempted, 0);
    assert!(fixture.product_names().await.is_empty());
}

#[tokio::test]
async fn test_missing_object_is_a_stream_failure() {
    let fixture = Fixture::new().await;

    let outcome = ingest(&fixture, "never-uploaded.csv").await;

    assert_eq!(outcome.status, RunStatus::Failure);
    assert!(matches!(outcome.failure, Some(IngestError::Stream(_))));
    assert!(fixture.product_names().await.is_empty());
}

#[tokio::test]
async fn test_event_with_encoded_key_is_processed() {
    let fixture = Fixture::new().await;
    fixture.put("drops/2024/products.csv", SCENARIO);

    let event = StorageEvent::from_json(&format!(
        r#"{{"Records":[{{"s3":{{"bucket":{{"name":"{BUCKET}"}},"object":{{"key":"drops%2F2024%2Fproducts.csv"}}}}}}]}}"#
    ))
    .unwrap();

    let config = fixture.config();
    let source = ObjectStoreSource::from_config(config.storage.clone());
    let outcome = handle_event(&event, &config, &source, &SqlConnectionFactory).await;

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.loaded, 2);
}

#[tokio::test]
async fn test_event_without_records_fails() {
    let fixture = Fixture::new().await;
    let event = StorageEvent::from_json(r#"{"Records":[]}"#).unwrap();

    let config = fixture.config();
    let source = ObjectStoreSource::from_config(config.storage.clone());
    let outcome = handle_event(&event, &config, &source, &SqlConnectionFactory).await;

    assert_eq!(outcome.status, RunStatus::Failure);
    assert!(matches!(outcome.failure, Some(IngestError::Trigger(_))));
}
