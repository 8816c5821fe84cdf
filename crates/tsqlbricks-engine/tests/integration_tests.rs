//! Integration tests for batch conversion

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tsqlbricks_core::{Config, DiagnosticRecord, FileStatus};
use tsqlbricks_engine::{convert_directory, BatchOptions, Converter};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn batch_with_one_lookup_failure() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("models");
    let output = dir.path().join("output");

    write(
        &input.join("staging/stg_customers.sql"),
        "{{ config(materialized='view', schema='stg') }}\nSELECT [id] = c.CustomerId, name = c.Name FROM dbo.Customers c WITH (NOLOCK)",
    );
    write(
        &input.join("staging/stg_orders.sql"),
        "SELECT order_key = HASHBYTES('SHA2_256', CAST(o.Id AS NVARCHAR(20))) FROM dbo.Orders o",
    );
    write(
        &input.join("marts/finance/fct_revenue.sql"),
        "SELECT total = ISNULL(SUM(o.Amount), 0), loaded_at = GETDATE() FROM {{ ref('stg_orders') }} o",
    );
    write(
        &input.join("marts/broken.sql"),
        "SELECT k = HASHBYTES('SHA3', x) FROM t",
    );
    fs::create_dir_all(input.join("empty_dir")).unwrap();

    let converter = Arc::new(Converter::new("tsqlbricks convert-dir models output"));
    let options = BatchOptions::from_config(&Config::default()).with_jobs(2);

    let report = convert_directory(converter, &input, &output, &options).await.unwrap();

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.converted, 3);
    assert_eq!(report.summary.failed, 1);

    for dir_name in ["staging", "marts", "marts/finance", "empty_dir"] {
        assert!(output.join(dir_name).is_dir(), "{} not mirrored", dir_name);
    }

    let diagnostics: Vec<_> = report
        .files
        .iter()
        .filter(|f| DiagnosticRecord::is_diagnostic(&fs::read_to_string(&f.output).unwrap()))
        .collect();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].output.ends_with("marts/broken.sql"));
    assert!(matches!(diagnostics[0].status, FileStatus::Failed { .. }));

    let customers = fs::read_to_string(output.join("staging/stg_customers.sql")).unwrap();
    assert!(customers.contains("-- Command: tsqlbricks convert-dir models output\n"));
    assert!(customers.contains("{{\n    config(\n        materialized='view'\n    )\n}}\n\nSELECT c.CustomerId AS `id`, c.Name AS name FROM dbo.Customers c"));
    assert!(!customers.contains("schema="));

    let orders = fs::read_to_string(output.join("staging/stg_orders.sql")).unwrap();
    assert!(orders.contains("SELECT sha2(CAST(o.Id AS STRING), 256) AS order_key FROM dbo.Orders o"));

    let revenue = fs::read_to_string(output.join("marts/finance/fct_revenue.sql")).unwrap();
    assert!(revenue.contains(
        "SELECT COALESCE(SUM(o.Amount), 0) AS total, current_timestamp() AS loaded_at FROM {{ ref('stg_orders') }} o"
    ));
}

#[tokio::test]
async fn report_round_trips_through_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    write(&input.join("a.sql"), "SELECT 1");
    let output = dir.path().join("out");

    let options = BatchOptions::from_config(&Config::default());
    let report = convert_directory(Arc::new(Converter::new("t")), &input, &output, &options)
        .await
        .unwrap();

    let report_path = dir.path().join("report.json");
    report.save_to_file(&report_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();

    assert_eq!(json["summary"]["converted"], 1);
    assert_eq!(json["files"][0]["status"], "converted");
}
