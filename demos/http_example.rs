//! Example: Running YCSB-style operations against YDB over HTTP
//!
//! This example creates the benchmark table, writes a few rows, and reads
//! them back through the same binding the harness uses.
//!
//! ## Prerequisites
//!
//! 1. Start a YDB node with the viewer HTTP port exposed, e.g. the
//!    `ydbplatform/local-ydb` image on port 8765
//! 2. Optionally set the environment variables:
//!    - `YDB_DSN`: connection string (default `http://localhost:8765/local`)
//!    - `YDB_TOKEN`: bearer token, if the node requires one
//!
//! ## Running
//!
//! ```bash
//! cargo run --example http_example --features http
//! ```

use std::collections::HashMap;
use std::env;

use ycsb_ydb::{creator_for, BatchDb, Db, Properties, YDB_DRIVER_NAME};

#[tokio::main]
async fn main() {
    let mut props = Properties::new();
    if let Ok(dsn) = env::var("YDB_DSN") {
        props.insert("ydb.dsn".to_string(), dsn);
    }
    if let Ok(token) = env::var("YDB_TOKEN") {
        props.insert("ydb.token".to_string(), token);
    }
    props.insert("table".to_string(), "usertable".to_string());
    props.insert("fieldcount".to_string(), "3".to_string());
    props.insert("dropdata".to_string(), "true".to_string());
    props.insert("verbose".to_string(), "true".to_string());

    let creator = creator_for(YDB_DRIVER_NAME).expect("ydb creator is registered");
    let db = match creator.create(&props).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error opening binding: {}", e);
            return;
        }
    };

    println!("Connected and created usertable");

    let row = |v: &str| -> HashMap<String, Vec<u8>> {
        (0..3)
            .map(|i| (format!("field{}", i), format!("{}-{}", v, i).into_bytes()))
            .collect()
    };

    match db.insert("usertable", "user0", row("a")).await {
        Ok(()) => println!("Inserted user0"),
        Err(e) => eprintln!("Error inserting user0: {}", e),
    }

    let keys: Vec<String> = (1..4).map(|i| format!("user{}", i)).collect();
    let values = keys.iter().map(|k| row(k)).collect();
    match db.batch_insert("usertable", &keys, values).await {
        Ok(()) => println!("Batch inserted {} rows", keys.len()),
        Err(e) => eprintln!("Error batch inserting: {}", e),
    }

    match db.read("usertable", "user0", &["field1".to_string()]).await {
        Ok(Some(record)) => println!(
            "user0.FIELD1 = {}",
            String::from_utf8_lossy(record.get("FIELD1").map(Vec::as_slice).unwrap_or_default())
        ),
        Ok(None) => println!("user0 not found"),
        Err(e) => eprintln!("Error reading user0: {}", e),
    }

    match db.scan("usertable", "user0", 10, &[]).await {
        Ok(records) => println!("Scan after user0 returned {} rows", records.len()),
        Err(e) => eprintln!("Error scanning: {}", e),
    }

    match db.batch_delete("usertable", &keys).await {
        Ok(()) => println!("Deleted batch"),
        Err(e) => eprintln!("Error deleting batch: {}", e),
    }

    if let Err(e) = db.close().await {
        eprintln!("Error closing binding: {}", e);
    }

    println!("Example complete!");
}
