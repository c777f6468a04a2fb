//! Example server: mounts the generated API over the database named by `DATABASE_URL`.
//!
//! Run from repo root: `cargo run -p example-server`
//! Other commands: `generate`, `routes [table]`, `tables`, `table-info <table>`, `clear-cache`.

use apigen_sdk::schema::{required_fields, timestamp_fields, TablePolicy};
use apigen_sdk::{
    app_router, catalog_for, spawn_refresh_task, AppState, ArtifactStore, DbPool, Generator, GeneratorConfig,
    SchemaReader, SnapshotHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("apigen_sdk=info,example_server=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("serve");

    let config = Arc::new(GeneratorConfig::from_env()?);
    let store = ArtifactStore::from_config(&config.cache);

    if command == "clear-cache" {
        store.clear().await?;
        println!("Route cache and API documentation cleared.");
        return Ok(());
    }

    let pool = DbPool::connect(&config.database).await?;
    let reader = SchemaReader::new(catalog_for(&pool, &config.database.schema));

    match command {
        "table-info" => {
            let Some(table) = args.get(1) else {
                return Err("usage: example-server table-info <table>".into());
            };
            if !reader.table_exists(table).await? {
                return Err(format!("table '{}' not found", table).into());
            }
            let descriptor = reader.describe_table(table).await?;
            let info = serde_json::json!({
                "required_fields": required_fields(&descriptor),
                "timestamp_fields": timestamp_fields(&descriptor),
                "indexes": reader.indexes(table).await,
                "stats": reader.table_stats(table).await,
                "table": descriptor,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(());
        }
        "tables" => {
            for table in reader.list_tables(&TablePolicy::from_config(&config)).await? {
                println!("{}", table);
            }
            return Ok(());
        }
        _ => {}
    }

    let generator = Arc::new(Generator::new(reader, Arc::clone(&config)));
    let snapshot = generator.generate().await?;
    store.publish(&snapshot).await?;

    match command {
        "generate" => {
            println!(
                "Generated {} routes for {} tables.",
                snapshot.routes.len(),
                snapshot.tables.len()
            );
            return Ok(());
        }
        "routes" => {
            let routes = match args.get(1) {
                Some(table) => snapshot.routes.filter_table(table),
                None => snapshot.routes.clone(),
            };
            for row in routes.describe() {
                println!("{:<7} {:<50} {:<24} {}", row.method, row.path, row.table, row.action);
            }
            return Ok(());
        }
        _ => {}
    }

    let handle = SnapshotHandle::new(snapshot);
    let refresh_every = Duration::from_secs(config.cache.max_age_secs.clamp(60, 3600));
    spawn_refresh_task(Arc::clone(&generator), handle.clone(), store, refresh_every);

    let state = AppState::new(pool, Arc::clone(&config), handle);
    let app = app_router(state);
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
