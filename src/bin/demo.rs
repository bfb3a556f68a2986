//! colmap Demo Binary
//!
//! Seeds an in-memory store with sample events and runs an index query and
//! a direct query against it.

use std::sync::Arc;

use clap::Parser;
use colmap::store::MemStore;
use colmap::{eq, Config, Entity, EntityService, FieldValue, IndexSpec, MetadataBuilder, TablePool};
use tracing_subscriber::{fmt, EnvFilter};

/// colmap demo
#[derive(Parser, Debug)]
#[command(name = "colmap-demo")]
#[command(about = "Save and query sample events in an in-memory store")]
#[command(version)]
struct Args {
    /// Number of events to seed
    #[arg(short, long, default_value = "20")]
    count: usize,

    /// Number of distinct event kinds
    #[arg(short, long, default_value = "4")]
    kinds: i32,

    /// Kind to query for
    #[arg(short, long, default_value = "1")]
    query_kind: i32,

    /// Page size for queries
    #[arg(short, long, default_value = "10")]
    page_size: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Event {
    id: String,
    kind: Option<i32>,
    created: Option<i64>,
    title: Option<String>,
    tags: Vec<String>,
}

impl Entity for Event {
    fn describe() -> MetadataBuilder {
        MetadataBuilder::new("Event", "events")
            .row_key("id", "string")
            .scalar("kind", "info:kind", "int")
            .scalar("created", "info:created", "long")
            .scalar("title", "info:title", "string")
            .list("tags", "tags", "tag", "string")
            .index(
                "kind",
                IndexSpec::new()
                    .date_column("info:created")
                    .inverted()
                    .extra("info:title"),
            )
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::of(self.id.as_str()),
            "kind" => FieldValue::maybe(self.kind),
            "created" => FieldValue::maybe(self.created),
            "title" => FieldValue::maybe(self.title.clone()),
            "tags" => FieldValue::list_of(self.tags.iter().cloned()),
            _ => FieldValue::Null,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> colmap::Result<()> {
        match name {
            "id" => self.id = value.into_scalar(name)?.unwrap_or_default(),
            "kind" => self.kind = value.into_scalar(name)?,
            "created" => self.created = value.into_scalar(name)?,
            "title" => self.title = value.into_scalar(name)?,
            "tags" => self.tags = value.into_list(name)?,
            _ => {}
        }
        Ok(())
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,colmap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("colmap demo v{}", colmap::VERSION);

    if let Err(e) = run(&args) {
        tracing::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> colmap::Result<()> {
    let config = Config::builder().default_page_size(args.page_size).build();
    let store = Arc::new(MemStore::with_config(&config));
    let pool = TablePool::new(store.clone(), &config)?;
    let events: EntityService<Event> = EntityService::new(pool, &config)?;

    let kinds = args.kinds.max(1);
    let seeded: Vec<Event> = (0..args.count)
        .map(|i| Event {
            id: format!("event-{:04}", i),
            kind: Some(i as i32 % kinds),
            created: Some(1_700_000_000_000 + i as i64 * 1_000),
            title: Some(format!("Event number {}", i)),
            tags: vec!["demo".to_string(), format!("batch-{}", i / 5)],
        })
        .collect();
    events.save_all(&seeded)?;
    tracing::info!("Seeded {} events into {:?}", seeded.len(), store.table_names());

    // Index-assisted: newest first
    let by_kind = events
        .query()
        .filter(eq("kind", args.query_kind))
        .execute()?;
    println!("kind = {} (index scan, newest first):", args.query_kind);
    for event in &by_kind {
        println!(
            "  {}  created={}  title={}",
            event.id,
            event.created.unwrap_or_default(),
            event.title.as_deref().unwrap_or("-")
        );
    }

    // Same criteria without the index
    let direct = events
        .query()
        .filter(eq("kind", args.query_kind))
        .use_indexes(false)
        .execute()?;
    println!("kind = {} (direct scan, row key order):", args.query_kind);
    for event in &direct {
        println!("  {}  tags={:?}", event.id, event.tags);
    }

    Ok(())
}
