//! Development Site Inspector
//!
//! Boots a Ptah CMS site with a small default type set, seeds demo content on
//! first run and prints how request paths traverse the content tree.
//!
//! # Usage
//!
//! ```bash
//! # In-memory site, default paths
//! cargo run --bin ptah-dev
//!
//! # Persistent site from a settings file, custom paths
//! cargo run --bin ptah-dev -- --config ptahcms.toml / /docs/welcome/edit
//! ```
//!
//! # Configuration
//!
//! Settings come from the optional TOML file, then `PTAHCMS_*` environment
//! variables. With `database_path` unset the site lives in memory.
//! Log output is controlled through `RUST_LOG` (default `info`).

use anyhow::Context;
use clap::Parser;
use ptahcms_core::{
    config::CmsSettings,
    db::{MemoryStore, NodeStore},
    models::NodeKind,
    registry::{RegistryBuilder, TypeInformation},
    security::AuthContext,
    services::{ApplicationFactory, ContentService, ContentTraverser},
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_PATHS: &[&str] = &["/", "/docs/", "/docs/welcome/", "/docs/welcome/edit/extra"];

/// Boot a Ptah CMS site and print how request paths traverse it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request paths to traverse (defaults to a few demo paths)
    paths: Vec<String>,
}

impl Args {
    fn paths(&self) -> Vec<String> {
        if self.paths.is_empty() {
            DEFAULT_PATHS.iter().map(|p| p.to_string()).collect()
        } else {
            self.paths.clone()
        }
    }
}

async fn open_store(settings: &CmsSettings) -> anyhow::Result<Arc<dyn NodeStore>> {
    match &settings.database_path {
        Some(path) => {
            let store = ptahcms_core::db::SqliteStore::open(path)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            tracing::info!("Using libsql database at {}", path.display());
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn seed(service: &ContentService, root_uri: &str) -> anyhow::Result<()> {
    let auth = AuthContext::superuser();
    let fields = |value: serde_json::Value| value.as_object().cloned().unwrap_or_default();

    let docs = service
        .create(
            &auth,
            root_uri,
            "folder",
            Some("docs"),
            fields(json!({"title": "Documentation"})),
        )
        .await?;
    for (title, description) in [
        ("Welcome", "Start here"),
        ("Content types", "How types are registered"),
    ] {
        service
            .create(
                &auth,
                &docs.uri,
                "page",
                None,
                fields(json!({"title": title, "description": description})),
            )
            .await?;
    }
    tracing::info!("Seeded demo content below {}", docs.uri);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = CmsSettings::load(args.config.as_deref())?;
    println!("🔧 Starting {}...", settings.brand_name);

    let registry = RegistryBuilder::new()
        .register_type(
            TypeInformation::new(
                "site",
                NodeKind::ApplicationRoot {
                    root_path: "/".to_string(),
                },
            )
            .title("Site"),
        )
        .register_type(
            TypeInformation::new("folder", NodeKind::Container)
                .title("Folder")
                .description("A folder which can contain other items."),
        )
        .register_type(
            TypeInformation::new("page", NodeKind::Content)
                .title("Page")
                .description("A page in the site."),
        )
        .register_application(ApplicationFactory::new("/", "root", "Ptah Site", "site"))
        .build()?;

    let store = open_store(&settings).await?;
    let service = ContentService::new(store, Arc::new(registry)).with_settings(settings);

    let root = service
        .registry()
        .app_factory("root")
        .context("root application is not registered")?
        .root(&service)
        .await?;

    if service.container(root.clone())?.keys().await?.is_empty() {
        seed(&service, &root.uri).await?;
    }

    let traverser = ContentTraverser::new(&service, root);
    for path in &args.paths() {
        match traverser.traverse(path).await {
            Ok(result) => {
                println!(
                    "{:<32} → {} ({}) view='{}' subpath={:?}",
                    path,
                    result.context.title(),
                    result.context.uri,
                    result.view_name,
                    result.subpath
                );
            }
            Err(err) => println!("{:<32} → {}", path, err),
        }
    }

    Ok(())
}
