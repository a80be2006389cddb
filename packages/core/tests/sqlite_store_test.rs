//! libsql Store Tests
//!
//! Runs the content service against a file-backed `SqliteStore` to check that
//! tree state survives reopening the database.

#[cfg(all(test, feature = "turso"))]
mod sqlite_store_tests {
    use anyhow::Result;
    use ptahcms_core::db::{NodeStore, SqliteStore};
    use ptahcms_core::models::NodeKind;
    use ptahcms_core::registry::{Registry, RegistryBuilder, TypeInformation};
    use ptahcms_core::security::AuthContext;
    use ptahcms_core::services::{ApplicationFactory, ContentService, ContentTraverser};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry() -> Result<Arc<Registry>> {
        let registry = RegistryBuilder::new()
            .register_type(TypeInformation::new(
                "site",
                NodeKind::ApplicationRoot {
                    root_path: "/".to_string(),
                },
            ))
            .register_type(TypeInformation::new("folder", NodeKind::Container))
            .register_type(TypeInformation::new("page", NodeKind::Content))
            .register_application(ApplicationFactory::new("/", "root", "Site", "site"))
            .build()?;
        Ok(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_tree_survives_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("ptahcms.db");
        let registry = registry()?;

        let (root_uri, page_uri) = {
            let store = SqliteStore::open(&db_path).await?;
            let service = ContentService::new(Arc::new(store), registry.clone());
            let root = service
                .registry()
                .app_factory("root")
                .expect("root factory registered")
                .root(&service)
                .await?;
            let auth = AuthContext::superuser();
            let folder = service
                .create(&auth, &root.uri, "folder", Some("docs"), Default::default())
                .await?;
            let page = service
                .create(
                    &auth,
                    &folder.uri,
                    "page",
                    None,
                    json!({"title": "Getting Started"})
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                )
                .await?;
            (root.uri, page.uri)
        };

        let store = SqliteStore::open(&db_path).await?;
        let service = ContentService::new(Arc::new(store), registry);
        let root = service
            .registry()
            .app_factory("root")
            .expect("root factory registered")
            .root(&service)
            .await?;
        assert_eq!(root.uri, root_uri);

        let result = ContentTraverser::new(&service, root)
            .traverse("/docs/getting-started/")
            .await?;
        assert_eq!(result.context.uri, page_uri);
        assert_eq!(result.context.title(), "Getting Started");
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_rewrites_paths_in_one_batch() -> Result<()> {
        let store = Arc::new(SqliteStore::open_in_memory().await?);
        let service = ContentService::new(store.clone(), registry()?);
        let root = service
            .registry()
            .app_factory("root")
            .expect("root factory registered")
            .root(&service)
            .await?;
        let auth = AuthContext::superuser();

        let folder = service
            .create(&auth, &root.uri, "folder", Some("old"), Default::default())
            .await?;
        let page = service
            .create(&auth, &folder.uri, "page", Some("leaf"), Default::default())
            .await?;

        service
            .rename(&auth, &folder.uri, "new", Default::default())
            .await?;

        let leaf = store.get_node(&page.uri).await?.expect("leaf stored");
        assert_eq!(leaf.path(), format!("{}new/leaf/", root.path()));
        assert!(store.child(&root.uri, "old").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_cascade_keeps_whole_subtree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("ptahcms.db");
        let store = Arc::new(SqliteStore::open(&db_path).await?);
        let service = ContentService::new(store.clone(), registry()?);
        let root = service
            .registry()
            .app_factory("root")
            .expect("root factory registered")
            .root(&service)
            .await?;
        let auth = AuthContext::superuser();

        let folder = service
            .create(&auth, &root.uri, "folder", Some("docs"), Default::default())
            .await?;
        let first = service
            .create(&auth, &folder.uri, "page", Some("first"), Default::default())
            .await?;
        service
            .create(&auth, &folder.uri, "page", Some("locked"), Default::default())
            .await?;

        let db = libsql::Builder::new_local(&db_path).build().await?;
        db.connect()?
            .execute(
                "CREATE TRIGGER keep_locked BEFORE DELETE ON nodes WHEN OLD.name = 'locked'
                 BEGIN SELECT RAISE(ABORT, 'locked'); END",
                (),
            )
            .await?;

        assert!(service.delete(&auth, &folder.uri).await.is_err());
        assert!(store.get_node(&first.uri).await?.is_some());
        assert!(store.get_node(&folder.uri).await?.is_some());
        assert_eq!(store.child_names(&folder.uri).await?, vec!["first", "locked"]);

        let removed = store
            .delete_nodes(&[first.uri.clone(), "type-page:missing".to_string()])
            .await?;
        assert_eq!(removed, 1);
        assert_eq!(store.child_names(&folder.uri).await?, vec!["locked"]);
        Ok(())
    }
}
