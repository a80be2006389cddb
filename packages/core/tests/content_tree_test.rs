//! Content Tree Integration Tests
//!
//! Covers the public surface used by a site: container mapping, traversal,
//! permission-gated actions, loading, blobs and model management.

#[cfg(test)]
mod content_tree_tests {
    use anyhow::Result;
    use ptahcms_core::config::CmsSettings;
    use ptahcms_core::db::MemoryStore;
    use ptahcms_core::models::{Node, NodeKind};
    use ptahcms_core::registry::{RegistryBuilder, TypeInformation};
    use ptahcms_core::security::{AuthContext, ActionArgs, ROLE_EDITOR, ROLE_MANAGER, VIEW};
    use ptahcms_core::services::{
        ApplicationFactory, BlobMetadata, ContentEvent, ContentHook, ContentService,
        ContentTraverser, ModelModule,
    };
    use serde_json::{json, Map, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<(String, String)>>,
    }

    impl ContentHook for EventLog {
        fn on_event(&self, event: &ContentEvent) {
            self.events
                .lock()
                .unwrap()
                .push((event.event_type().to_string(), event.uri().to_string()));
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Site mounted at `/test/` with folder and page types
    async fn create_site(settings: CmsSettings) -> Result<(ContentService, Node, Arc<EventLog>)> {
        let registry = RegistryBuilder::new()
            .register_type(TypeInformation::new(
                "site",
                NodeKind::ApplicationRoot {
                    root_path: "/".to_string(),
                },
            ))
            .register_type(TypeInformation::new("folder", NodeKind::Container).title("Folder"))
            .register_type(TypeInformation::new("page", NodeKind::Content).title("Page"))
            .register_application(ApplicationFactory::new("/test", "root", "Test", "site"))
            .build()?;
        let log = Arc::new(EventLog::default());
        let service = ContentService::new(Arc::new(MemoryStore::new()), Arc::new(registry))
            .with_settings(settings)
            .with_hook(log.clone());
        let root = service
            .registry()
            .app_factory("root")
            .expect("root factory registered")
            .root(&service)
            .await?;
        log.events.lock().unwrap().clear();
        Ok((service, root, log))
    }

    async fn create_in(
        service: &ContentService,
        container: &Node,
        type_name: &str,
        title: &str,
    ) -> Result<Node> {
        let node = service
            .create(
                &AuthContext::superuser(),
                &container.uri,
                type_name,
                None,
                fields(json!({ "title": title })),
            )
            .await?;
        Ok(node)
    }

    #[tokio::test]
    async fn test_container_mapping() -> Result<()> {
        let (service, root, _) = create_site(CmsSettings::default()).await?;
        let folder = create_in(&service, &root, "folder", "Docs").await?;
        let page = create_in(&service, &folder, "page", "Intro").await?;

        let docs = service.container(folder.clone())?;
        assert_eq!(docs.keys().await?, vec!["intro".to_string()]);
        assert!(docs.contains("intro").await?);
        assert_eq!(docs.get_item("intro").await?.uri, page.uri);
        assert!(docs.get_item("missing").await.unwrap_err().is_not_found());

        assert!(service.container(page.clone()).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_move_between_containers() -> Result<()> {
        let (service, root, log) = create_site(CmsSettings::default()).await?;
        let first = create_in(&service, &root, "folder", "First").await?;
        let second = create_in(&service, &root, "folder", "Second").await?;
        let page = create_in(&service, &first, "page", "Moving").await?;
        log.events.lock().unwrap().clear();

        let moved = service
            .container(second.clone())?
            .set_item("moved", page.clone())
            .await?;
        assert_eq!(moved.parent_uri.as_deref(), Some(second.uri.as_str()));
        assert_eq!(moved.path(), format!("{}moved/", second.path()));
        assert!(service.container(first)?.keys().await?.is_empty());
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![("moved".to_string(), page.uri.clone())]
        );

        let err = service
            .container(moved.clone())
            .err()
            .expect("pages are not containers");
        assert!(err.to_string().contains(&page.uri));

        let err = service
            .container(second.clone())?
            .set_item("self", second.clone())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("it self"));
        Ok(())
    }

    #[tokio::test]
    async fn test_traversal() -> Result<()> {
        let (service, root, _) = create_site(CmsSettings::default()).await?;
        let folder = create_in(&service, &root, "folder", "Folder").await?;
        let page = create_in(&service, &folder, "page", "Page").await?;
        let traverser = ContentTraverser::new(&service, root.clone());

        let result = traverser.traverse("/test/").await?;
        assert_eq!(result.context.uri, root.uri);
        assert_eq!(result.view_name, "");

        let result = traverser.traverse("/test//folder/index.html").await?;
        assert_eq!(result.context.uri, folder.uri);
        assert_eq!(result.view_name, "index.html");

        let result = traverser.traverse("/test/folder/page/edit/extra").await?;
        assert_eq!(result.context.uri, page.uri);
        assert_eq!(result.view_name, "edit");
        assert_eq!(result.subpath, vec!["extra".to_string()]);
        assert_eq!(result.traversed, vec!["folder".to_string(), "page".to_string()]);

        assert!(traverser.traverse("/other/").await.unwrap_err().is_not_found());
        assert_eq!(traverser.url_for(&page).as_deref(), Some("/test/folder/page/"));
        Ok(())
    }

    #[tokio::test]
    async fn test_actions_are_gated_before_mutation() -> Result<()> {
        let (service, root, log) = create_site(CmsSettings::default()).await?;
        let page = create_in(&service, &root, "page", "Guarded").await?;
        log.events.lock().unwrap().clear();

        let anonymous = AuthContext::anonymous();
        let err = service
            .update(&anonymous, &page.uri, fields(json!({"title": "Hacked"})))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        let err = service.delete(&anonymous, &page.uri).await.unwrap_err();
        assert!(err.is_forbidden());

        assert_eq!(service.get_node(&page.uri).await?.title(), "Guarded");
        assert!(log.events.lock().unwrap().is_empty());

        let editor = AuthContext::user("ed").with_role(ROLE_EDITOR);
        let wrapper = service.wrap(&editor, page.clone()).await?;
        assert_eq!(wrapper.actions(), vec!["delete", "rename", "update"]);
        let outcome = wrapper
            .action("update")?
            .call(ActionArgs::Update {
                fields: fields(json!({"title": "Edited"})),
            })
            .await?;
        assert_eq!(outcome.into_node().map(|n| n.title().to_string()).as_deref(), Some("Edited"));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_and_batch_delete() -> Result<()> {
        let (service, root, log) = create_site(CmsSettings::default()).await?;
        let folder = create_in(&service, &root, "folder", "Folder").await?;
        let a = create_in(&service, &folder, "page", "A page").await?;
        let b = create_in(&service, &folder, "page", "B page").await?;

        let loaded = service
            .load(&AuthContext::anonymous(), &a.uri, Some(&VIEW))
            .await?;
        assert_eq!(loaded.uri, a.uri);
        assert!(service
            .load(&AuthContext::anonymous(), "type-page:missing", None)
            .await
            .unwrap_err()
            .is_not_found());

        log.events.lock().unwrap().clear();
        let removed = service
            .batch_delete(
                &AuthContext::user("mona").with_role(ROLE_MANAGER),
                &folder.uri,
                vec![a.name().to_string(), b.name().to_string()],
            )
            .await?;
        assert_eq!(removed.len(), 2);
        assert!(service.container(folder)?.keys().await?.is_empty());

        let deleted: Vec<String> = log
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| kind == "deleted")
            .map(|(_, uri)| uri.clone())
            .collect();
        assert_eq!(deleted, vec![a.uri, b.uri]);
        Ok(())
    }

    #[tokio::test]
    async fn test_blob_storage() -> Result<()> {
        let (service, root, _) = create_site(CmsSettings::default()).await?;
        let page = create_in(&service, &root, "page", "Attachment").await?;
        let blobs = service.blob_storage();

        let mut reader: &[u8] = b"hello blob";
        let blob = blobs
            .add(&mut reader, Some(&page), BlobMetadata::new("hello.txt", "text/plain"))
            .await?;
        assert_eq!(blob.size, 10);

        let found = blobs.get_by_parent(&page.uri).await?.expect("blob by parent");
        assert_eq!(found.uri, blob.uri);
        assert_eq!(found.filename, "hello.txt");

        let replaced = blobs.replace(&blob.uri, b"bye".to_vec()).await?;
        assert_eq!(replaced.read(), Some(&b"bye"[..]));

        let resolved = service.resolve(&blob.uri).await?.and_then(|r| r.into_blob());
        assert_eq!(resolved.map(|b| b.size), Some(3));

        assert!(blobs.remove(&blob.uri).await?);
        assert!(blobs.query(&blob.uri).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_model_management() -> Result<()> {
        let settings = CmsSettings {
            disable_models: vec!["type:site".to_string()],
            page_size: 2,
            ..CmsSettings::default()
        };
        let (service, _root, _) = create_site(settings).await?;
        let models = ModelModule::new(&service);

        assert!(models.available(&AuthContext::superuser()));
        assert!(!models.available(&AuthContext::user("ed").with_role(ROLE_EDITOR)));
        let titles: Vec<String> = models.types().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["Folder".to_string(), "Page".to_string()]);
        assert!(models.model("site").is_err());

        let pages = models.model("page")?;
        for title in ["One", "Two", "Three"] {
            pages.add_record(&fields(json!({ "title": title }))).await?;
        }
        let first = pages.page(1).await?;
        assert_eq!(first.total, 3);
        assert_eq!(first.pages, 2);
        assert_eq!(first.records.len(), 2);
        Ok(())
    }
}
