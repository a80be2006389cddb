//! Form Flow Tests
//!
//! Exercises the add, edit, rename, delete and share forms against an
//! in-memory content tree, including their redirect targets and messages.

#[cfg(test)]
mod form_tests {
    use anyhow::Result;
    use ptahcms_core::db::MemoryStore;
    use ptahcms_core::forms::{
        AddForm, Button, DeleteForm, EditForm, FormOutcome, MessageKind, RenameForm, ShareForm,
        FORM_ERROR_MESSAGE,
    };
    use ptahcms_core::models::{Node, NodeKind, NAME_FIELD};
    use ptahcms_core::registry::{RegistryBuilder, TypeInformation};
    use ptahcms_core::security::{AuthContext, ROLE_EDITOR, ROLE_MANAGER};
    use ptahcms_core::services::{ApplicationFactory, ContentService};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Site root mounted at `/` with folder and page types
    async fn create_site() -> Result<(ContentService, Node)> {
        let registry = RegistryBuilder::new()
            .register_type(TypeInformation::new(
                "site",
                NodeKind::ApplicationRoot {
                    root_path: "/".to_string(),
                },
            ))
            .register_type(TypeInformation::new("folder", NodeKind::Container).title("Folder"))
            .register_type(TypeInformation::new("page", NodeKind::Content).title("Page"))
            .register_application(ApplicationFactory::new("/", "root", "Site", "site"))
            .build()?;
        let service = ContentService::new(Arc::new(MemoryStore::new()), Arc::new(registry));
        let root = service
            .registry()
            .app_factory("root")
            .expect("root factory registered")
            .root(&service)
            .await?;
        Ok((service, root))
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
                data(json!({ "title": title })),
            )
            .await?;
        Ok(node)
    }

    fn redirect_url(outcome: &FormOutcome) -> &str {
        match outcome {
            FormOutcome::Redirect(url) => url,
            FormOutcome::Rerender(errors) => panic!("Expected redirect, got {:?}", errors),
        }
    }

    #[tokio::test]
    async fn test_add_form_creates_and_redirects() -> Result<()> {
        let (service, root) = create_site().await?;
        let auth = AuthContext::user("alice").with_role(ROLE_EDITOR);

        let form = AddForm::new(&service, &auth, root.clone(), "page").await?;
        assert_eq!(form.label(), "Add Page");
        assert_eq!(form.fields().names(), vec![NAME_FIELD, "title", "description"]);

        let response = form
            .submit(Button::Add, &data(json!({"title": "Welcome Home"})))
            .await?;

        assert_eq!(redirect_url(&response.outcome), "/welcome-home/");
        assert_eq!(response.messages[0].kind, MessageKind::Success);
        assert_eq!(response.messages[0].text, "New content has been created.");

        let page = service.store().child(&root.uri, "welcome-home").await?;
        let page = page.expect("page stored");
        assert_eq!(page.title(), "Welcome Home");
        assert_eq!(page.owner.as_deref(), Some("alice"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_form_rejects_used_name_and_missing_title() -> Result<()> {
        let (service, root) = create_site().await?;
        create_in(&service, &root, "page", "About").await?;
        let auth = AuthContext::superuser();
        let form = AddForm::new(&service, &auth, root.clone(), "page").await?;

        let response = form
            .submit(
                Button::Add,
                &data(json!({"title": "Other", NAME_FIELD: "about"})),
            )
            .await?;
        assert!(!response.is_redirect());
        assert_eq!(response.errors()[0].field.as_deref(), Some(NAME_FIELD));
        assert_eq!(response.errors()[0].message, "Name already in use");
        assert_eq!(response.messages[0].text, FORM_ERROR_MESSAGE);

        let response = form.submit(Button::Add, &data(json!({}))).await?;
        assert_eq!(response.errors()[0].field.as_deref(), Some("title"));

        let response = form.submit(Button::Cancel, &Map::new()).await?;
        assert_eq!(redirect_url(&response.outcome), ".");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_form_chooses_free_name() -> Result<()> {
        let (service, root) = create_site().await?;
        create_in(&service, &root, "page", "News").await?;
        let form = AddForm::new(&service, &AuthContext::superuser(), root, "page").await?;

        assert_eq!(form.choose_name("News").await?, "news-1");
        assert_eq!(form.choose_name("!!!").await?, "page");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_form_requires_add_permission() -> Result<()> {
        let (service, root) = create_site().await?;

        let err = AddForm::new(&service, &AuthContext::anonymous(), root.clone(), "page")
            .await
            .err()
            .expect("anonymous can't add");
        assert!(err.is_forbidden());

        let err = AddForm::new(&service, &AuthContext::superuser(), root, "missing")
            .await
            .err()
            .expect("unknown type");
        assert!(err.to_string().contains("missing"));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_form_saves_changes() -> Result<()> {
        let (service, root) = create_site().await?;
        let page = create_in(&service, &root, "page", "Draft").await?;
        let auth = AuthContext::user("bob").with_role(ROLE_EDITOR);

        let form = EditForm::new(&service, &auth, page.clone()).await?;
        assert_eq!(form.label(), "Modify content: Page");
        assert_eq!(form.form_content()["title"], json!("Draft"));

        let response = form
            .submit(
                Button::Save,
                &data(json!({"title": "Final", "description": "Done"})),
            )
            .await?;
        assert_eq!(redirect_url(&response.outcome), ".");
        assert_eq!(response.messages[0].text, "Changes have been saved.");

        let stored = service.get_node(&page.uri).await?;
        assert_eq!(stored.title(), "Final");
        assert_eq!(stored.field("description"), json!("Done"));

        let err = EditForm::new(&service, &AuthContext::anonymous(), page)
            .await
            .err()
            .expect("anonymous can't edit");
        assert!(err.is_forbidden());
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_form() -> Result<()> {
        let (service, root) = create_site().await?;
        let folder = create_in(&service, &root, "folder", "Folder").await?;
        let page = create_in(&service, &folder, "page", "Page").await?;
        let auth = AuthContext::superuser();

        let form = RenameForm::new(&service, &auth, page.clone()).await?;
        assert_eq!(form.form_content()[NAME_FIELD], json!("page"));

        let response = form
            .submit(Button::Rename, &data(json!({ NAME_FIELD: "page" })))
            .await?;
        assert_eq!(redirect_url(&response.outcome), ".");

        let response = form
            .submit(Button::Rename, &data(json!({ NAME_FIELD: "renamed" })))
            .await?;
        assert_eq!(redirect_url(&response.outcome), "/folder/renamed/");
        assert_eq!(response.messages[0].text, "Content has been renamed.");
        assert!(service.store().child(&folder.uri, "renamed").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_form_keeps_root_children() -> Result<()> {
        let (service, root) = create_site().await?;
        let folder = create_in(&service, &root, "folder", "Folder").await?;

        let form = RenameForm::new(&service, &AuthContext::superuser(), folder.clone()).await?;
        assert!(form.is_protected());

        let response = form
            .submit(Button::Rename, &data(json!({ NAME_FIELD: "other" })))
            .await?;
        assert!(!response.is_redirect());
        assert_eq!(response.messages[0].kind, MessageKind::Warning);
        assert_eq!(service.get_node(&folder.uri).await?.name(), "folder");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_form() -> Result<()> {
        let (service, root) = create_site().await?;
        let folder = create_in(&service, &root, "folder", "Folder").await?;
        let page = create_in(&service, &folder, "page", "Page").await?;
        let auth = AuthContext::superuser();

        let form = DeleteForm::new(&service, &auth, folder.clone()).await?;
        let response = form.submit(Button::Delete, &Map::new()).await?;
        assert!(!response.is_redirect());
        assert_eq!(response.errors()[0].field, None);
        assert!(service.store().get_node(&folder.uri).await?.is_some());

        let form = DeleteForm::new(&service, &auth, page.clone()).await?;
        let response = form.submit(Button::Delete, &Map::new()).await?;
        assert_eq!(redirect_url(&response.outcome), "/folder/");
        assert_eq!(response.messages[0].text, "Content has been removed.");
        assert!(service.store().get_node(&page.uri).await?.is_none());

        let form = DeleteForm::new(&service, &auth, folder.clone()).await?;
        let response = form.submit(Button::Delete, &Map::new()).await?;
        assert_eq!(redirect_url(&response.outcome), "/");
        Ok(())
    }

    #[tokio::test]
    async fn test_share_form() -> Result<()> {
        let (service, root) = create_site().await?;
        let page = create_in(&service, &root, "page", "Shared").await?;

        let editor = AuthContext::user("ed").with_role(ROLE_EDITOR);
        let err = ShareForm::new(&service, &editor, page.clone())
            .await
            .err()
            .expect("editors can't share");
        assert!(err.is_forbidden());

        let manager = AuthContext::user("mona").with_role(ROLE_MANAGER);
        let form = ShareForm::new(&service, &manager, page.clone()).await?;
        assert!(form.local_roles().is_empty());

        let response = form
            .submit(
                Button::Share,
                &data(json!({"principal": "ed", "roles": ["role:Owner"]})),
            )
            .await?;
        assert_eq!(response.errors()[0].field.as_deref(), Some("roles"));

        let response = form
            .submit(
                Button::Share,
                &data(json!({"principal": "ed", "roles": [ROLE_MANAGER]})),
            )
            .await?;
        assert_eq!(redirect_url(&response.outcome), ".");

        let stored = service.get_node(&page.uri).await?;
        assert_eq!(
            stored.local_roles.get("ed"),
            Some(&vec![ROLE_MANAGER.to_string()])
        );

        // the new local role is now enough to share
        assert!(ShareForm::new(&service, &editor, stored).await.is_ok());
        Ok(())
    }
}
