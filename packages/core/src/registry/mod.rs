//! URI and Type Registry
//!
//! The registry is the startup-time catalog of the CMS: registered content
//! types, the URI resolvers keyed by prefix, and the application factories
//! that mount roots at URL paths.
//!
//! # Lifecycle
//!
//! 1. Declare everything on a `RegistryBuilder`
//! 2. `build()` validates the declarations; any identifier claimed twice is a
//!    `ConfigurationConflict` and the application must not start
//! 3. The resulting `Registry` is immutable. Services receive it as an
//!    `Arc<Registry>`; code without access to a service can use the
//!    process-wide slot (`install` / `current` / `teardown`)
//!
//! # Examples
//!
//! ```rust
//! use ptahcms_core::models::NodeKind;
//! use ptahcms_core::registry::{RegistryBuilder, TypeInformation};
//!
//! let registry = RegistryBuilder::new()
//!     .register_type(TypeInformation::new("page", NodeKind::Content))
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.get_type("page").is_some());
//! assert!(registry.resolver("type-page").is_some());
//! ```

mod types;
mod uri;

pub use types::{AllowedTypes, NodeFactory, TypeInformation};
pub use uri::{extract_uri_type, Resolved, ResolverKind, UriResolver, UuidGenerator};

use crate::db::{DatabaseError, NodeStore};
use crate::models::BLOB_URI_TYPE;
use crate::services::{ApplicationFactory, CmsError};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Prefix of type information URIs
pub const TYPE_URI_PREFIX: &str = "type";

/// Immutable catalog of types, resolvers and applications
#[derive(Debug, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<TypeInformation>>,
    resolvers: BTreeMap<String, ResolverKind>,
    applications: Vec<ApplicationFactory>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get_type(&self, name: &str) -> Option<&Arc<TypeInformation>> {
        self.types.get(name)
    }

    /// Look a type up by its `type:<name>` URI
    pub fn get_type_by_uri(&self, uri: &str) -> Option<&Arc<TypeInformation>> {
        uri.strip_prefix("type:")
            .and_then(|name| self.types.get(name))
    }

    /// All registered types ordered by name
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeInformation>> {
        self.types.values()
    }

    pub fn resolver(&self, prefix: &str) -> Option<&ResolverKind> {
        self.resolvers.get(prefix)
    }

    pub fn app_factories(&self) -> &[ApplicationFactory] {
        &self.applications
    }

    pub fn app_factory(&self, name: &str) -> Option<&ApplicationFactory> {
        self.applications.iter().find(|app| app.name == name)
    }

    /// Resolve a URI through the resolver registered for its prefix
    ///
    /// Malformed URIs and unregistered prefixes resolve to `None`.
    pub async fn resolve(
        &self,
        uri: &str,
        store: &dyn NodeStore,
    ) -> Result<Option<Resolved>, DatabaseError> {
        let Some(prefix) = extract_uri_type(uri) else {
            debug!(uri, "Malformed uri");
            return Ok(None);
        };
        let Some(resolver) = self.resolvers.get(prefix) else {
            debug!(uri, prefix, "No resolver registered");
            return Ok(None);
        };

        let resolved = match resolver {
            ResolverKind::TypeInfo => self
                .get_type_by_uri(uri)
                .map(|tinfo| Resolved::Type(Arc::clone(tinfo))),
            ResolverKind::Node => store.get_node(uri).await?.map(Resolved::Node),
            ResolverKind::Blob => store.get_blob(uri).await?.map(Resolved::Blob),
            ResolverKind::Custom(resolver) => resolver.resolve(uri, store).await?,
        };
        Ok(resolved)
    }
}

/// Collects registrations and validates them into a `Registry`
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeInformation>,
    resolvers: Vec<(String, ResolverKind)>,
    applications: Vec<ApplicationFactory>,
}

impl RegistryBuilder {
    /// Builder with the type information and blob resolvers pre-registered
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            resolvers: vec![
                (TYPE_URI_PREFIX.to_string(), ResolverKind::TypeInfo),
                (BLOB_URI_TYPE.to_string(), ResolverKind::Blob),
            ],
            applications: Vec::new(),
        }
    }

    /// Register a content type and the node resolver for its URI prefix
    pub fn register_type(mut self, tinfo: TypeInformation) -> Self {
        self.resolvers
            .push((tinfo.uri_prefix().to_string(), ResolverKind::Node));
        self.types.push(tinfo);
        self
    }

    pub fn register_resolver(
        mut self,
        prefix: impl Into<String>,
        resolver: Arc<dyn UriResolver>,
    ) -> Self {
        self.resolvers
            .push((prefix.into(), ResolverKind::Custom(resolver)));
        self
    }

    /// Register a resolver for nodes whose URIs use a custom prefix
    pub fn register_node_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resolvers.push((prefix.into(), ResolverKind::Node));
        self
    }

    pub fn register_application(mut self, factory: ApplicationFactory) -> Self {
        self.applications.push(factory);
        self
    }

    /// Validate the registrations
    ///
    /// # Errors
    ///
    /// - `ConfigurationConflict` when a type name, resolver prefix or
    ///   application mount path is registered twice
    /// - `Configuration` when an application names an unknown type or a type
    ///   that is not an application root
    pub fn build(self) -> Result<Registry, CmsError> {
        let mut registry = Registry::default();

        for tinfo in self.types {
            if registry.types.contains_key(&tinfo.name) {
                return Err(CmsError::configuration_conflict("type", tinfo.name));
            }
            registry.types.insert(tinfo.name.clone(), Arc::new(tinfo));
        }

        for (prefix, resolver) in self.resolvers {
            if registry.resolvers.contains_key(&prefix) {
                return Err(CmsError::configuration_conflict("uri resolver", prefix));
            }
            registry.resolvers.insert(prefix, resolver);
        }

        for app in self.applications {
            if registry.applications.iter().any(|a| a.path == app.path) {
                return Err(CmsError::configuration_conflict("application", app.path));
            }
            match registry.types.get(&app.type_name) {
                Some(tinfo) if tinfo.kind.is_root() => {}
                Some(_) => {
                    return Err(CmsError::configuration(format!(
                        "Application '{}' type '{}' is not an application root",
                        app.name, app.type_name
                    )))
                }
                None => {
                    return Err(CmsError::configuration(format!(
                        "Application '{}' uses unknown type '{}'",
                        app.name, app.type_name
                    )))
                }
            }
            registry.applications.push(app);
        }

        debug!(
            types = registry.types.len(),
            resolvers = registry.resolvers.len(),
            applications = registry.applications.len(),
            "Registry built"
        );
        Ok(registry)
    }
}

static CURRENT: RwLock<Option<Arc<Registry>>> = RwLock::new(None);

/// Install the process-wide registry, replacing any previous one
pub fn install(registry: Registry) -> Arc<Registry> {
    let registry = Arc::new(registry);
    let mut slot = CURRENT.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(Arc::clone(&registry));
    registry
}

/// The process-wide registry
pub fn current() -> Result<Arc<Registry>, CmsError> {
    let slot = CURRENT.read().unwrap_or_else(|e| e.into_inner());
    slot.clone()
        .ok_or_else(|| CmsError::configuration("Registry is not installed"))
}

/// Remove the process-wide registry; services holding an `Arc` keep theirs
pub fn teardown() {
    let mut slot = CURRENT.write().unwrap_or_else(|e| e.into_inner());
    *slot = None;
}
