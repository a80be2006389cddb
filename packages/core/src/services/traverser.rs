//! URL traversal
//!
//! Maps a request path onto the content tree of one application root.
//!
//! # Algorithm
//!
//! 1. Split the path on `/` and drop empty segments (so `a//b` equals `a/b`)
//! 2. Strip the segments of the root's mount point; a path outside the mount
//!    is `NotFound`
//! 3. Descend while the current node is a container and the next segment is
//!    one of its keys
//! 4. The first unconsumed segment is the view name, the rest is the subpath
//!
//! # Examples
//!
//! With a root mounted at `/test/`:
//!
//! | path                       | context | view name    |
//! |----------------------------|---------|--------------|
//! | `/test/`                   | root    | ``           |
//! | `/test/index.html`         | root    | `index.html` |
//! | `/test/folder/`            | folder  | ``           |
//! | `/test/folder/index.html`  | folder  | `index.html` |

use crate::models::Node;
use crate::services::content_service::ContentService;
use crate::services::error::CmsError;

/// Outcome of traversing a path
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalResult {
    /// Deepest node reached
    pub context: Node,
    /// First segment that was not a key, empty when all segments were consumed
    pub view_name: String,
    /// Segments after the view name
    pub subpath: Vec<String>,
    /// Segments consumed as container keys
    pub traversed: Vec<String>,
    pub root: Node,
}

/// Traverses the content tree below one application root
pub struct ContentTraverser<'s> {
    service: &'s ContentService,
    root: Node,
}

impl<'s> ContentTraverser<'s> {
    pub fn new(service: &'s ContentService, root: Node) -> Self {
        Self { service, root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub async fn traverse(&self, path: &str) -> Result<TraversalResult, CmsError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mount: Vec<&str> = self
            .root
            .root_path()
            .unwrap_or("/")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if !segments.starts_with(&mount) {
            tracing::debug!("Path {} is outside of mount {:?}", path, mount);
            return Err(CmsError::not_found(path));
        }

        let mut context = self.root.clone();
        let mut traversed = Vec::new();
        let mut remaining = segments[mount.len()..].iter();
        let mut view_name = String::new();

        for segment in remaining.by_ref() {
            let child = if context.is_container() {
                self.service.store().child(&context.uri, segment).await?
            } else {
                None
            };
            match child {
                Some(child) => {
                    traversed.push(segment.to_string());
                    context = child;
                }
                None => {
                    view_name = segment.to_string();
                    break;
                }
            }
        }
        let subpath = remaining.map(|s| s.to_string()).collect();

        tracing::debug!(
            "Traversed {} to {} (view '{}')",
            path,
            context.uri,
            view_name
        );
        Ok(TraversalResult {
            context,
            view_name,
            subpath,
            traversed,
            root: self.root.clone(),
        })
    }

    pub fn url_for(&self, node: &Node) -> Option<String> {
        url_for(&self.root, node)
    }
}

/// Mount-relative URL of a node below `root`
///
/// `None` when the node is not inside the root's tree.
pub fn url_for(root: &Node, node: &Node) -> Option<String> {
    let mount = root.root_path()?;
    let relative = node.path().strip_prefix(root.path())?;
    Some(format!("{}{}", mount, relative))
}
