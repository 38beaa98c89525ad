pub mod catalog;
pub mod document;
pub mod error;
pub mod id;
pub mod intent;
pub mod model;
pub mod project;
pub mod script;

pub use catalog::{Catalog, CatalogEntry, Category};
pub use document::{ComponentTree, DocumentError, PageDocument, load_page_json};
pub use error::{EditError, ResolverError};
pub use id::NodeId;
pub use intent::{AppliedChange, EditIntent, IntentKind, Revert};
pub use model::*;
pub use project::{RenderNode, RenderTree, ViewportClass, Zoom, project};
pub use script::{ScriptError, parse_script};
