//! Shared data model and error taxonomy for the render pipeline and
//! release lifecycle engine.

pub mod component;
pub mod error;
pub mod fqn;
pub mod inventory;
pub mod labels;
pub mod matchplan;
pub mod module;
pub mod release;
pub mod resource;
pub mod transformer;

pub use component::Component;
pub use error::{Error, ResourceFailure, Result, SourcePosition, ValidationError, ValidationErrors};
pub use fqn::Fqn;
pub use inventory::{ChangeEntry, ChangeInventory, Inventory, InventoryEntry, InventoryEntryIdentity, InventoryMetadata, ModuleRef};
pub use matchplan::{MatchPlan, TransformerMatch};
pub use module::{Module, ModuleMetadata};
pub use release::{Options, Release, module_id, release_id};
pub use resource::{Resource, order_ascending, order_descending, order_entries_descending};
pub use transformer::Transformer;
