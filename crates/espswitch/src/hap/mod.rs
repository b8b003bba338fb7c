//! Framework boundary.
//!
//! The bridge framework owns services and characteristics; accessories only
//! see the [`Registry`] and [`Service`] traits and register a
//! [`CharacteristicHandler`] for the values controllers may read or write.

mod characteristic;
mod memory;
mod registry;

pub use characteristic::CharacteristicKind;
pub use characteristic::ServiceKind;
pub use characteristic::Value;
pub use memory::CharacteristicUpdate;
pub use memory::MemoryRegistry;
pub use memory::MemoryService;
pub use memory::ServiceSnapshot;
pub use registry::CharacteristicHandler;
pub use registry::HapError;
pub use registry::Registry;
pub use registry::Service;
