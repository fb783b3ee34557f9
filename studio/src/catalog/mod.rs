//! Model catalog and GPU status: normalized types, the session cache and the
//! data the model picker renders.

mod cache;
mod gpu;
mod model;
mod view;

pub use cache::CatalogCache;
pub use gpu::{GpuIndicator, GpuInfo};
pub use model::{display_name, CategoryInfo, ModelCatalog, ModelCategory, ModelEntry};
pub use view::{CategoryGroup, ModelItem, ModelListView, FAILED_TO_CONNECT};
