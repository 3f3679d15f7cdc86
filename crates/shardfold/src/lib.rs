mod aggregate;
mod allocator;
mod analytics;
mod coordinator;
mod error;
mod group;
mod invoke;
mod lifecycle;
mod model;
mod store;
mod summary;

pub use crate::aggregate::*;
pub use crate::allocator::*;
pub use crate::analytics::*;
pub use crate::coordinator::*;
pub use crate::error::*;
pub use crate::group::*;
pub use crate::invoke::*;
pub use crate::lifecycle::*;
pub use crate::model::*;
pub use crate::store::*;
pub use crate::summary::*;
