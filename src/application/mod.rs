// Application layer - use cases and orchestration over the account store.

pub mod aggregation;
pub mod error;
pub mod locks;
pub mod notifier;
pub mod service;

pub use aggregation::*;
pub use error::*;
pub use locks::*;
pub use notifier::*;
pub use service::*;
