mod account;
mod money;
mod summary;

pub use account::*;
pub use money::*;
pub use summary::*;
