pub mod services;
pub mod store;
pub mod traits;

pub use services::*;
pub use store::*;
pub use traits::*;
