pub mod strong_stock;
pub mod response;

pub use strong_stock::*;
pub use response::*;
