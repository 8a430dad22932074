pub mod distance;
pub mod similarity;

pub use distance::distance;
pub use similarity::similarity;
