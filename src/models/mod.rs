pub mod coordinate;
pub mod poi;
pub mod source;

pub use coordinate::Coordinate;
pub use poi::{Poi, PoiType};
pub use source::Source;
