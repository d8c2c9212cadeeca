mod ids;
mod value;

pub use ids::{CellRef, ObjectId};
pub use value::Value;
