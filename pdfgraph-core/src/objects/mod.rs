mod arena;
mod dictionary;
mod primitive;
mod stream;

pub(crate) use arena::{array_handles, push_reference};
pub use arena::{ObjectArena, ObjectHandle, ObjectResolver};
pub use dictionary::Dictionary;
pub use primitive::{Object, ObjectId, PdfString};
pub use stream::Stream;
