//! Interactive forms according to ISO 32000-1 Chapter 12.7
//!
//! [`AcroForm`] and [`Field`] are views over shared indirect dictionaries,
//! like the annotation types. The field tree is walked by object identity,
//! so shared and cyclic `/Kids` terminate.

mod acro_form;
mod field;
mod field_type;

pub use acro_form::AcroForm;
pub use field::Field;
pub use field_type::{FieldFlags, FieldType};
