pub mod datatype;
pub mod field;
pub mod record;
pub mod scalar;
