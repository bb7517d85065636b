pub mod dates;
pub mod values;
