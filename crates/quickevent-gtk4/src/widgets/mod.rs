pub mod date_field;
pub mod window;
