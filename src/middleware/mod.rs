pub mod cors;
pub mod signed_body;
