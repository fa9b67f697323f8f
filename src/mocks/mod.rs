pub mod reporter;
pub mod transfer;
