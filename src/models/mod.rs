pub mod attachment;
pub mod common;
pub mod form;
pub mod history;

pub use attachment::*;
pub use common::*;
pub use form::*;
pub use history::*;
