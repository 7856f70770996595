pub mod actions;
pub mod gesture;
pub mod replay;
pub mod runtime;
pub mod settings;
pub mod source;
