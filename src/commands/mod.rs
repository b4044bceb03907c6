pub mod export;
pub mod merge;
pub mod parse;
pub mod prompt;
pub mod reconcile;
pub mod status;
