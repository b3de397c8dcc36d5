pub mod token;
pub(crate) mod prompt_processing;
