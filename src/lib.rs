// Tematica: topic discovery for Spanish-language social media posts.
//
// This is the library root. Each module corresponds to a stage or a
// supporting subsystem of the batch pipeline.

pub mod config;
pub mod enrich;
pub mod error;
pub mod lexicon;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod records;
pub mod text;
pub mod topics;
