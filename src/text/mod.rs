// Text processing: post normalization and keyword tokenization.

pub mod normalize;
pub mod tokenize;
