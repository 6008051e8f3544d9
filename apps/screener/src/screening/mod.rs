// Resume screening pipeline: extract → embed & compare → match skills → weight → rank.
// The handlers are the only async code; everything below them is synchronous.

pub mod embedding;
pub mod extractor;
pub mod handlers;
pub mod ranker;
pub mod scoring;
pub mod similarity;
pub mod skills;
