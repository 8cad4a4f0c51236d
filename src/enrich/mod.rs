// Record enrichment outside the clustering core: publication-date context
// and engagement ratios.

pub mod dates;
pub mod engagement;
