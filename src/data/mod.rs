//! Data structures for WGCNA analysis

mod expression;
mod traits;

pub use expression::ExpressionMatrix;
pub use traits::SampleTraits;
