//! Naming rules: identifier normalization and the category keyword table.

mod normalizer;
mod spec;

pub(crate) use normalizer::is_class_boundary;
pub use normalizer::{is_filesystem_safe, split_tokens, IdNormalizer, IdPolicy, NormalizedId};
pub use spec::{Category, CategoryGroup, CategoryRule, NamingSpec};
