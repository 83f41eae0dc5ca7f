//! Dish image search
//!
//! Resolves a dish name to a validated, proxied photo by walking an ordered
//! list of image-search providers. Resolution never fails: when every
//! provider comes up empty the placeholder image is returned.

mod cache;
mod provider;
mod resolver;

pub use cache::ResolutionCache;
pub use provider::{BingImageSearch, GoogleImageSearch, ImageSearchProvider, SearchError};
pub use resolver::{simplified_query, DishImageResolver, ImageResolver, ResolverConfig};
