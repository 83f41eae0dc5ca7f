//! Image validation and proxying
//!
//! Third-party image URLs never reach clients directly. They are probed for
//! a successful, reasonably-sized `image/*` response and then rewritten to
//! the proxy endpoint, which re-validates and relays the bytes. Every failure
//! collapses to the placeholder image.

mod policy;
mod validator;

pub use policy::{Precheck, SafeUrl, UrlPolicy};
pub use validator::{
    CandidateValidator, FetchedImage, ImageValidator, ProxiedImage, ProxyError,
};
