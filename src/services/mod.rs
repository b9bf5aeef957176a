mod http;
mod image_cache;

pub use http::{HttpFetch, HttpResponse, ReqwestFetcher};
pub use image_cache::ImageCache;

#[cfg(test)]
pub(crate) use http::fake::FakeFetcher;
#[cfg(test)]
pub(crate) use image_cache::cache_file_name;
