//! Business logic for the back-office.
//!
//! Order, auth and email services come from the storefront library; this
//! crate only adds the image CDN client.

pub mod cdn;

pub use cdn::{CloudinaryClient, ImageUpload, UploadError};
