pub mod exif;
pub mod hash;
pub mod relocate;
pub mod resolver;
pub mod walk;
