pub mod cascade_loader;
pub mod haar_cascade;
mod integral_image;
