pub mod blob;
pub mod blob_detector;
pub mod candidate;
pub mod enclosing_circle;
pub mod frame;
pub mod mask;
pub mod overlay;
pub mod pixel;
pub mod region;
pub mod trajectory;
