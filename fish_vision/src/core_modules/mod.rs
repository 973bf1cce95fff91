pub mod annotate;
pub mod blob_selector;
pub mod color_range;
pub mod frame;
pub mod geometry;
pub mod orientation;
pub mod segmenter;
