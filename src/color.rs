pub mod color_space;
pub mod spectrum;
