pub mod gif_reader;
pub mod gif_writer;
pub mod image_crate_reader;
