pub mod fs;

pub use fs::{is_contained_relative_path, list_dir_sorted};
