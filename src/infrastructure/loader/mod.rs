mod file;

pub use file::FileLoader;
