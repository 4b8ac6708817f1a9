//! Service layer separating file I/O from canvas geometry

pub mod io;

pub use io::ImageIOService;
