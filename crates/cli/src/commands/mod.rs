pub mod correlate;
pub mod profile;
pub mod scan;
pub mod sources;

pub use correlate::*;
pub use profile::*;
pub use scan::*;
pub use sources::*;
