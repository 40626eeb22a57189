mod name;

pub use name::*;
