pub mod scan;
pub mod search;
pub mod source;
pub mod stats;
