//! Static linkage between locals of the program and external variables.

mod linkage;

pub use linkage::{analyze, merge, KnownVariables, Linkage, LinkageAnalysis, LinkageMap};
