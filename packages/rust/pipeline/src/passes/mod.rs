//! The semantic-annotation passes, in their fixed topological order:
//! interface index → term resolution → bibliography → boilerplate →
//! outline → diagnostics → assertions.

mod assertions;
mod boilerplate;
mod diagnostics;
mod idl;
mod references;
mod toc;
mod xref;

pub use assertions::AssertionsPass;
pub use boilerplate::BoilerplatePass;
pub use diagnostics::DiagnosticsPass;
pub use idl::IdlPass;
pub use references::ReferencesPass;
pub use toc::TocPass;
pub use xref::XrefPass;
