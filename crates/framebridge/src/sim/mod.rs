//! # In-Memory Doubles
//!
//! A simulated host page and a scripted trusted process, so that sessions
//! can run end to end without a webview. Used by the test suites and by the
//! pilot binary.

pub mod host;
pub mod page;

pub use host::FnInvoker;
pub use host::ScriptedHost;
pub use page::SimulatedPage;
