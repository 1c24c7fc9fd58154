//! Built-in middleware.
//!
//! These are the handlers [`Stack::classic`](crate::Stack::classic) installs,
//! in this order:
//!
//! | Middleware | Role |
//! |---|---|
//! | [`Recovery`] | Turns a panic anywhere below it into a `500`. Must come first. |
//! | [`Logger`] | One `tracing` event when a request starts, one when it completes. |
//! | [`Static`] | Serves files from a directory; passes everything else on. |
//!
//! Each one is an ordinary [`Handler`](crate::Handler), so they can be mixed
//! freely with your own.

mod logger;
mod recovery;
mod static_files;

pub use logger::Logger;
pub use recovery::Recovery;
pub use static_files::Static;
