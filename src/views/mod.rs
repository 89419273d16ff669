//! Terminal renditions of the uploader and identification views.
//!
//! Both are plain state machines; transitions are driven by user actions and
//! by the results of [`PlantApi`](crate::client::PlantApi) calls.

pub mod identification;
pub mod uploader;

pub use identification::{IdentificationState, IdentificationView, Tab};
pub use uploader::{UploaderPhase, UploaderState, UploaderView};
