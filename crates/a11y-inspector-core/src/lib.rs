//! Accessibility tree capture for a11y-inspector.
//!
//! This crate turns a live, possibly cyclic, platform node graph into a
//! [`CaptureDocument`]: the platform is reached only through the traits in
//! [`platform`], every acquired handle is held by a [`Lease`], and the
//! walker guards against cycles with a per-capture [`VisitedSet`].

#![deny(clippy::all)]

mod capture;
mod descriptor;
mod error;
mod lease;
pub mod platform;
mod record;
pub mod scene;
mod walker;

pub use capture::CaptureCoordinator;
pub use capture::CaptureKind;
pub use capture::NAVIGATION_BAR_TITLE;
pub use capture::OVERLAY_PANE_TITLES;
pub use capture::assemble_document;
pub use capture::build_window_record;
pub use capture::is_noise_window;
pub use descriptor::describe;
pub use descriptor::describe_line;
pub use descriptor::ordered_actions;
pub use descriptor::role_name;
pub use error::CaptureError;
pub use error::HostError;
pub use lease::Lease;
pub use platform::AccessibilityHost;
pub use platform::ActionKind;
pub use platform::CollectionInfo;
pub use platform::CollectionItemInfo;
pub use platform::NodeFlags;
pub use platform::NodeHandle;
pub use platform::NodeId;
pub use platform::Rect;
pub use platform::ReportedAction;
pub use platform::ViewFilter;
pub use platform::WindowHandle;
pub use record::CaptureDocument;
pub use record::CheckState;
pub use record::NodeRecord;
pub use record::Visibility;
pub use record::WINDOW_ROLE;
pub use record::WindowRecord;
pub use scene::Scene;
pub use scene::SceneError;
pub use scene::SceneHost;
pub use walker::TreeWalker;
pub use walker::VisitedSet;
