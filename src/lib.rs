// Export modules for use in tests
pub mod anchor;
pub mod annotations;
pub mod assignment;
pub mod editor;
pub mod event_source;
pub mod navigation;
pub mod session;
pub mod store;
pub mod surface;
pub mod ui;
pub mod view_state;

// Re-export the main session components
pub use anchor::{Anchor, PixelPoint, SurfaceDimensions};
pub use annotations::{Annotation, AnnotationCollection};
pub use editor::{AnnotationEditor, AnnotationPlacement, EditorError};
pub use navigation::{NavigationController, RenderOutcome, RenderRequest, Zoom};
pub use session::{Effect, ReviewSession};
pub use view_state::{ViewEvent, ViewMode, ViewStateMachine};
