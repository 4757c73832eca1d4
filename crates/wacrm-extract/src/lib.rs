pub mod dom;
pub mod drawer;
pub mod error;
pub mod extractors;
pub mod notify;
pub mod orchestrator;
pub mod page;
pub mod reaction;
pub mod visibility;

pub use drawer::{Budget, DrawerController, DrawerState};
pub use error::{ExtractError, Result};
pub use extractors::{ExtractionContext, Strategy};
pub use notify::{MemoryNotifier, Notifier};
pub use orchestrator::{CycleOutcome, Orchestrator};
pub use page::{HostPage, PageSnapshot, PointerEvent, ScriptedPage, Viewport};
pub use reaction::{ChangeReactor, Trigger};
