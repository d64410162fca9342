pub mod event;

pub use event::{Event, EventChanges, EventFiles, EventView, NewEvent, PageRequest};
