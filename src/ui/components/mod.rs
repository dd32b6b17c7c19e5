mod command_input;
mod form;
mod input;
mod row_queue;
mod select;

pub use command_input::{CommandEvent, CommandInput};
pub use form::{FieldKind, Form, FormEvent, FormField};
pub use input::{InputResult, TextInput};
pub use row_queue::RowRequestQueue;
pub use select::{Select, SelectOption};

/// What a component did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, and the parent should react to this event
  Event(T),
  /// Not consumed; the parent tries its own bindings
  NotHandled,
}
