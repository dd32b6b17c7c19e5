mod address_search;
mod corporate;
mod corporate_search;
mod lookup;
mod menu;

pub use address_search::{AddressSearchMode, AddressSearchView};
pub use corporate::CorporateView;
pub use lookup::LookupView;
pub use menu::MenuView;

use crate::commands::CommandKind;
use crate::config::Config;
use crate::kenall::CachedKenallClient;
use crate::ui::view::View;

/// What every view needs to talk to the API
#[derive(Clone)]
pub struct ViewContext {
  pub client: CachedKenallClient,
  pub config: Config,
}

/// Build the view a command opens. `Quit` opens nothing.
pub fn open(kind: CommandKind, ctx: &ViewContext) -> Option<Box<dyn View>> {
  let view: Box<dyn View> = match kind {
    CommandKind::Lookup => Box::new(LookupView::new(ctx)),
    CommandKind::Reverse => Box::new(AddressSearchView::new(ctx, AddressSearchMode::Reverse)),
    CommandKind::Autocomplete => {
      Box::new(AddressSearchView::new(ctx, AddressSearchMode::Autocomplete))
    }
    CommandKind::Corporate => Box::new(CorporateView::new(ctx)),
    CommandKind::Quit => return None,
  };
  Some(view)
}
