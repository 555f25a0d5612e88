pub mod router;

pub use router::{RosterState, roster_router};
