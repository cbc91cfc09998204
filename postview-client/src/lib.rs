mod config;
pub use config::ClientConfig;

mod coordinator;
pub use coordinator::{Status, TreeCoordinator};

mod error;
pub use error::Error;

mod grouping;
pub use grouping::{build_tree, default_branch_key, week_branch_key, PostCollection};

mod source;
pub use source::{HttpPostSource, PostSource};

mod store;
pub use store::{Action, PostTreeState, Store};

mod week;
pub use week::{local_datetime, week_of_year};

pub mod api {
    pub use postview_api::*;
}
