//! Flat ordered lists outside the resource tree.

mod activity_bar;
mod environment;
mod params;
mod table;

pub use activity_bar::{ActivityBar, ActivityBarItem, ActivityBarState};
pub use environment::{
    CreateEnvironment, EnvironmentGroup, EnvironmentItem, EnvironmentLists, EnvironmentMovePlan,
    EnvironmentScope,
};
pub use params::{AddParam, EndpointParams, ParamOptions, ParamRow, ParamShape, ParamsPatch};
pub use table::{Table, TableRow, Tables};
