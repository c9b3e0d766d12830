mod building;
mod report;

pub use building::{
    format_area, BuildingProfile, HeatingSystem, RenovationFocus, WindowCondition,
};
pub use report::{ChartPoint, ChartSpec, RenovationReport};
