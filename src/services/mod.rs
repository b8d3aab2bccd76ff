mod robots;

pub use robots::{RobotError, RobotErrorKind, RobotService};
