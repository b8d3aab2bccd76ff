mod robots;

pub use robots::{EnableOutcome, NewRobot, RobotRepo};
