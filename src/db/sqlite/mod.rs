mod robots;

pub use robots::SqliteRobotRepo;
