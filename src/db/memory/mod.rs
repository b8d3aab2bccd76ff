mod robots;

pub use robots::MemoryRobotRepo;
