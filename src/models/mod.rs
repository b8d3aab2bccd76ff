mod credential;
mod policy;
mod robot;
mod robot_create;
mod robot_query;
mod secret_gen;
mod validators;

pub use credential::*;
pub use policy::*;
pub use robot::*;
pub use robot_create::*;
pub use robot_query::*;
pub use secret_gen::*;
pub use validators::{
    ROBOT_NAME_ILLEGAL_CHARS, ROBOT_NAME_MAX_LENGTH, validate_expires_at,
    validate_robot_name_chars,
};
