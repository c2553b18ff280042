pub mod appointment;
pub mod community;
pub mod enums;
pub mod notification;
pub mod prescription;
pub mod symptom;
pub mod user;

pub use appointment::*;
pub use community::*;
pub use enums::*;
pub use notification::*;
pub use prescription::*;
pub use symptom::*;
pub use user::*;
