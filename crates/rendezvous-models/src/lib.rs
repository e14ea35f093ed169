pub mod location;
pub mod session;
pub mod user;

pub use location::{LatLng, LocationInfo, LocationSource};
pub use session::SessionStatus;
pub use user::UserRole;
