//! Reservation Engine: the request lifecycle, live registry, and durable
//! store that sit on top of `topology`, `pathcompiler`, and `solver`.

mod ero;
mod error;
mod instance;
mod lifecycle;
mod model;
mod projection;
mod registry;
pub mod store;

pub use error::ReservationError;
pub use instance::{render_instance_data, InstanceRequest};
pub use lifecycle::{format_reserve_ack, ConnectOutcome, Engine};
pub use model::{Reservation, Solution};
pub use projection::InUseProjection;
pub use registry::ReservationRegistry;
