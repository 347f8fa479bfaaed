//! Request dispatch and completion routing

pub mod dispatcher;
pub mod encoding;
pub mod registry;
pub mod router;

pub use dispatcher::{RequestDispatcher, RequestSubmitter};
pub use encoding::{build_transport_request, encode_component, encode_parameters};
pub use registry::{DuplicateRegistration, RegistryError, TaskRegistry};
pub use router::ResponseRouter;
