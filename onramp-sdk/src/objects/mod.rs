pub mod create_session;
pub mod provider;
pub mod service;

pub use create_session::{CreateSessionRequest, CreateSessionResponse, ErrorResponse};
pub use provider::{Commodity, FiatCurrency, FlowType, Network, SessionRequest};
pub use service::{HealthResponse, NotFoundResponse, ServiceInfo};
