pub mod response;
pub mod session;

pub use response::{ApiResponse, ApiResult};
pub use session::{
    authorize, client_ip, session_gateway, AccessDenied, Authorization, ClientIp, CurrentSession, PageError,
};
