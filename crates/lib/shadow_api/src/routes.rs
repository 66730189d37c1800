//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_SIGNUP: &str = "/api/auth/signup";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const GET_AUTH_ME: &str = "/api/auth/me";
pub const GET_AUTH_VERIFY_EMAIL: &str = "/api/auth/verify-email";
pub const GET_AUTH_GOOGLE: &str = "/api/auth/google";
pub const GET_AUTH_GOOGLE_CALLBACK: &str = "/api/auth/google/callback";

pub const POST_ADMIN_LOGIN: &str = "/api/admin/login";
pub const GET_ADMIN_VERIFY: &str = "/api/admin/verify";
pub const POST_ADMIN_LOGOUT: &str = "/api/admin/logout";
