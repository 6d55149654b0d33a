pub mod auth;
pub mod clock;
pub mod directory;
pub mod email;
pub mod error;
pub mod jwt;
pub mod otp;

pub use auth::AuthService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{InMemoryDirectory, PgUserDirectory, UserDirectory};
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use jwt::{JwtService, SessionClaims};
pub use otp::{generate_code, OtpStore};
