mod email_verification_repo;

pub use email_verification_repo::EmailVerificationRepo;
