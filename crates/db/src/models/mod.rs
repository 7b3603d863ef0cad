pub mod email_verification;
