pub mod client_credentials;
pub mod issuer;
