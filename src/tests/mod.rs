pub mod common;

mod token_issuer;
