mod assertion;
mod token;

pub use assertion::{ASSERTION_LIFETIME_SECS, AssertionClaims, load_signing_key, sign_assertion};
pub use token::{AuthContext, TokenManager};

#[cfg(test)]
pub(crate) use assertion::tests::PKCS8_PEM as TEST_PRIVATE_KEY;
