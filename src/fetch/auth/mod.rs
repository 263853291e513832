mod header;

pub use header::{AUTH_TOKEN_HEADER, DEV_KEY_HEADER, HeaderAuth};
