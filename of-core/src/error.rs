//! Error types, re-exported from `of-error`

pub use of_error::{BiosError, EcError, OmenfanError, Result};
