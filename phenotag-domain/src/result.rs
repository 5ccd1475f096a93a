use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};

/// Error type of this tool. Carries a message and nothing else, since almost all
/// failures end up as log lines or abort the current operation.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct PtError {
    msg: String,
}
impl PtError {
    pub fn new(msg: &str) -> PtError {
        PtError {
            msg: msg.to_string(),
        }
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
}
impl Display for PtError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}
impl Error for PtError {}
impl From<&str> for PtError {
    fn from(value: &str) -> Self {
        PtError::new(value)
    }
}
/// Phenotag's result type with [`PtError`](PtError) as error type.
pub type PtResult<U> = Result<U, PtError>;

/// Creates a [`PtError`](PtError) with a formatted message.
/// ```rust
/// # use std::error::Error;
/// use phenotag_domain::{pterr, result::PtError};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// assert_eq!(pterr!("some error {}", 1), PtError::new(format!("some error {}", 1).as_str()));
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! pterr {
    ($s:literal) => {
        $crate::result::PtError::new(format!($s).as_str())
    };
    ($s:literal, $( $exps:expr ),*) => {
        $crate::result::PtError::new(format!($s, $($exps,)*).as_str())
    }
}

pub fn to_pt<E: Debug>(e: E) -> PtError {
    pterr!(
        "original error type is '{:?}', error message is '{:?}'",
        std::any::type_name::<E>(),
        e
    )
}
