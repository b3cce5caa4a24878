#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Inconsistent model definition: invalid lattice, non-Hermitian hopping
    /// specification, malformed shape or invalid parameter value
    Configuration(String),
    /// A user-supplied containment predicate failed or returned malformed
    /// output
    GeometryEvaluation(String),
    /// The iterative eigensolver did not converge within its iteration budget
    Convergence(String),
    /// The system does not contain any site, or array sizes do not match
    Dimension(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "configuration error: {}", e),
            Error::GeometryEvaluation(e) => write!(f, "geometry evaluation error: {}", e),
            Error::Convergence(e) => write!(f, "convergence error: {}", e),
            Error::Dimension(e) => write!(f, "dimension error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Configuration(_) |
            Error::GeometryEvaluation(_) |
            Error::Convergence(_) |
            Error::Dimension(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

/// Extract the message from the payload of a panic, as returned by
/// `std::panic::catch_unwind`
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send + 'static)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "panic message is not a string".into()
    }
}
