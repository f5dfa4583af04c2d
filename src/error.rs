use std::fmt;

#[derive(Debug)]
pub enum CoaError {
    MissingPageTemplate,
    UnplaceableFlowable(String),
    InvalidConfiguration(String),
    Import(String),
    Io(std::io::Error),
}

impl fmt::Display for CoaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoaError::MissingPageTemplate => write!(f, "no page template available"),
            CoaError::UnplaceableFlowable(message) => {
                write!(f, "flowable cannot fit on any page: {}", message)
            }
            CoaError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            CoaError::Import(message) => write!(f, "import error: {}", message),
            CoaError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CoaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CoaError {
    fn from(value: std::io::Error) -> Self {
        CoaError::Io(value)
    }
}
