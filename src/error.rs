use std::fmt::Display;

#[derive(Debug)]
pub enum AstermatError {
    Input(String),
    CommParser(String),
    MedReader(String),
    Builder(String),
}

impl Display for AstermatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (err_name, value) = match self {
            AstermatError::Input(v) => ("Input", v),
            AstermatError::CommParser(v) => ("Command Parser", v),
            AstermatError::MedReader(v) => ("Mesh Reader", v),
            AstermatError::Builder(v) => ("Builder", v),
        };

        write!(f, "{} error: {}", err_name, value)
    }
}
