/// Contract breaches raised by the typed boundary of the engine.
///
/// User-data problems never end up here; they are reported through the
/// `valid`/`errors` fields of the calculator results instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown asset class: {0}")]
    UnknownAssetClass(String),

    #[error("invalid age: {0}")]
    InvalidAge(f64),

    #[error("invalid gender: {0}")]
    InvalidGender(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
