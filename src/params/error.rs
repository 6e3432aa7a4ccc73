//! Foutcodes van het evalueren van scalaire parameters.

use thiserror::Error;

/// Fout tijdens het zetten of evalueren van een expressie.
///
/// Elke variant heeft een vaste numerieke code (zie [`EvalError::code`]) zodat
/// foutcodes in XML of logs stabiel blijven.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Lege expressie of een interne inconsistentie.
    #[error("interne fout")]
    Internal,
    /// Het resultaat is oneindig.
    #[error("deling door nul")]
    DivisionByZero,
    /// Het resultaat is geen getal (wortel/logaritme/arcsinus buiten domein).
    #[error("domeinfout (wortel, logaritme of goniometrische functie van een ongeldige waarde)")]
    Domain,
    /// Onverwacht token op de gegeven positie.
    #[error("syntaxfout op positie {0} (controleer de parameter)")]
    Syntax(usize),
    #[error("haakjes sluiten niet op elkaar aan")]
    MismatchedParenthesis,
    #[error("ontbrekend ')'")]
    MissingParenthesis,
    #[error("syntaxfout: operator verwacht")]
    OperatorExpected,
    #[error("syntaxfout in parameters")]
    InvalidParameters,
    #[error("ongeldig aantal argumenten voor functie `{0}`")]
    ArgumentCount(String),
    #[error("syntaxfout: voortijdig einde van de expressie")]
    PrematureEnd,
    #[error("onbekende variabele `{0}`")]
    UnknownVariable(String),
    #[error("onbekende functie `{0}`")]
    UnknownFunction(String),
}

impl EvalError {
    /// Stabiele numerieke code van deze fout.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Internal => -1,
            Self::DivisionByZero => 1,
            Self::Domain => 2,
            Self::Syntax(_) => 100,
            Self::MismatchedParenthesis => 101,
            Self::MissingParenthesis => 102,
            Self::OperatorExpected => 104,
            Self::InvalidParameters => 107,
            Self::ArgumentCount(_) => 108,
            Self::PrematureEnd => 109,
            Self::UnknownVariable(_) => 111,
            Self::UnknownFunction(_) => 112,
        }
    }
}

impl From<meval::Error> for EvalError {
    fn from(error: meval::Error) -> Self {
        use meval::{FuncEvalError, ParseError, RPNError};

        match error {
            meval::Error::UnknownVariable(name) => Self::UnknownVariable(name),
            meval::Error::Function(name, FuncEvalError::UnknownFunction) => {
                Self::UnknownFunction(name)
            }
            meval::Error::Function(name, _) => Self::ArgumentCount(name),
            meval::Error::ParseError(ParseError::UnexpectedToken(position)) => {
                Self::Syntax(position)
            }
            meval::Error::ParseError(ParseError::MissingRParen(_)) => Self::MissingParenthesis,
            meval::Error::ParseError(ParseError::MissingArgument) => Self::PrematureEnd,
            meval::Error::RPNError(
                RPNError::MismatchedLParen(_) | RPNError::MismatchedRParen(_),
            ) => Self::MismatchedParenthesis,
            meval::Error::RPNError(RPNError::UnexpectedComma(_)) => Self::InvalidParameters,
            meval::Error::RPNError(RPNError::NotEnoughOperands(_) | RPNError::TooManyOperands) => {
                Self::OperatorExpected
            }
        }
    }
}

/// Vertaalt een numerieke foutcode naar een leesbaar bericht.
///
/// Kent naast de codes van [`EvalError`] ook de historische codes die in
/// oudere documenten of logs kunnen voorkomen. Bedoeld voor afnemers die
/// alleen een code bewaren; [`EvalError`] zelf toont een specifiekere melding
/// (met de naam van de variabele of functie).
#[must_use]
pub fn describe_code(code: i32) -> &'static str {
    match code {
        -1 => "interne fout",
        0 => "geen fout",
        1 => "deling door nul",
        2 => "domeinfout (wortel van een negatieve waarde)",
        3 => "domeinfout (logaritme van een negatieve waarde)",
        4 => "goniometrische fout (asin of acos van een ongeldige waarde)",
        5 => "maximale recursiediepte bereikt",
        100 => "syntaxfout (controleer de parameter)",
        101 => "haakjes sluiten niet op elkaar aan",
        102 => "ontbrekend ')'",
        103 => "lege haakjes",
        104 => "syntaxfout: operator verwacht",
        105 => "onvoldoende geheugen",
        106 => "onverwachte fout",
        107 => "syntaxfout in parameters",
        108 => "ongeldig aantal argumenten voor functie",
        109 => "syntaxfout: voortijdig einde van de expressie",
        110 => "syntaxfout: '(' verwacht na functie",
        111 => "onbekende variabele",
        112 => "onbekende functie",
        _ => "onbekende foutcode",
    }
}

#[cfg(test)]
mod tests {
    use super::{EvalError, describe_code};

    #[test]
    fn codes_are_decodable() {
        let errors = [
            EvalError::Internal,
            EvalError::DivisionByZero,
            EvalError::Domain,
            EvalError::Syntax(3),
            EvalError::MismatchedParenthesis,
            EvalError::MissingParenthesis,
            EvalError::OperatorExpected,
            EvalError::InvalidParameters,
            EvalError::ArgumentCount("atan2".to_owned()),
            EvalError::PrematureEnd,
            EvalError::UnknownVariable("w".to_owned()),
            EvalError::UnknownFunction("foo".to_owned()),
        ];
        for error in errors {
            assert_ne!(describe_code(error.code()), "onbekende foutcode", "{error:?}");
        }
    }

    #[test]
    fn unknown_code_has_fallback_message() {
        assert_eq!(describe_code(9999), "onbekende foutcode");
        assert_eq!(describe_code(0), "geen fout");
    }

    #[test]
    fn maps_meval_unknown_variable() {
        let error: EvalError = meval::Error::UnknownVariable("bogus".to_owned()).into();
        assert_eq!(error, EvalError::UnknownVariable("bogus".to_owned()));
        assert_eq!(error.code(), 111);
        assert_eq!(describe_code(error.code()), "onbekende variabele");
        assert!(error.to_string().contains("bogus"));
    }
}
