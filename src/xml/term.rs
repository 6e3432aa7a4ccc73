//! Lezen en schrijven van scalaire parameters als XML-attributen ("termen").

use thiserror::Error;

use super::XmlElement;
use crate::params::{EvalError, ParameterScalar};

const LEGACY_PREFIX: &str = "term:";

/// Standaard scheidingsteken van vectortermen.
pub const DEFAULT_DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("geen XML element opgegeven")]
    MissingElement,
    #[error("attribuut `{0}` ontbreekt")]
    MissingAttribute(String),
    #[error("ongeldige expressie in attribuut `{attribute}`: {source}")]
    Expression {
        attribute: String,
        #[source]
        source: EvalError,
    },
    #[error("attribuut `{attribute}` bevat {found} velden, maximaal {expected} toegestaan")]
    TooManyFields {
        attribute: String,
        found: usize,
        expected: usize,
    },
}

/// Schrijf `scalar` naar `attribute` van `element`.
///
/// Met `parameterised` en een expressie wordt de tekst bewaard, anders het
/// getal. NaN wordt als `NaN` geschreven.
pub fn write_term(
    scalar: &ParameterScalar,
    element: &mut XmlElement,
    attribute: &str,
    parameterised: bool,
) {
    element.set_attribute(attribute, term_text(scalar, parameterised));
}

/// Lees `attribute` van `element` in `scalar`.
///
/// Een getal wordt een letterlijke waarde; andere tekst moet syntactisch een
/// geldige expressie zijn en wordt zonder evaluatie opgeslagen. Bij een fout
/// blijft `scalar` ongewijzigd.
pub fn read_term(
    scalar: &mut ParameterScalar,
    element: &XmlElement,
    attribute: &str,
) -> Result<(), TermError> {
    let raw = element
        .attribute(attribute)
        .ok_or_else(|| TermError::MissingAttribute(attribute.to_owned()))?;
    apply_text(scalar, raw, attribute)
}

/// Schrijf meerdere scalars als één attribuut, gescheiden door `delimiter`.
pub fn write_vector_term(
    scalars: &[ParameterScalar],
    element: &mut XmlElement,
    attribute: &str,
    parameterised: bool,
    delimiter: char,
) {
    let joined = scalars
        .iter()
        .map(|scalar| term_text(scalar, parameterised))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string());
    element.set_attribute(attribute, joined);
}

/// Lees een vectorterm in `scalars`.
///
/// Ontbrekende of lege velden krijgen `default`. Meer velden dan scalars is
/// een fout. Alles of niets: bij een fout blijven alle scalars ongewijzigd.
pub fn read_vector_term(
    scalars: &mut [ParameterScalar],
    element: &XmlElement,
    attribute: &str,
    delimiter: char,
    default: f64,
) -> Result<(), TermError> {
    let raw = element
        .attribute(attribute)
        .ok_or_else(|| TermError::MissingAttribute(attribute.to_owned()))?;
    let fields = split_fields(raw, delimiter);
    if fields.len() > scalars.len() {
        return Err(TermError::TooManyFields {
            attribute: attribute.to_owned(),
            found: fields.len(),
            expected: scalars.len(),
        });
    }

    let mut staged = scalars.to_vec();
    for (index, scalar) in staged.iter_mut().enumerate() {
        match fields.get(index).map(|field| field.trim()) {
            Some(field) if !field.is_empty() => apply_text(scalar, field, attribute)?,
            _ => scalar.set_value(default),
        }
    }
    scalars.clone_from_slice(&staged);
    Ok(())
}

fn term_text(scalar: &ParameterScalar, parameterised: bool) -> String {
    match scalar.expression() {
        Some(expression) if parameterised => expression.to_owned(),
        _ => format_number(scalar.value()),
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else {
        value.to_string()
    }
}

fn apply_text(scalar: &mut ParameterScalar, raw: &str, attribute: &str) -> Result<(), TermError> {
    let trimmed = raw.trim();
    let text = trimmed
        .strip_prefix(LEGACY_PREFIX)
        .map_or(trimmed, str::trim);

    if let Ok(value) = text.parse::<f64>() {
        scalar.set_value(value);
        return Ok(());
    }

    scalar
        .store_expression(text)
        .map_err(|source| TermError::Expression {
            attribute: attribute.to_owned(),
            source,
        })
}

/// Splits op `delimiter`, maar niet binnen haakjes: `pow(2,3),1` geeft twee
/// velden.
fn split_fields(raw: &str, delimiter: char) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (position, character) in raw.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == delimiter && depth == 0 => {
                fields.push(&raw[start..position]);
                start = position + c.len_utf8();
            }
            _ => {}
        }
    }
    fields.push(&raw[start..]);
    fields
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_DELIMITER, TermError, read_term, read_vector_term, split_fields, write_term,
        write_vector_term,
    };
    use crate::params::ParameterScalar;
    use crate::xml::XmlElement;

    #[test]
    fn literal_terms_are_written_as_numbers() {
        let mut element = XmlElement::new("P");
        write_term(&ParameterScalar::with_value(None, -2.25), &mut element, "X", true);
        write_term(&ParameterScalar::with_value(None, f64::NAN), &mut element, "Y", true);
        assert_eq!(element.attribute("X"), Some("-2.25"));
        assert_eq!(element.attribute("Y"), Some("NaN"));
    }

    #[test]
    fn expressions_follow_the_parameterised_flag() {
        let mut scalar = ParameterScalar::new();
        scalar.set_expression("2*3").unwrap();

        let mut element = XmlElement::new("P");
        write_term(&scalar, &mut element, "A", true);
        write_term(&scalar, &mut element, "B", false);
        assert_eq!(element.attribute("A"), Some("2*3"));
        assert_eq!(element.attribute("B"), Some("6"));
    }

    #[test]
    fn reads_literals_expressions_and_legacy_prefix() {
        let mut element = XmlElement::new("P");
        element.set_attribute("X", " 1.5 ");
        element.set_attribute("Y", "w/2");
        element.set_attribute("Z", "term: 3");

        let mut x = ParameterScalar::new();
        let mut y = ParameterScalar::new();
        let mut z = ParameterScalar::new();
        read_term(&mut x, &element, "X").unwrap();
        read_term(&mut y, &element, "Y").unwrap();
        read_term(&mut z, &element, "Z").unwrap();

        assert_eq!(x.value(), 1.5);
        assert!(!x.is_parameterised());
        assert_eq!(y.expression(), Some("w/2"));
        assert_eq!(z.value(), 3.0);
    }

    #[test]
    fn failed_reads_leave_the_scalar_alone() {
        let mut element = XmlElement::new("P");
        element.set_attribute("X", "(1 +");
        let mut scalar = ParameterScalar::with_value(None, 7.0);

        assert_eq!(
            read_term(&mut scalar, &element, "Q"),
            Err(TermError::MissingAttribute("Q".to_owned()))
        );
        assert!(matches!(
            read_term(&mut scalar, &element, "X"),
            Err(TermError::Expression { .. })
        ));
        assert_eq!(scalar.value(), 7.0);
        assert!(!scalar.is_parameterised());
    }

    #[test]
    fn vector_terms_fill_missing_fields_with_default() {
        let mut element = XmlElement::new("P");
        element.set_attribute("V", "1, pow(2,3)");
        let mut scalars = vec![ParameterScalar::new(); 3];
        read_vector_term(&mut scalars, &element, "V", DEFAULT_DELIMITER, -1.0).unwrap();

        assert_eq!(scalars[0].value(), 1.0);
        assert_eq!(scalars[1].expression(), Some("pow(2,3)"));
        assert_eq!(scalars[2].value(), -1.0);

        let mut out = XmlElement::new("P");
        write_vector_term(&scalars, &mut out, "V", true, ';');
        assert_eq!(out.attribute("V"), Some("1;pow(2,3);-1"));
    }

    #[test]
    fn vector_terms_reject_extra_fields_atomically() {
        let mut element = XmlElement::new("P");
        element.set_attribute("V", "1,2,3,4");
        let mut scalars = vec![ParameterScalar::with_value(None, 9.0); 3];
        let error = read_vector_term(&mut scalars, &element, "V", ',', 0.0).unwrap_err();
        assert!(matches!(error, TermError::TooManyFields { found: 4, expected: 3, .. }));
        assert!(scalars.iter().all(|scalar| scalar.value() == 9.0));
    }

    #[test]
    fn split_ignores_nested_delimiters() {
        assert_eq!(split_fields("a,if(b,1,2),c", ','), vec!["a", "if(b,1,2)", "c"]);
        assert_eq!(split_fields("", ','), vec![""]);
    }
}
