//! Een enkele waarde die letterlijk of als expressie opgegeven kan worden.

use std::rc::Rc;

use super::SharedParameterSet;
use super::error::{EvalError, describe_code};
use super::function::{compile_expression, evaluate_expression};

/// Scalaire parameter: een getal, of een expressie die tegen een gedeelde
/// [`ParameterSet`](super::ParameterSet) geëvalueerd wordt.
///
/// Lezen evalueert nooit. Pas [`ParameterScalar::evaluate`] ververst de waarde,
/// en alleen als de expressie of de gebonden set sinds de laatste geslaagde
/// evaluatie gewijzigd is.
///
/// `Clone` kopieert tekst en waarde; de handle naar de set wordt gedeeld.
#[derive(Debug, Clone, Default)]
pub struct ParameterScalar {
    parameter_set: Option<SharedParameterSet>,
    expression: Option<String>,
    value: f64,
    freshness: Freshness,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Freshness {
    #[default]
    Stale,
    /// Geëvalueerd tegen deze revisie van de set (0 zonder set).
    Evaluated(u64),
}

impl ParameterScalar {
    /// Letterlijke nul zonder parameterset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Letterlijke waarde, gebonden aan `parameter_set`.
    #[must_use]
    pub fn with_value(parameter_set: Option<SharedParameterSet>, value: f64) -> Self {
        Self {
            parameter_set,
            expression: None,
            value,
            freshness: Freshness::Stale,
        }
    }

    /// Expressie, gebonden aan `parameter_set`. Wordt pas bij
    /// [`ParameterScalar::evaluate`] uitgerekend; tot die tijd is de waarde 0.
    #[must_use]
    pub fn with_expression(
        parameter_set: Option<SharedParameterSet>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            parameter_set,
            expression: Some(expression.into()),
            value: 0.0,
            freshness: Freshness::Stale,
        }
    }

    /// Koppel aan een (andere) parameterset. Dezelfde set opnieuw koppelen
    /// verandert niets.
    pub fn set_parameter_set(&mut self, parameter_set: Option<SharedParameterSet>) {
        let same = match (&self.parameter_set, &parameter_set) {
            (Some(current), Some(next)) => Rc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.parameter_set = parameter_set;
        self.freshness = Freshness::Stale;
    }

    #[must_use]
    pub fn parameter_set(&self) -> Option<&SharedParameterSet> {
        self.parameter_set.as_ref()
    }

    /// Zet een letterlijke waarde; een eventuele expressie vervalt.
    pub fn set_value(&mut self, value: f64) {
        self.expression = None;
        self.value = value;
        self.freshness = Freshness::Stale;
    }

    /// Zet een expressie en evalueer die meteen.
    ///
    /// Een lege expressie wordt geweigerd met [`EvalError::Internal`] en laat de
    /// scalar ongemoeid. Bij een evaluatiefout blijft de tekst staan maar houdt
    /// de scalar zijn vorige waarde.
    pub fn set_expression(&mut self, expression: &str) -> Result<(), EvalError> {
        if expression.trim().is_empty() {
            return Err(EvalError::Internal);
        }
        self.expression = Some(expression.to_owned());
        self.freshness = Freshness::Stale;
        self.evaluate()
    }

    /// Zet een expressie zonder te evalueren. Alleen de syntax wordt gecontroleerd;
    /// bij een syntaxfout blijft de scalar ongewijzigd.
    pub fn store_expression(&mut self, expression: &str) -> Result<(), EvalError> {
        compile_expression(expression)?;
        self.expression = Some(expression.to_owned());
        self.freshness = Freshness::Stale;
        Ok(())
    }

    #[must_use]
    pub fn is_parameterised(&self) -> bool {
        self.expression.is_some()
    }

    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Laatst geëvalueerde waarde.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// De oorspronkelijke tekst, of het getal in de kortste verliesvrije notatie.
    #[must_use]
    pub fn value_string(&self) -> String {
        match &self.expression {
            Some(expression) => expression.clone(),
            None => self.value.to_string(),
        }
    }

    /// Evalueer de expressie tegen de gekoppelde set.
    ///
    /// Letterlijke waarden slagen altijd. Een geslaagde evaluatie wordt
    /// hergebruikt zolang expressie en set niet veranderen.
    pub fn evaluate(&mut self) -> Result<(), EvalError> {
        let Some(expression) = self.expression.as_deref() else {
            return Ok(());
        };

        let revision = self
            .parameter_set
            .as_ref()
            .map_or(0, |set| set.borrow().revision());
        if self.freshness == Freshness::Evaluated(revision) {
            return Ok(());
        }

        let result = match &self.parameter_set {
            Some(set) => evaluate_expression(expression, Some(&*set.borrow())),
            None => evaluate_expression(expression, None),
        };

        match result {
            Ok(value) => {
                self.value = value;
                self.freshness = Freshness::Evaluated(revision);
                Ok(())
            }
            Err(error) => {
                let code = error.code();
                log::debug!(
                    "evaluatie van `{expression}` mislukt (code {code}, {}): {error}",
                    describe_code(code)
                );
                self.freshness = Freshness::Stale;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ParameterScalar;
    use crate::params::error::EvalError;
    use crate::params::{Parameter, ParameterSet, shared};

    #[test]
    fn literal_values_need_no_evaluation() {
        let mut scalar = ParameterScalar::with_value(None, -2.25);
        assert!(!scalar.is_parameterised());
        assert_eq!(scalar.value_string(), "-2.25");
        assert!(scalar.evaluate().is_ok());
        assert_eq!(scalar.value(), -2.25);
    }

    #[test]
    fn expressions_evaluate_only_on_request() {
        let mut set = ParameterSet::new();
        set.insert(Parameter::constant("w", 3.0));
        let set = shared(set);

        let mut scalar = ParameterScalar::with_expression(Some(set.clone()), "w*2");
        assert_eq!(scalar.value(), 0.0);
        scalar.evaluate().expect("w is known");
        assert_eq!(scalar.value(), 6.0);

        set.borrow_mut().set_value("w", 5.0);
        assert_eq!(scalar.value(), 6.0);
        scalar.evaluate().expect("w is known");
        assert_eq!(scalar.value(), 10.0);
    }

    #[test]
    fn failed_evaluation_keeps_previous_value() {
        let set = shared(ParameterSet::new());
        let mut scalar = ParameterScalar::with_value(Some(set), 4.0);
        let error = scalar.set_expression("bogus_var*2").unwrap_err();
        assert_eq!(error, EvalError::UnknownVariable("bogus_var".to_owned()));
        assert_eq!(scalar.value(), 4.0);
        assert_eq!(scalar.value_string(), "bogus_var*2");
    }

    #[test]
    fn empty_expression_is_rejected_without_change() {
        let mut scalar = ParameterScalar::with_value(None, 1.5);
        assert_eq!(scalar.set_expression("  "), Err(EvalError::Internal));
        assert!(!scalar.is_parameterised());
        assert_eq!(scalar.value(), 1.5);
    }

    #[test]
    fn store_expression_checks_syntax_only() {
        let mut scalar = ParameterScalar::new();
        assert!(scalar.store_expression("later_defined + 1").is_ok());
        assert!(scalar.is_parameterised());
        assert_eq!(scalar.value(), 0.0);
        assert!(scalar.store_expression("(1 +").is_err());
        assert_eq!(scalar.expression(), Some("later_defined + 1"));
    }

    #[test]
    fn rebinding_switches_variable_table() {
        let mut first = ParameterSet::new();
        first.insert(Parameter::constant("a", 1.0));
        let mut second = ParameterSet::new();
        second.insert(Parameter::constant("a", 2.0));
        let first = shared(first);
        let second = shared(second);

        let mut scalar = ParameterScalar::with_expression(Some(first.clone()), "a");
        scalar.evaluate().unwrap();
        assert_eq!(scalar.value(), 1.0);

        scalar.set_parameter_set(Some(second));
        scalar.evaluate().unwrap();
        assert_eq!(scalar.value(), 2.0);

        scalar.set_parameter_set(Some(first));
        scalar.evaluate().unwrap();
        assert_eq!(scalar.value(), 1.0);
    }

    #[test]
    fn clone_is_independent_but_shares_the_table() {
        let set = shared(ParameterSet::new());
        let original = ParameterScalar::with_expression(Some(set.clone()), "1+1");
        let mut copy = original.clone();
        copy.set_value(9.0);
        assert!(original.is_parameterised());
        assert!(!copy.is_parameterised());
        assert!(std::rc::Rc::ptr_eq(copy.parameter_set().unwrap(), &set));
    }

    #[test]
    fn evaluates_without_table_against_builtins() {
        let mut scalar = ParameterScalar::with_expression(None, "2*pi");
        scalar.evaluate().unwrap();
        assert!((scalar.value() - std::f64::consts::TAU).abs() < 1e-12);
    }
}
