//! Variabelentabel waartegen geparametriseerde waarden geëvalueerd worden.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use meval::ContextProvider;

use crate::xml::XmlElement;

pub mod error;
pub mod function;
pub mod scalar;

pub use error::{EvalError, describe_code};
pub use scalar::ParameterScalar;

/// Gedeelde, extern beheerde verwijzing naar een parameterset.
///
/// Coördinaten houden alleen een handle vast en wijzigen de set nooit.
pub type SharedParameterSet = Rc<RefCell<ParameterSet>>;

/// Maak een nieuwe gedeelde parameterset aan.
#[must_use]
pub fn shared(set: ParameterSet) -> SharedParameterSet {
    Rc::new(RefCell::new(set))
}

/// Soort parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    /// Vaste waarde, doet niet mee aan sweeps.
    Const,
    /// Waarde binnen `[min, max]`, gekwantiseerd op `step`.
    Linear { min: f64, max: f64, step: f64 },
}

/// Een benoemde variabele in een [`ParameterSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: f64,
    saved: f64,
    sweep: bool,
    kind: ParameterKind,
}

impl Parameter {
    /// Vaste parameter.
    #[must_use]
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            saved: value,
            sweep: true,
            kind: ParameterKind::Const,
        }
    }

    /// Lineaire parameter. `max < min` wordt gecorrigeerd naar `max = min`,
    /// een negatieve stap naar 0.
    #[must_use]
    pub fn linear(name: impl Into<String>, value: f64, min: f64, max: f64, step: f64) -> Self {
        let max = if max < min { min } else { max };
        let step = step.max(0.0);
        let mut parameter = Self {
            name: name.into(),
            value: min,
            saved: min,
            sweep: true,
            kind: ParameterKind::Linear { min, max, step },
        };
        parameter.set_value(value);
        parameter.saved = parameter.value;
        parameter
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Zet de waarde. Lineaire parameters klemmen en kwantiseren.
    pub fn set_value(&mut self, value: f64) {
        self.value = match self.kind {
            ParameterKind::Const => value,
            ParameterKind::Linear { min, max, step } => quantize(value, min, max, step),
        };
    }

    /// Geeft aan of deze parameter meedoet in een sweep. Vaste parameters
    /// sweepen nooit.
    #[must_use]
    pub fn sweeps(&self) -> bool {
        matches!(self.kind, ParameterKind::Linear { .. }) && self.sweep
    }

    /// De opgeslagen sweep-vlag, ook voor vaste parameters.
    #[must_use]
    pub fn sweep_flag(&self) -> bool {
        self.sweep
    }

    pub fn set_sweep(&mut self, sweep: bool) {
        self.sweep = sweep;
    }

    /// Aantal stappen dat deze parameter in een sweep doorloopt.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn count_steps(&self) -> usize {
        match self.kind {
            ParameterKind::Const => 1,
            ParameterKind::Linear { step, .. } if step <= 0.0 => 1,
            ParameterKind::Linear { min, max, step } => {
                let intervals = ((max - min) / step).floor();
                if !intervals.is_finite() || intervals >= usize::MAX as f64 {
                    return usize::MAX;
                }
                // `max >= min` en `step > 0`, dus de afronding is niet-negatief.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let steps = intervals as usize;
                steps.saturating_add(1)
            }
        }
    }

    fn init_sweep(&mut self) {
        if let ParameterKind::Linear { min, .. } = self.kind {
            self.value = min;
        }
    }

    /// Verhoog de waarde met één stap. Geeft `false` als het maximum bereikt is.
    fn increase_step(&mut self) -> bool {
        match self.kind {
            ParameterKind::Linear { max, step, .. } if step > 0.0 => {
                if self.value + step > max + step * 1e-9 {
                    return false;
                }
                let previous = self.value;
                self.set_value(self.value + step);
                // Een stap onder de precisie van `value` komt niet vooruit.
                self.value > previous
            }
            _ => false,
        }
    }

    fn save(&mut self) {
        self.saved = self.value;
    }

    fn restore(&mut self) {
        self.value = self.saved;
    }

    fn write_xml(&self, parent: &mut XmlElement) {
        let element = parent.add_child(XmlElement::new("Parameter"));
        let type_name = match self.kind {
            ParameterKind::Const => "Const",
            ParameterKind::Linear { .. } => "Linear",
        };
        element.set_attribute("Type", type_name);
        element.set_attribute("name", &self.name);
        element.set_attribute("Sweep", if self.sweep { "1" } else { "0" });
        element.set_double_attribute("value", self.value);
        if let ParameterKind::Linear { min, max, step } = self.kind {
            element.set_double_attribute("min", min);
            element.set_double_attribute("max", max);
            element.set_double_attribute("step", step);
        }
    }

    fn read_xml(element: &XmlElement) -> Option<Self> {
        let value = element.query_double_attribute("value").ok()?;
        let name = element.attribute("name").unwrap_or_default();
        let sweep = element.query_int_attribute("Sweep").map_or(true, |flag| flag > 0);

        let mut parameter = match element.attribute("Type")? {
            "Const" => Self::constant(name, value),
            "Linear" => {
                let min = element.query_double_attribute("min").ok()?;
                let max = element.query_double_attribute("max").ok()?;
                let step = element.query_double_attribute("step").ok()?;
                Self::linear(name, value, min, max, step)
            }
            other => {
                log::warn!("onbekend parametertype `{other}` overgeslagen");
                return None;
            }
        };
        parameter.sweep = sweep;
        Some(parameter)
    }
}

fn quantize(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let clamped = value.max(min).min(max);
    if step <= 0.0 {
        return clamped;
    }
    let snapped = min + step * ((clamped - min) / step).round();
    if snapped > max { snapped - step } else { snapped }
}

/// Manier waarop een sweep over meerdere parameters loopt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Alle combinaties (kilometerteller).
    Nested,
    /// Eén parameter tegelijk, de rest staat op hun beginwaarde.
    Independent,
}

/// Geordende verzameling parameters met een revisieteller.
///
/// Elke wijziging verhoogt [`ParameterSet::revision`]; scalars gebruiken dat om
/// te bepalen of een eerdere evaluatie nog geldig is.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
    revision: u64,
    sweep_cursor: usize,
}

impl ParameterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Voeg een parameter toe en geef het nieuwe aantal terug.
    pub fn insert(&mut self, parameter: Parameter) -> usize {
        self.parameters.push(parameter);
        self.touch();
        self.parameters.len()
    }

    /// Verwijder de parameter op `index`. Geeft het resterende aantal terug.
    pub fn remove(&mut self, index: usize) -> usize {
        if index < self.parameters.len() {
            self.parameters.remove(index);
            self.touch();
        }
        self.parameters.len()
    }

    /// Verwijder de eerste parameter met deze naam.
    pub fn remove_named(&mut self, name: &str) -> usize {
        match self.position(name) {
            Some(index) => self.remove(index),
            None => self.parameters.len(),
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|parameter| parameter.name == name)
    }

    /// Zet de waarde van een parameter. Geeft `false` als de naam onbekend is.
    pub fn set_value(&mut self, name: &str, value: f64) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.parameters[index].set_value(value);
        self.touch();
        true
    }

    /// Zet de sweep-vlag van een parameter. Geeft `false` als de naam onbekend is.
    pub fn set_sweep(&mut self, name: &str, sweep: bool) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.parameters[index].set_sweep(sweep);
        self.touch();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn clear(&mut self) {
        self.parameters.clear();
        self.touch();
    }

    /// Namen van alle parameters, gescheiden door `spacer`.
    #[must_use]
    pub fn parameter_string(&self, spacer: &str) -> String {
        self.parameters
            .iter()
            .map(Parameter::name)
            .collect::<Vec<_>>()
            .join(spacer)
    }

    /// `naam=waarde` paren (of alleen waarden), gescheiden door `spacer`.
    #[must_use]
    pub fn parameter_value_string(&self, spacer: &str, values_only: bool) -> String {
        let mut out = String::new();
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                out.push_str(spacer);
            }
            if !values_only {
                out.push_str(&parameter.name);
                out.push('=');
            }
            let _ = write!(out, "{}", parameter.value);
        }
        out
    }

    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::value).collect()
    }

    /// Aantal stappen van een volledige sweep.
    #[must_use]
    pub fn count_sweep_steps(&self, mode: SweepMode) -> usize {
        let counts = self
            .parameters
            .iter()
            .filter(|parameter| parameter.sweeps())
            .map(Parameter::count_steps);
        match mode {
            SweepMode::Nested => counts.fold(0, |acc: usize, steps| {
                if acc == 0 { steps } else { acc.saturating_mul(steps) }
            }),
            SweepMode::Independent => counts.fold(0, usize::saturating_add),
        }
    }

    /// Bewaar de huidige waarden en zet alle sweep-parameters op hun minimum.
    pub fn init_sweep(&mut self) {
        for parameter in self.parameters.iter_mut().filter(|p| p.sweeps()) {
            parameter.save();
            parameter.init_sweep();
        }
        self.sweep_cursor = 0;
        self.touch();
    }

    /// Ga naar de volgende sweep-positie. Geeft `false` als de sweep klaar is.
    pub fn next_sweep_pos(&mut self, mode: SweepMode) -> bool {
        let advanced = match mode {
            SweepMode::Nested => self.next_nested(),
            SweepMode::Independent => self.next_independent(),
        };
        self.touch();
        advanced
    }

    fn next_nested(&mut self) -> bool {
        for parameter in self.parameters.iter_mut().rev().filter(|p| p.sweeps()) {
            if parameter.increase_step() {
                return true;
            }
            parameter.init_sweep();
        }
        false
    }

    fn next_independent(&mut self) -> bool {
        while let Some(parameter) = self.parameters.get_mut(self.sweep_cursor) {
            if parameter.sweeps() && parameter.increase_step() {
                return true;
            }
            self.sweep_cursor += 1;
        }
        false
    }

    /// Herstel de waarden van voor [`ParameterSet::init_sweep`].
    pub fn end_sweep(&mut self) {
        for parameter in self.parameters.iter_mut().filter(|p| p.sweeps()) {
            parameter.restore();
        }
        self.touch();
    }

    /// Schrijf de set als `<ParameterSet>` kind van `parent`.
    pub fn write_xml(&self, parent: &mut XmlElement) {
        let element = parent.add_child(XmlElement::new("ParameterSet"));
        for parameter in &self.parameters {
            parameter.write_xml(element);
        }
    }

    /// Lees alle `<Parameter>` kinderen van `element` in en voeg ze toe.
    /// Onleesbare parameters worden overgeslagen. Geeft het aantal gelezen
    /// parameters terug.
    pub fn read_xml(&mut self, element: &XmlElement) -> usize {
        let mut count = 0;
        for child in element.children_named("Parameter") {
            match Parameter::read_xml(child) {
                Some(parameter) => {
                    self.insert(parameter);
                    count += 1;
                }
                None => log::debug!("parameter zonder geldige waarde overgeslagen"),
            }
        }
        count
    }
}

impl ContextProvider for ParameterSet {
    fn get_var(&self, name: &str) -> Option<f64> {
        self.find(name).map(Parameter::value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, ParameterKind, ParameterSet, SweepMode};
    use crate::xml::XmlElement;

    fn sweep_set() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.insert(Parameter::linear("a", 0.0, 0.0, 2.0, 1.0));
        set.insert(Parameter::constant("c", 7.0));
        set.insert(Parameter::linear("b", 10.0, 10.0, 11.0, 1.0));
        set
    }

    #[test]
    fn linear_parameter_clamps_and_snaps() {
        let mut parameter = Parameter::linear("l", 3.3, 0.0, 10.0, 0.5);
        assert!((parameter.value() - 3.5).abs() < 1e-12);
        parameter.set_value(25.0);
        assert!((parameter.value() - 10.0).abs() < 1e-12);
        parameter.set_value(-4.0);
        assert!(parameter.value().abs() < 1e-12);
    }

    #[test]
    fn linear_parameter_steps_back_when_snap_overshoots() {
        let parameter = Parameter::linear("l", 1.0, 0.0, 1.0, 0.4);
        assert!((parameter.value() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn linear_parameter_corrects_inverted_bounds() {
        let parameter = Parameter::linear("l", 5.0, 2.0, 1.0, -1.0);
        assert_eq!(
            parameter.kind(),
            ParameterKind::Linear { min: 2.0, max: 2.0, step: 0.0 }
        );
        assert!((parameter.value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut set = ParameterSet::new();
        let start = set.revision();
        set.insert(Parameter::constant("x", 1.0));
        assert!(set.revision() > start);
        let before = set.revision();
        assert!(set.set_value("x", 2.0));
        assert!(set.revision() > before);
        let before = set.revision();
        assert!(!set.set_value("missing", 2.0));
        assert_eq!(set.revision(), before);
    }

    #[test]
    fn builds_parameter_strings() {
        let set = sweep_set();
        assert_eq!(set.parameter_string(","), "a,c,b");
        assert_eq!(set.parameter_value_string(";", false), "a=0;c=7;b=10");
        assert_eq!(set.parameter_value_string(",", true), "0,7,10");
    }

    #[test]
    fn removes_parameters() {
        let mut set = sweep_set();
        assert_eq!(set.remove_named("c"), 2);
        assert!(set.find("c").is_none());
        assert_eq!(set.remove(10), 2);
        assert_eq!(set.remove(0), 1);
        assert_eq!(set.get(0).map(Parameter::name), Some("b"));
    }

    #[test]
    fn counts_sweep_steps_per_mode() {
        let set = sweep_set();
        assert_eq!(set.count_sweep_steps(SweepMode::Nested), 6);
        assert_eq!(set.count_sweep_steps(SweepMode::Independent), 5);
    }

    #[test]
    fn step_counts_saturate_for_extreme_ranges() {
        let fine = Parameter::linear("a", 0.0, 0.0, 1.0, 1e-20);
        assert_eq!(fine.count_steps(), usize::MAX);

        let mut set = ParameterSet::new();
        set.insert(fine);
        assert_eq!(set.count_sweep_steps(SweepMode::Nested), usize::MAX);
        assert_eq!(set.count_sweep_steps(SweepMode::Independent), usize::MAX);

        let mut dense = ParameterSet::new();
        for name in ["x", "y", "z"] {
            dense.insert(Parameter::linear(name, 0.0, 0.0, 1.0, 1e-7));
        }
        assert_eq!(dense.count_sweep_steps(SweepMode::Nested), usize::MAX);
        let independent = dense.count_sweep_steps(SweepMode::Independent);
        assert!(independent > 29_000_000 && independent < usize::MAX);
    }

    #[test]
    fn sweep_stops_when_step_is_below_precision() {
        let mut set = ParameterSet::new();
        set.insert(Parameter::linear("a", 1e20, 1e20, 2e20, 1.0));
        set.init_sweep();
        assert!(!set.next_sweep_pos(SweepMode::Nested));
        set.end_sweep();
        assert_eq!(set.values(), vec![1e20]);
    }

    #[test]
    fn nested_sweep_visits_every_combination() {
        let mut set = sweep_set();
        set.init_sweep();
        let mut visited = vec![set.values()];
        while set.next_sweep_pos(SweepMode::Nested) {
            visited.push(set.values());
        }
        assert_eq!(visited.len(), set.count_sweep_steps(SweepMode::Nested));
        assert_eq!(visited[1], vec![0.0, 7.0, 11.0]);
        assert_eq!(visited[2], vec![1.0, 7.0, 10.0]);
        assert_eq!(visited.last().unwrap(), &vec![2.0, 7.0, 11.0]);

        set.end_sweep();
        assert_eq!(set.values(), vec![0.0, 7.0, 10.0]);
    }

    #[test]
    fn independent_sweep_moves_one_parameter_at_a_time() {
        let mut set = sweep_set();
        set.set_value("b", 11.0);
        set.init_sweep();
        let mut steps = 1;
        while set.next_sweep_pos(SweepMode::Independent) {
            steps += 1;
        }
        assert_eq!(steps, 4);
        set.end_sweep();
        assert_eq!(set.values(), vec![0.0, 7.0, 11.0]);
    }

    #[test]
    fn xml_round_trip_keeps_kinds_and_flags() {
        let mut set = sweep_set();
        set.set_sweep("b", false);

        let mut root = XmlElement::new("Root");
        set.write_xml(&mut root);

        let mut restored = ParameterSet::new();
        let element = root.child("ParameterSet").expect("parameter set written");
        assert_eq!(restored.read_xml(element), 3);
        assert_eq!(restored.values(), set.values());
        assert_eq!(restored.find("a").unwrap().kind(), set.find("a").unwrap().kind());
        assert!(!restored.find("b").unwrap().sweeps());
        assert_eq!(restored.find("c").unwrap().kind(), ParameterKind::Const);
    }

    #[test]
    fn read_xml_skips_invalid_parameters() {
        let element = XmlElement::parse_str(
            r#"<ParameterSet>
                 <Parameter Type="Const" name="ok" value="1.5"/>
                 <Parameter Type="Const" name="broken" value="abc"/>
                 <Parameter Type="Exotic" name="odd" value="2"/>
                 <Parameter Type="Linear" name="partial" value="2"/>
               </ParameterSet>"#,
        )
        .expect("valid xml");
        let mut set = ParameterSet::new();
        assert_eq!(set.read_xml(&element), 1);
        assert_eq!(set.find("ok").map(Parameter::value), Some(1.5));
        assert!(set.find("ok").unwrap().sweep_flag());
    }
}
