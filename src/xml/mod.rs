//! Minimale XML-elementboom voor het lezen en schrijven van coördinaten.
//!
//! Het document wordt met `quick-xml` ingelezen tot een eigen boom van
//! [`XmlElement`]s; attributen blijven in documentvolgorde staan.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

pub mod term;

/// Fouten bij het parsen of schrijven van XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Fout uit de onderliggende XML-reader of -writer.
    #[error("XML fout: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Ongeldig attribuut.
    #[error("ongeldig XML attribuut: {0}")]
    Attribute(#[from] AttrError),
    /// Naam of tekst is geen geldige UTF-8.
    #[error("ongeldige UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Het document heeft een ongeldige structuur.
    #[error("ongeldige XML structuur: {0}")]
    Structure(String),
}

/// Uitkomst van een getypeerde attribuutquery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// Het attribuut bestaat niet.
    #[error("attribuut `{0}` ontbreekt")]
    Missing(String),
    /// Het attribuut bestaat maar heeft niet het gevraagde type.
    #[error("attribuut `{name}` heeft een ongeldige waarde `{value}`")]
    WrongType { name: String, value: String },
}

/// Een XML-element met attributen, kinderen en optionele tekst.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: Option<String>,
}

impl XmlElement {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Zet of vervang een attribuut.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    /// Zet een numeriek attribuut in de kortste notatie die exact terug te
    /// lezen is.
    pub fn set_double_attribute(&mut self, name: &str, value: f64) {
        self.set_attribute(name, value.to_string());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Lees een attribuut als `f64`.
    pub fn query_double_attribute(&self, name: &str) -> Result<f64, AttributeError> {
        self.query_attribute(name)
    }

    /// Lees een attribuut als geheel getal.
    pub fn query_int_attribute(&self, name: &str) -> Result<i64, AttributeError> {
        self.query_attribute(name)
    }

    fn query_attribute<T: std::str::FromStr>(&self, name: &str) -> Result<T, AttributeError> {
        let raw = self
            .attribute(name)
            .ok_or_else(|| AttributeError::Missing(name.to_owned()))?;
        raw.trim().parse().map_err(|_| AttributeError::WrongType {
            name: name.to_owned(),
            value: raw.to_owned(),
        })
    }

    /// Voeg een kind toe en geef een mutable verwijzing terug.
    pub fn add_child(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Eerste kind met deze naam.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Parse een document en geef het root-element terug.
    pub fn parse_str(input: &str) -> Result<XmlElement, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::Structure("meerdere root-elementen".to_owned()));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(XmlError::Structure("meerdere root-elementen".to_owned()));
                    }
                    let element = element_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Structure("onverwachte sluittag".to_owned()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        append_text(current, text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        append_text(current, Cow::Borrowed(std::str::from_utf8(&raw)?));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Structure("element niet afgesloten".to_owned()));
        }
        root.ok_or_else(|| XmlError::Structure("geen root-element gevonden".to_owned()))
    }

    /// Schrijf dit element als volledig document, met declaratie en inspringing.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes)
            .map_err(|err| XmlError::Structure(format!("uitvoer is geen UTF-8: {err}")))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn append_text(element: &mut XmlElement, text: Cow<'_, str>) {
    match element.text.as_mut() {
        Some(existing) => existing.push_str(&text),
        None => element.text = Some(text.into_owned()),
    }
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &XmlElement,
) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = element.text.as_deref() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AttributeError, XmlElement};

    #[test]
    fn parses_nested_elements_and_attributes() {
        let root = XmlElement::parse_str(
            r#"<?xml version="1.0"?>
<Coordinates CoordSystem="1">
  <Coordinate name="feed" X="1.5" Y="term:w/2" Z="0"/>
  <Note>hallo &amp; welkom</Note>
</Coordinates>"#,
        )
        .expect("valid document");

        assert_eq!(root.name(), "Coordinates");
        assert_eq!(root.query_int_attribute("CoordSystem"), Ok(1));
        let coordinate = root.child("Coordinate").expect("coordinate element");
        assert_eq!(coordinate.attribute("Y"), Some("term:w/2"));
        assert_eq!(root.child("Note").and_then(XmlElement::text), Some("hallo & welkom"));
    }

    #[test]
    fn typed_queries_distinguish_missing_from_wrong_type() {
        let mut element = XmlElement::new("P");
        element.set_attribute("X", "abc");
        element.set_double_attribute("Y", -2.25);

        assert_eq!(
            element.query_double_attribute("Z"),
            Err(AttributeError::Missing("Z".to_owned()))
        );
        assert!(matches!(
            element.query_double_attribute("X"),
            Err(AttributeError::WrongType { .. })
        ));
        assert_eq!(element.query_double_attribute("Y"), Ok(-2.25));
        assert!(element.query_int_attribute("Y").is_err());
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let mut element = XmlElement::new("P");
        element.set_attribute("X", "1");
        element.set_attribute("X", "2");
        assert_eq!(element.attributes().count(), 1);
        assert_eq!(element.attribute("X"), Some("2"));
        assert_eq!(element.remove_attribute("X").as_deref(), Some("2"));
        assert_eq!(element.attribute("X"), None);
    }

    #[test]
    fn written_document_parses_back_identically() {
        let mut root = XmlElement::new("Coordinates");
        root.set_attribute("CoordSystem", "0");
        let child = root.add_child(XmlElement::new("Coordinate"));
        child.set_attribute("name", "a<b");
        child.set_double_attribute("X", 0.1 + 0.2);
        root.add_child(XmlElement::new("Note")).set_text("x & y");

        let xml = root.to_xml_string().expect("serialised");
        let parsed = XmlElement::parse_str(&xml).expect("parsed back");
        assert_eq!(parsed, root);
        assert_eq!(
            parsed.child("Coordinate").unwrap().query_double_attribute("X"),
            Ok(0.1 + 0.2)
        );
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(XmlElement::parse_str("<a><b></a>").is_err());
        assert!(XmlElement::parse_str("<a>").is_err());
        assert!(XmlElement::parse_str("").is_err());
        assert!(XmlElement::parse_str("<a/><b/>").is_err());
    }
}
